//! Allow-list reduction over untrusted upstream JSON.
//!
//! Every helper here is null-safe: malformed input yields `None`, never a
//! panic, and an empty result is reported as `None` rather than `{}`/`[]` so
//! callers can decide whether to attach a field by presence alone.

use serde_json::{Map, Number, Value};

/// Copies the listed `keys` whose value is non-null out of `source`.
///
/// Returns `None` when `source` is missing, is not an object, or when none of
/// the keys carried a value.
pub fn extract(source: Option<&Value>, keys: &[&str]) -> Option<Map<String, Value>> {
    let object = source?.as_object()?;
    let mut out = Map::new();
    for key in keys {
        match object.get(*key) {
            None | Some(Value::Null) => {}
            Some(value) => {
                out.insert((*key).to_string(), value.clone());
            }
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Reduces an `{<principal_key>: {...}, at: ...}` record such as an
/// assignment or acknowledgement.
///
/// The principal is reduced to `fields`; the record is dropped only when both
/// the principal and the `at` timestamp are absent.
pub fn extract_principal_and_timestamp(
    item: &Value,
    principal_key: &str,
    fields: &[&str],
) -> Option<Map<String, Value>> {
    let object = item.as_object()?;
    let mut out = Map::new();
    if let Some(principal) = extract(object.get(principal_key), fields) {
        out.insert(principal_key.to_string(), Value::Object(principal));
    }
    match object.get("at") {
        None | Some(Value::Null) => {}
        Some(at) => {
            out.insert("at".to_string(), at.clone());
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Maps every element of `raw_list` through `item_parser`, dropping the ones
/// that reduce to nothing. `None` when nothing survives.
pub fn map_list<T, F>(raw_list: Option<&Value>, item_parser: F) -> Option<Vec<T>>
where
    F: Fn(&Value) -> Option<T>,
{
    let items = raw_list?.as_array()?;
    let parsed: Vec<T> = items.iter().filter_map(item_parser).collect();
    (!parsed.is_empty()).then_some(parsed)
}

pub(crate) fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Like [`string_field`] but treats `""` as absent; used for reference ids
/// and optional labels where an empty string carries no information.
pub(crate) fn non_empty_string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Any JSON number, integral or not, kept exactly as upstream sent it.
pub(crate) fn number_field(raw: &Value, key: &str) -> Option<Number> {
    match raw.get(key) {
        Some(Value::Number(number)) => Some(number.clone()),
        _ => None,
    }
}

/// The raw value for fields whose upstream shape varies; anything non-null.
pub(crate) fn value_field(raw: &Value, key: &str) -> Option<Value> {
    raw.get(key).filter(|value| !value.is_null()).cloned()
}

pub(crate) fn float_field(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

/// A nested JSON object, kept only when it has at least one entry.
pub(crate) fn object_field(raw: &Value, key: &str) -> Option<Map<String, Value>> {
    raw.get(key)
        .and_then(Value::as_object)
        .filter(|object| !object.is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extract_keeps_only_listed_non_null_keys() {
        let source = json!({"id": "P1", "summary": null, "self": "https://x", "type": "user"});
        let out = extract(Some(&source), &["id", "summary", "type"]).unwrap();
        assert_eq!(Value::Object(out), json!({"id": "P1", "type": "user"}));
    }

    #[test]
    fn extract_returns_none_instead_of_empty_map() {
        assert_eq!(extract(Some(&json!({"other": 1})), &["id"]), None);
        assert_eq!(extract(Some(&json!({"id": null})), &["id"]), None);
        assert_eq!(extract(Some(&json!({})), &["id"]), None);
        assert_eq!(extract(None, &["id"]), None);
        assert_eq!(extract(Some(&Value::Null), &["id"]), None);
        assert_eq!(extract(Some(&json!(["id"])), &["id"]), None);
    }

    #[test]
    fn principal_and_timestamp_keeps_either_half() {
        let both = json!({
            "assignee": {"id": "U1", "summary": "Alice", "html_url": "x"},
            "at": "2024-01-01T00:00:00Z"
        });
        let kept = extract_principal_and_timestamp(&both, "assignee", &["id", "summary"]).unwrap();
        assert_eq!(
            Value::Object(kept),
            json!({"assignee": {"id": "U1", "summary": "Alice"}, "at": "2024-01-01T00:00:00Z"})
        );

        let only_at = json!({"assignee": null, "at": "2024-01-01T00:00:00Z"});
        assert_eq!(
            Value::Object(extract_principal_and_timestamp(&only_at, "assignee", &["id"]).unwrap()),
            json!({"at": "2024-01-01T00:00:00Z"})
        );

        let neither = json!({"assignee": {"html_url": "x"}});
        assert_eq!(
            extract_principal_and_timestamp(&neither, "assignee", &["id", "summary"]),
            None
        );
    }

    #[test]
    fn map_list_drops_empty_items_and_empty_results() {
        let raw = json!([{"id": "A"}, {}, null, {"id": "B"}]);
        let parsed = map_list(Some(&raw), |item| extract(Some(item), &["id"])).unwrap();
        assert_eq!(parsed.len(), 2);

        let all_empty = json!([{}, null]);
        assert!(map_list(Some(&all_empty), |item| extract(Some(item), &["id"])).is_none());
        assert!(map_list(Some(&json!([])), |item| extract(Some(item), &["id"])).is_none());
        assert!(map_list(Some(&json!("nope")), |item| extract(Some(item), &["id"])).is_none());
        assert!(map_list(None, |item| extract(Some(item), &["id"])).is_none());
    }

    #[test]
    fn number_field_keeps_integral_and_fractional_numbers() {
        let raw = json!({"a": 3, "b": 12.0, "c": "3", "d": null});
        assert_eq!(number_field(&raw, "a").map(Value::Number), Some(json!(3)));
        assert_eq!(number_field(&raw, "b").map(Value::Number), Some(json!(12.0)));
        assert_eq!(number_field(&raw, "c"), None);
        assert_eq!(number_field(&raw, "d"), None);
    }

    #[test]
    fn value_field_keeps_any_non_null_value() {
        let raw = json!({"reason": {"type": "merge_resolve_reason"}, "gone": null});
        assert_eq!(
            value_field(&raw, "reason"),
            Some(json!({"type": "merge_resolve_reason"}))
        );
        assert_eq!(value_field(&raw, "gone"), None);
        assert_eq!(value_field(&raw, "missing"), None);
    }
}
