//! Response envelope: `{metadata, <resource_name>: [...]}` or a
//! `LIMIT_EXCEEDED` refusal when the records would be too large to hand back.

use std::collections::HashSet;

use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::{Map, Value};

use crate::error::{CoreError, ValidationError, codes};

pub const DEFAULT_MAX_CHARS: usize = 100_000;
pub const DEFAULT_MAX_BYTES: usize = 250_000;

/// Ceilings applied to the measured size of the record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLimits {
    pub max_chars: usize,
    pub max_bytes: usize,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success {
        metadata: Map<String, Value>,
        resource_name: String,
        records: Vec<Value>,
    },
    /// The records were measured and dropped; only guidance is returned.
    LimitExceeded { message: String },
}

impl Envelope {
    pub fn records(&self) -> &[Value] {
        match self {
            Self::Success { records, .. } => records,
            Self::LimitExceeded { .. } => &[],
        }
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Success { metadata, .. } => Some(metadata),
            Self::LimitExceeded { .. } => None,
        }
    }

    /// Adds metadata after the envelope was built. No-op on a refusal, which
    /// never carries a metadata block.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: Value) {
        if let Self::Success { metadata, .. } = self {
            metadata.insert(key.into(), value);
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Envelope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success {
                metadata,
                resource_name,
                records,
            } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("metadata", metadata)?;
                map.serialize_entry(resource_name, records)?;
                map.end()
            }
            Self::LimitExceeded { message } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    "error",
                    &serde_json::json!({
                        "code": codes::LIMIT_EXCEEDED,
                        "message": message,
                    }),
                )?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeBuilder {
    limits: ResponseLimits,
}

impl EnvelopeBuilder {
    pub fn new(limits: ResponseLimits) -> Self {
        Self { limits }
    }

    pub fn build<T: Serialize>(
        &self,
        records: &[T],
        resource_name: &str,
        extra_metadata: Option<Map<String, Value>>,
    ) -> Result<Envelope, CoreError> {
        if resource_name.trim().is_empty() {
            return Err(ValidationError::EmptyResourceName.into());
        }

        let records = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let size = PayloadSize::measure(&records);
        if let Some(exceeded) = self.exceeded(size) {
            tracing::warn!(
                resource = resource_name,
                chars = size.chars,
                bytes = size.bytes,
                "response exceeds size limit; returning guidance instead of data"
            );
            return Ok(Envelope::LimitExceeded {
                message: limit_guidance(resource_name, &exceeded),
            });
        }

        let count = records.len();
        let mut metadata = Map::new();
        metadata.insert("count".to_string(), Value::from(count));
        metadata.insert(
            "description".to_string(),
            Value::String(format!(
                "Found {count} {} for resource type {resource_name}",
                if count == 1 { "result" } else { "results" }
            )),
        );
        if let Some(extra) = extra_metadata {
            metadata.extend(extra);
        }

        Ok(Envelope::Success {
            metadata,
            resource_name: resource_name.to_string(),
            records,
        })
    }

    /// Single-record variant; the record becomes a one-element list.
    pub fn build_one<T: Serialize>(
        &self,
        record: &T,
        resource_name: &str,
        extra_metadata: Option<Map<String, Value>>,
    ) -> Result<Envelope, CoreError> {
        self.build(std::slice::from_ref(record), resource_name, extra_metadata)
    }

    fn exceeded(&self, size: PayloadSize) -> Option<String> {
        let mut exceeded = Vec::new();
        if size.chars > self.limits.max_chars {
            exceeded.push(format!("{} characters", self.limits.max_chars));
        }
        if size.bytes > self.limits.max_bytes {
            exceeded.push(format!("{} bytes", self.limits.max_bytes));
        }
        (!exceeded.is_empty()).then(|| exceeded.join(" and "))
    }
}

/// [`EnvelopeBuilder::build`] with the default limits.
pub fn build_envelope<T: Serialize>(
    records: &[T],
    resource_name: &str,
    extra_metadata: Option<Map<String, Value>>,
) -> Result<Envelope, CoreError> {
    EnvelopeBuilder::default().build(records, resource_name, extra_metadata)
}

fn limit_guidance(resource_name: &str, limits_exceeded: &str) -> String {
    format!(
        "The query for {resource_name} exceeded response size limits of {limits_exceeded}. \
Modify the query to return fewer results before retrying:\n\
1. Filter the results: add a since/until time range, status filters, specific teams or services, \
or a smaller 'limit'.\n\
2. Chunk the query: split a long time range into smaller windows (for example one week at a time) \
and combine the results.\n\
3. Prefer the most specific filters available and avoid repeating large queries."
    )
}

/// Character and UTF-8 byte count of a JSON tree's keys, strings and scalar
/// renderings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadSize {
    pub chars: usize,
    pub bytes: usize,
}

impl PayloadSize {
    pub fn measure(records: &[Value]) -> Self {
        let mut visitor = SizeVisitor::default();
        for record in records {
            visitor.visit(record);
        }
        visitor.size
    }
}

#[derive(Default)]
struct SizeVisitor {
    size: PayloadSize,
    visited: HashSet<*const Value>,
}

impl SizeVisitor {
    fn visit(&mut self, node: &Value) {
        match node {
            Value::Object(object) => {
                if !self.enter(node) {
                    return;
                }
                for (key, value) in object {
                    self.count(key);
                    self.visit(value);
                }
            }
            Value::Array(items) => {
                if !self.enter(node) {
                    return;
                }
                for item in items {
                    self.visit(item);
                }
            }
            Value::String(text) => self.count(text),
            scalar => self.count(&scalar.to_string()),
        }
    }

    /// False when the container was already measured.
    fn enter(&mut self, node: &Value) -> bool {
        self.visited.insert(node as *const Value)
    }

    fn count(&mut self, text: &str) {
        self.size.chars += text.chars().count();
        self.size.bytes += text.len();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::parsers::parse_user;

    #[test]
    fn single_user_envelope_has_count_and_description() {
        let raw = json!({"id": "P1", "name": "Alice", "email": "a@x", "type": "user"});
        let user = parse_user(&raw);
        let envelope = build_envelope(&[user], "users", None).unwrap();
        assert_eq!(
            envelope.to_value(),
            json!({
                "metadata": {"count": 1, "description": "Found 1 result for resource type users"},
                "users": [{"id": "P1", "name": "Alice", "email": "a@x", "type": "user"}]
            })
        );
    }

    #[test]
    fn single_mapping_under_singular_user_key() {
        let mapping = json!({"id": "P1", "name": "Alice", "email": "a@x"});
        let envelope = EnvelopeBuilder::default()
            .build_one(&mapping, "user", None)
            .unwrap();
        assert_eq!(
            envelope.to_value(),
            json!({
                "metadata": {"count": 1, "description": "Found 1 result for resource type user"},
                "user": [mapping]
            })
        );
    }

    #[test]
    fn build_one_wraps_record_in_a_list_and_merges_extra_metadata() {
        let mut extra = Map::new();
        extra.insert("notes_count".to_string(), json!(0));
        let envelope = EnvelopeBuilder::default()
            .build_one(&json!({"id": "Q1"}), "incident", Some(extra))
            .unwrap();
        assert_eq!(
            envelope.to_value(),
            json!({
                "metadata": {
                    "count": 1,
                    "description": "Found 1 result for resource type incident",
                    "notes_count": 0
                },
                "incident": [{"id": "Q1"}]
            })
        );
    }

    #[test]
    fn empty_list_uses_plural_description() {
        let envelope = build_envelope::<Value>(&[], "incidents", None).unwrap();
        assert_eq!(
            envelope.metadata().unwrap()["description"],
            json!("Found 0 results for resource type incidents")
        );
        assert_eq!(envelope.to_value()["incidents"], json!([]));
    }

    #[test]
    fn blank_resource_name_is_rejected() {
        let err = build_envelope(&[json!({})], "  ", None).unwrap_err();
        assert_eq!(err.to_string(), "resource_name cannot be empty");
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EmptyResourceName)
        ));
    }

    #[test]
    fn oversized_payload_is_replaced_by_guidance() {
        let big = json!({"title": "x".repeat(150_000)});
        let envelope = build_envelope(&[big], "incidents", None).unwrap();
        let value = envelope.to_value();

        assert_eq!(value["error"]["code"], json!("LIMIT_EXCEEDED"));
        let message = value["error"]["message"].as_str().unwrap();
        assert!(message.contains("incidents"));
        assert!(message.contains("100000 characters"));
        assert!(value.get("incidents").is_none());
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn byte_ceiling_applies_independently_of_characters() {
        let builder = EnvelopeBuilder::new(ResponseLimits {
            max_chars: 1_000,
            max_bytes: 100,
        });
        // 60 chars, 180 bytes.
        let envelope = builder
            .build(&[json!({"k": "€".repeat(60)})], "teams", None)
            .unwrap();
        match envelope {
            Envelope::LimitExceeded { message } => {
                assert!(message.contains("100 bytes"));
                assert!(!message.contains("characters"));
            }
            other => panic!("expected refusal, got {other:?}"),
        }
    }

    #[test]
    fn payload_size_counts_keys_strings_and_scalars() {
        let record = json!({"ab": "cd", "n": 12, "ok": true, "xs": [null, "é"]});
        let size = PayloadSize::measure(&[record]);
        // keys: ab n ok xs = 7, values: cd 12 true null é = 2 + 2 + 4 + 4 + 1
        assert_eq!(size.chars, 20);
        assert_eq!(size.bytes, 21);
    }
}
