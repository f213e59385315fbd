use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::{IdReference, Note, Reference, reference, reference_list};
use crate::extract::{
    extract_principal_and_timestamp, map_list, number_field, object_field, string_field,
    value_field,
};

const PRINCIPAL_FIELDS: &[&str] = &["id", "summary"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Incident {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_number: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    /// A plain string on older incidents, `{type, incident}` on merges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_reason: Option<Value>,
    /// `{assignee: {id, summary}, at}` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignments: Option<Vec<Map<String, Value>>>,
    /// `{acknowledger: {id, summary}, at}` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledgements: Option<Vec<Map<String, Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<IdReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_counts: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status_change_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status_change_by: Option<Reference>,
    /// Event payload details from `body.details.__pd_cef_payload.details`,
    /// minus `title`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_details: Option<Map<String, Value>>,
}

pub fn parse_incident(raw: &Value) -> Incident {
    if !raw.is_object() {
        return Incident::default();
    }

    Incident {
        id: string_field(raw, "id"),
        incident_number: number_field(raw, "incident_number"),
        title: string_field(raw, "title"),
        status: string_field(raw, "status"),
        urgency: string_field(raw, "urgency"),
        priority: object_field(raw, "priority"),
        created_at: string_field(raw, "created_at"),
        updated_at: string_field(raw, "updated_at"),
        resolved_at: string_field(raw, "resolved_at"),
        resolve_reason: value_field(raw, "resolve_reason"),
        assignments: map_list(raw.get("assignments"), |item| {
            extract_principal_and_timestamp(item, "assignee", PRINCIPAL_FIELDS)
        }),
        acknowledgements: map_list(raw.get("acknowledgements"), |item| {
            extract_principal_and_timestamp(item, "acknowledger", PRINCIPAL_FIELDS)
        }),
        service: reference(raw, "service", IdReference::parse),
        teams: reference_list(raw, "teams", Reference::parse),
        alert_counts: object_field(raw, "alert_counts"),
        summary: string_field(raw, "summary"),
        description: string_field(raw, "description"),
        escalation_policy: reference(raw, "escalation_policy", Reference::parse),
        incident_key: string_field(raw, "incident_key"),
        last_status_change_at: string_field(raw, "last_status_change_at"),
        last_status_change_by: reference(raw, "last_status_change_by", Reference::parse),
        body_details: parse_body_details(raw),
    }
}

fn parse_body_details(raw: &Value) -> Option<Map<String, Value>> {
    let details = raw
        .pointer("/body/details/__pd_cef_payload/details")?
        .as_object()?;
    let kept: Map<String, Value> = details
        .iter()
        .filter(|(key, value)| key.as_str() != "title" && !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    (!kept.is_empty()).then_some(kept)
}

/// Similar incident from the past-incidents endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PastIncident {
    #[serde(flatten)]
    pub incident: Incident,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

/// Reads `{incident: {...}, score}`.
pub fn parse_past_incident(raw: &Value) -> PastIncident {
    PastIncident {
        incident: parse_incident(raw.get("incident").unwrap_or(&Value::Null)),
        similarity_score: raw.get("score").and_then(Value::as_f64),
    }
}

/// Incident linked through the related-incidents endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelatedIncident {
    #[serde(flatten)]
    pub incident: Incident,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_metadata: Option<Value>,
}

/// Reads `{incident: {...}, relationships: [{type, metadata}, ...]}`; only the
/// first relationship is reported.
pub fn parse_related_incident(raw: &Value) -> RelatedIncident {
    let first = raw
        .get("relationships")
        .and_then(Value::as_array)
        .and_then(|relationships| relationships.first());

    RelatedIncident {
        incident: parse_incident(raw.get("incident").unwrap_or(&Value::Null)),
        relationship_type: first.and_then(|relationship| string_field(relationship, "type")),
        relationship_metadata: first
            .and_then(|relationship| relationship.get("metadata"))
            .filter(|metadata| !metadata.is_null())
            .cloned(),
    }
}

/// A single incident with its optional enrichment lists.
///
/// The lists are present only when they were requested, and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidentDetail {
    #[serde(flatten)]
    pub incident: Incident,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub past_incidents: Option<Vec<PastIncident>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_incidents: Option<Vec<RelatedIncident>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
}

impl From<Incident> for IncidentDetail {
    fn from(incident: Incident) -> Self {
        Self {
            incident,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn to_json(incident: &Incident) -> Value {
        serde_json::to_value(incident).unwrap()
    }

    #[test]
    fn empty_and_null_inputs_parse_to_empty_objects() {
        assert_eq!(to_json(&parse_incident(&json!({}))), json!({}));
        assert_eq!(to_json(&parse_incident(&Value::Null)), json!({}));
        assert_eq!(to_json(&parse_incident(&json!("incident"))), json!({}));
    }

    #[test]
    fn assignment_principal_is_reduced_and_empty_lists_are_omitted() {
        let raw = json!({
            "id": "X",
            "status": "triggered",
            "assignments": [
                {"assignee": {"id": "U1", "summary": "Alice", "html_url": "https://pd/users/U1"}, "at": "t"}
            ],
            "acknowledgements": [],
            "teams": [],
            "self": "https://api.pagerduty.com/incidents/X"
        });

        assert_eq!(
            to_json(&parse_incident(&raw)),
            json!({
                "id": "X",
                "status": "triggered",
                "assignments": [{"assignee": {"id": "U1", "summary": "Alice"}, "at": "t"}]
            })
        );
    }

    #[test]
    fn nested_references_follow_their_allow_lists() {
        let raw = json!({
            "incident_number": 1234,
            "priority": {"id": "PR1", "summary": "P1"},
            "alert_counts": {},
            "service": {"id": "S1", "summary": "Checkout", "type": "service_reference"},
            "teams": [{"id": "T1", "summary": "SRE", "type": "team_reference"}, {"summary": "no id"}],
            "escalation_policy": {"id": "EP1", "summary": "Default", "self": "x"},
            "last_status_change_by": {"id": "S1", "type": "service_reference"},
            "acknowledgements": [{"acknowledger": {"id": "U2", "type": "user_reference"}, "at": "t2"}]
        });

        assert_eq!(
            to_json(&parse_incident(&raw)),
            json!({
                "incident_number": 1234,
                "priority": {"id": "PR1", "summary": "P1"},
                "service": {"id": "S1"},
                "teams": [{"id": "T1", "summary": "SRE"}],
                "escalation_policy": {"id": "EP1", "summary": "Default"},
                "last_status_change_by": {"id": "S1"},
                "acknowledgements": [{"acknowledger": {"id": "U2"}, "at": "t2"}]
            })
        );
    }

    #[test]
    fn body_details_drop_title_and_nulls() {
        let raw = json!({
            "body": {"details": {"__pd_cef_payload": {"details": {
                "title": "dup of incident title",
                "query": "avg(last_5m):cpu > 90",
                "tags": ["env:prod"],
                "monitor": null
            }}}}
        });
        assert_eq!(
            to_json(&parse_incident(&raw)),
            json!({"body_details": {"query": "avg(last_5m):cpu > 90", "tags": ["env:prod"]}})
        );

        let only_title =
            json!({"body": {"details": {"__pd_cef_payload": {"details": {"title": "t"}}}}});
        assert_eq!(to_json(&parse_incident(&only_title)), json!({}));

        let not_an_object = json!({"body": {"details": "plain text body"}});
        assert_eq!(to_json(&parse_incident(&not_an_object)), json!({}));
    }

    #[test]
    fn wrong_typed_strings_are_omitted() {
        let raw = json!({"id": 7, "incident_number": "12", "title": "Disk full"});
        assert_eq!(to_json(&parse_incident(&raw)), json!({"title": "Disk full"}));
    }

    #[test]
    fn merge_resolve_reason_and_float_number_survive() {
        let reason = json!({
            "type": "merge_resolve_reason",
            "incident": {"id": "Q9", "type": "incident_reference", "summary": "[#9] Parent"}
        });
        let raw = json!({"id": "Q1", "resolve_reason": reason.clone(), "incident_number": 12.0});
        assert_eq!(
            to_json(&parse_incident(&raw)),
            json!({"id": "Q1", "incident_number": 12.0, "resolve_reason": reason})
        );

        let plain = json!({"id": "Q2", "resolve_reason": "timeout", "incident_number": 5});
        assert_eq!(
            to_json(&parse_incident(&plain)),
            json!({"id": "Q2", "incident_number": 5, "resolve_reason": "timeout"})
        );
    }

    #[test]
    fn past_incident_carries_similarity_score() {
        let raw = json!({
            "incident": {"id": "Q1", "title": "Old outage", "self": "https://x"},
            "score": 46.8
        });
        assert_eq!(
            serde_json::to_value(parse_past_incident(&raw)).unwrap(),
            json!({"id": "Q1", "title": "Old outage", "similarity_score": 46.8})
        );
    }

    #[test]
    fn related_incident_reports_first_relationship_only() {
        let raw = json!({
            "incident": {"id": "Q2", "created_at": "2025-02-08T19:34:42Z"},
            "relationships": [
                {"type": "machine_learning_inferred", "metadata": {"grouping_classification": "prior_feedback"}},
                {"type": "service_dependency"}
            ]
        });
        assert_eq!(
            serde_json::to_value(parse_related_incident(&raw)).unwrap(),
            json!({
                "id": "Q2",
                "created_at": "2025-02-08T19:34:42Z",
                "relationship_type": "machine_learning_inferred",
                "relationship_metadata": {"grouping_classification": "prior_feedback"}
            })
        );

        let without = json!({"incident": {"id": "Q3"}, "relationships": []});
        assert_eq!(
            serde_json::to_value(parse_related_incident(&without)).unwrap(),
            json!({"id": "Q3"})
        );
    }
}
