use serde::Serialize;
use serde_json::{Number, Value};

use super::{IdReference, Reference, TypedReference, reference_list};
use crate::extract::{map_list, number_field, string_field};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EscalationPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_rules: Option<Vec<EscalationRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<IdReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EscalationRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_delay_in_minutes: Option<Number>,
    /// Users or schedules paged at this level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<TypedReference>>,
}

pub fn parse_escalation_policy(raw: &Value) -> EscalationPolicy {
    if !raw.is_object() {
        return EscalationPolicy::default();
    }

    EscalationPolicy {
        id: string_field(raw, "id"),
        name: string_field(raw, "name"),
        escalation_rules: map_list(raw.get("escalation_rules"), parse_rule),
        services: reference_list(raw, "services", IdReference::parse),
        teams: reference_list(raw, "teams", Reference::parse),
        description: string_field(raw, "description"),
    }
}

fn parse_rule(raw: &Value) -> Option<EscalationRule> {
    if !raw.is_object() {
        return None;
    }
    let rule = EscalationRule {
        id: string_field(raw, "id"),
        escalation_delay_in_minutes: number_field(raw, "escalation_delay_in_minutes"),
        targets: reference_list(raw, "targets", TypedReference::parse),
    };
    (rule != EscalationRule::default()).then_some(rule)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rules_keep_typed_targets_and_drop_empty_entries() {
        let raw = json!({
            "id": "EP1",
            "name": "Checkout",
            "num_loops": 2,
            "escalation_rules": [
                {
                    "id": "R1",
                    "escalation_delay_in_minutes": 30,
                    "targets": [
                        {"id": "S1", "type": "schedule_reference", "summary": "Primary", "self": "x"},
                        {"type": "user_reference"}
                    ]
                },
                {},
                null
            ],
            "services": [{"id": "SVC1", "summary": "Checkout API"}],
            "teams": [{"id": "T1", "summary": "Payments", "type": "team_reference"}]
        });

        assert_eq!(
            serde_json::to_value(parse_escalation_policy(&raw)).unwrap(),
            json!({
                "id": "EP1",
                "name": "Checkout",
                "escalation_rules": [{
                    "id": "R1",
                    "escalation_delay_in_minutes": 30,
                    "targets": [{"id": "S1", "type": "schedule_reference", "summary": "Primary"}]
                }],
                "services": [{"id": "SVC1"}],
                "teams": [{"id": "T1", "summary": "Payments"}]
            })
        );
    }

    #[test]
    fn empty_policy_is_empty_object() {
        assert_eq!(
            serde_json::to_value(parse_escalation_policy(&json!({}))).unwrap(),
            json!({})
        );
    }
}
