use serde::Serialize;
use serde_json::{Number, Value};

use super::{Reference, reference};
use crate::extract::{number_field, string_field};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Oncall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_level: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

pub fn parse_oncall(raw: &Value) -> Oncall {
    if !raw.is_object() {
        return Oncall::default();
    }

    Oncall {
        escalation_policy: reference(raw, "escalation_policy", Reference::parse),
        escalation_level: number_field(raw, "escalation_level"),
        schedule: reference(raw, "schedule", Reference::parse),
        user: reference(raw, "user", Reference::parse),
        start: string_field(raw, "start"),
        end: string_field(raw, "end"),
    }
}
