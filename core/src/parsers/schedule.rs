use serde::Serialize;
use serde_json::Value;

use super::{Reference, reference_list};
use crate::extract::{map_list, string_field};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policies: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_layers: Option<Vec<ScheduleLayer>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<Reference>>,
}

pub fn parse_schedule(raw: &Value) -> Schedule {
    if !raw.is_object() {
        return Schedule::default();
    }

    Schedule {
        id: string_field(raw, "id"),
        name: string_field(raw, "name"),
        summary: string_field(raw, "summary"),
        description: string_field(raw, "description"),
        time_zone: string_field(raw, "time_zone"),
        escalation_policies: reference_list(raw, "escalation_policies", Reference::parse),
        teams: reference_list(raw, "teams", Reference::parse),
        schedule_layers: map_list(raw.get("schedule_layers"), parse_layer),
    }
}

fn parse_layer(raw: &Value) -> Option<ScheduleLayer> {
    if !raw.is_object() {
        return None;
    }
    let layer = ScheduleLayer {
        id: string_field(raw, "id"),
        name: string_field(raw, "name"),
        start: string_field(raw, "start"),
        end: string_field(raw, "end"),
        // Layer members are wrapped: `users: [{user: {id, summary}}]`.
        users: map_list(raw.get("users"), |entry| {
            entry.get("user").and_then(Reference::parse)
        }),
    };
    (layer != ScheduleLayer::default()).then_some(layer)
}
