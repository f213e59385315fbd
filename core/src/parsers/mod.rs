//! Per-resource reducers from raw PagerDuty JSON to minimal, stable records.
//!
//! Every parser takes untrusted `&Value` and returns its record type; null,
//! non-object or empty input yields the default record which serializes to
//! `{}`. Absent values are omitted from the output, never emitted as `null`.

mod escalation_policy;
mod incident;
mod note;
mod oncall;
mod schedule;
mod service;
mod team;
mod user;

use serde::Serialize;
use serde_json::Value;

use crate::extract::non_empty_string_field;

pub use escalation_policy::{EscalationPolicy, EscalationRule, parse_escalation_policy};
pub use incident::{
    Incident, IncidentDetail, PastIncident, RelatedIncident, parse_incident, parse_past_incident,
    parse_related_incident,
};
pub use note::{Note, NoteChannel, NoteUser, parse_note};
pub use oncall::{Oncall, parse_oncall};
pub use schedule::{Schedule, ScheduleLayer, parse_schedule};
pub use service::{Service, parse_service};
pub use team::{ParentTeam, Team, parse_team};
pub use user::{User, UserLink, parse_user};

/// `{id, summary?}` reference to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Reference {
    /// `None` unless the raw reference carries a non-empty string id.
    pub fn parse(raw: &Value) -> Option<Self> {
        Some(Self {
            id: non_empty_string_field(raw, "id")?,
            summary: non_empty_string_field(raw, "summary"),
        })
    }
}

/// `{id, type?, summary?}` reference, used where the target kind varies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedReference {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl TypedReference {
    pub fn parse(raw: &Value) -> Option<Self> {
        Some(Self {
            id: non_empty_string_field(raw, "id")?,
            kind: non_empty_string_field(raw, "type"),
            summary: non_empty_string_field(raw, "summary"),
        })
    }
}

/// Bare `{id}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdReference {
    pub id: String,
}

impl IdReference {
    pub fn parse(raw: &Value) -> Option<Self> {
        Some(Self {
            id: non_empty_string_field(raw, "id")?,
        })
    }
}

/// Parses `raw[key]` as a list of references, `None` when nothing survives.
pub(crate) fn reference_list<T>(
    raw: &Value,
    key: &str,
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<Vec<T>> {
    crate::extract::map_list(raw.get(key), parse)
}

/// `raw[key]` parsed as a single reference, `None` when absent or id-less.
pub(crate) fn reference<T>(
    raw: &Value,
    key: &str,
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    raw.get(key).and_then(parse)
}
