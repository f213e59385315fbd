use serde_json::{Map, Value, json};

use super::{PagerDuty, require_id};
use crate::client::{PagerDutyApi, Query};
use crate::envelope::Envelope;
use crate::error::{CoreError, ValidationError};
use crate::parsers::{
    IncidentDetail, Note, PastIncident, RelatedIncident, parse_incident, parse_note,
    parse_past_incident, parse_related_incident,
};
use crate::timestamp::validate_iso8601;

const INCIDENTS_PATH: &str = "/incidents";
/// `last_status_change_by.type` of incidents resolved by their service.
const AUTORESOLVE_TYPE: &str = "service_reference";
const NO_DATA_PREFIX: &str = "No Data:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentStatus {
    Triggered,
    Acknowledged,
    Resolved,
}

impl IncidentStatus {
    pub const ALL: [Self; 3] = [Self::Triggered, Self::Acknowledged, Self::Resolved];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triggered => "triggered",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    High,
    Low,
}

impl Urgency {
    pub const ALL: [Self; 2] = [Self::High, Self::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|urgency| urgency.as_str() == value)
    }
}

/// Filters for [`PagerDuty::list_incidents`]. Unset statuses and urgencies
/// mean "all of them".
#[derive(Debug, Clone, Default)]
pub struct IncidentFilters {
    pub service_ids: Vec<String>,
    pub team_ids: Vec<String>,
    pub statuses: Option<Vec<String>>,
    pub urgencies: Option<Vec<String>>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub limit: Option<usize>,
}

/// Optional lookups attached to a single incident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncidentEnrichment {
    pub past_incidents: bool,
    pub related_incidents: bool,
    pub notes: bool,
}

fn validate_choices<T: Copy>(
    field: &str,
    values: Option<&[String]>,
    all: &[T],
    parse: impl Fn(&str) -> Option<T>,
    name: impl Fn(T) -> &'static str,
) -> Result<Vec<T>, ValidationError> {
    let Some(values) = values else {
        return Ok(all.to_vec());
    };
    let invalid: Vec<String> = values
        .iter()
        .filter(|value| parse(value.as_str()).is_none())
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidChoice {
            field: field.to_string(),
            invalid,
            valid: all.iter().map(|choice| name(*choice).to_string()).collect(),
        });
    }
    Ok(values.iter().filter_map(|value| parse(value.as_str())).collect())
}

/// Summary counts over raw incident records.
pub fn incident_metadata(incidents: &[Value]) -> Map<String, Value> {
    fn status_of(incident: &Value) -> Option<&str> {
        incident.get("status").and_then(Value::as_str)
    }

    let mut status_counts = Map::new();
    for status in IncidentStatus::ALL {
        let count = incidents
            .iter()
            .filter(|incident| status_of(incident) == Some(status.as_str()))
            .count();
        status_counts.insert(status.as_str().to_string(), Value::from(count));
    }

    let autoresolve_count = incidents
        .iter()
        .filter(|incident| {
            status_of(incident) == Some(IncidentStatus::Resolved.as_str())
                && incident
                    .pointer("/last_status_change_by/type")
                    .and_then(Value::as_str)
                    == Some(AUTORESOLVE_TYPE)
        })
        .count();

    let no_data_count = incidents
        .iter()
        .filter(|incident| {
            incident
                .get("title")
                .and_then(Value::as_str)
                .is_some_and(|title| title.starts_with(NO_DATA_PREFIX))
        })
        .count();

    let mut metadata = Map::new();
    metadata.insert("status_counts".to_string(), Value::Object(status_counts));
    metadata.insert("autoresolve_count".to_string(), json!(autoresolve_count));
    metadata.insert("no_data_count".to_string(), json!(no_data_count));
    metadata
}

fn records_under(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

impl<C: PagerDutyApi> PagerDuty<C> {
    pub async fn list_incidents(&self, filters: &IncidentFilters) -> Result<Envelope, CoreError> {
        let statuses = validate_choices(
            "statuses",
            filters.statuses.as_deref(),
            &IncidentStatus::ALL,
            IncidentStatus::parse,
            IncidentStatus::as_str,
        )?;
        let urgencies = validate_choices(
            "urgencies",
            filters.urgencies.as_deref(),
            &Urgency::ALL,
            Urgency::parse,
            Urgency::as_str,
        )?;
        if let Some(since) = &filters.since {
            validate_iso8601(since, "since")?;
        }
        if let Some(until) = &filters.until {
            validate_iso8601(until, "until")?;
        }

        let statuses: Vec<&str> = statuses.into_iter().map(IncidentStatus::as_str).collect();
        let urgencies: Vec<&str> = urgencies.into_iter().map(Urgency::as_str).collect();
        let query = Query::new()
            .list("statuses", &statuses)
            .list("urgencies", &urgencies)
            .list("service_ids", &filters.service_ids)
            .list("team_ids", &filters.team_ids)
            .optional("since", filters.since.as_deref())
            .optional("until", filters.until.as_deref());

        let raw = self.fetch_list(INCIDENTS_PATH, &query, filters.limit).await?;
        let metadata = incident_metadata(&raw);
        let parsed: Vec<_> = raw.iter().map(parse_incident).collect();
        self.envelopes.build(&parsed, "incidents", Some(metadata))
    }

    pub async fn show_incident(
        &self,
        incident_id: &str,
        enrichment: IncidentEnrichment,
    ) -> Result<Envelope, CoreError> {
        let incident_id = require_id(incident_id, "incident_id")?;
        let raw = self
            .fetch_one(
                &format!("{INCIDENTS_PATH}/{incident_id}"),
                &Query::new().param("include[]", "body"),
                "incident",
            )
            .await?;

        let mut detail = IncidentDetail::from(parse_incident(&raw));
        let mut metadata = Map::new();
        if enrichment.past_incidents {
            let past = self.past_incidents(incident_id, None, None).await?;
            metadata.insert("past_incidents_count".to_string(), json!(past.len()));
            detail.past_incidents = Some(past);
        }
        if enrichment.related_incidents {
            let related = self.related_incidents(incident_id).await?;
            metadata.insert("related_incidents_count".to_string(), json!(related.len()));
            detail.related_incidents = Some(related);
        }
        if enrichment.notes {
            let notes = self.notes(incident_id).await?;
            metadata.insert("notes_count".to_string(), json!(notes.len()));
            detail.notes = Some(notes);
        }

        self.envelopes.build_one(&detail, "incident", Some(metadata))
    }

    /// Similar incidents from the last six months, most similar first.
    pub async fn list_past_incidents(
        &self,
        incident_id: &str,
        limit: Option<u64>,
        total: Option<bool>,
    ) -> Result<Envelope, CoreError> {
        let past = self.past_incidents(incident_id, limit, total).await?;
        self.envelopes.build(&past, "incidents", None)
    }

    pub async fn list_related_incidents(&self, incident_id: &str) -> Result<Envelope, CoreError> {
        let related = self.related_incidents(incident_id).await?;
        self.envelopes.build(&related, "incidents", None)
    }

    pub async fn list_notes(&self, incident_id: &str) -> Result<Envelope, CoreError> {
        let notes = self.notes(incident_id).await?;
        self.envelopes.build(&notes, "notes", None)
    }

    async fn past_incidents(
        &self,
        incident_id: &str,
        limit: Option<u64>,
        total: Option<bool>,
    ) -> Result<Vec<PastIncident>, CoreError> {
        let incident_id = require_id(incident_id, "incident_id")?;
        let query = Query::new()
            .optional("limit", limit)
            .optional("total", total);
        let body = self
            .fetch_one(
                &format!("{INCIDENTS_PATH}/{incident_id}/past_incidents"),
                &query,
                "past_incidents",
            )
            .await?;
        Ok(records_under(body).iter().map(parse_past_incident).collect())
    }

    async fn related_incidents(
        &self,
        incident_id: &str,
    ) -> Result<Vec<RelatedIncident>, CoreError> {
        let incident_id = require_id(incident_id, "incident_id")?;
        let body = self
            .fetch_one(
                &format!("{INCIDENTS_PATH}/{incident_id}/related_incidents"),
                &Query::new(),
                "related_incidents",
            )
            .await?;
        Ok(records_under(body)
            .iter()
            .map(parse_related_incident)
            .collect())
    }

    async fn notes(&self, incident_id: &str) -> Result<Vec<Note>, CoreError> {
        let incident_id = require_id(incident_id, "incident_id")?;
        let body = self
            .fetch_one(
                &format!("{INCIDENTS_PATH}/{incident_id}/notes"),
                &Query::new(),
                "notes",
            )
            .await?;
        Ok(records_under(body).iter().map(parse_note).collect())
    }
}
