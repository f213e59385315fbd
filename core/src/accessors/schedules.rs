use super::{PagerDuty, require_id};
use crate::client::{PagerDutyApi, Query};
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::parsers::{parse_schedule, parse_user};
use crate::timestamp::validate_iso8601;

const SCHEDULES_PATH: &str = "/schedules";

fn time_range(since: Option<&str>, until: Option<&str>) -> Result<Query, CoreError> {
    if let Some(since) = since {
        validate_iso8601(since, "since")?;
    }
    if let Some(until) = until {
        validate_iso8601(until, "until")?;
    }
    Ok(Query::new()
        .optional("since", since)
        .optional("until", until))
}

impl<C: PagerDutyApi> PagerDuty<C> {
    pub async fn list_schedules(
        &self,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Envelope, CoreError> {
        let params = Query::new().optional("query", query);
        let raw = self.fetch_list(SCHEDULES_PATH, &params, limit).await?;
        let parsed: Vec<_> = raw.iter().map(parse_schedule).collect();
        self.envelopes.build(&parsed, "schedules", None)
    }

    /// `since`/`until` bound the rendered layer entries.
    pub async fn show_schedule(
        &self,
        schedule_id: &str,
        since: Option<&str>,
        until: Option<&str>,
    ) -> Result<Envelope, CoreError> {
        let schedule_id = require_id(schedule_id, "schedule_id")?;
        let params = time_range(since, until)?;
        let raw = self
            .fetch_one(&format!("{SCHEDULES_PATH}/{schedule_id}"), &params, "schedule")
            .await?;
        self.envelopes
            .build_one(&parse_schedule(&raw), "schedule", None)
    }

    /// Users on call for a schedule during the range.
    pub async fn list_users_oncall(
        &self,
        schedule_id: &str,
        since: Option<&str>,
        until: Option<&str>,
    ) -> Result<Envelope, CoreError> {
        let schedule_id = require_id(schedule_id, "schedule_id")?;
        let params = time_range(since, until)?;
        let body = self
            .fetch_one(&format!("{SCHEDULES_PATH}/{schedule_id}/users"), &params, "users")
            .await?;
        let parsed: Vec<_> = body
            .as_array()
            .map(|users| users.iter().map(parse_user).collect())
            .unwrap_or_default();
        self.envelopes.build(&parsed, "users", None)
    }
}
