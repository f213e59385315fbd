use super::PagerDuty;
use crate::client::{PagerDutyApi, Query};
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::parsers::parse_oncall;
use crate::timestamp::validate_iso8601;

/// Without `since`/`until` PagerDuty returns who is on call right now; with
/// them, every on-call entry overlapping the range.
#[derive(Debug, Clone, Default)]
pub struct OncallFilters {
    pub schedule_ids: Vec<String>,
    pub user_ids: Vec<String>,
    pub escalation_policy_ids: Vec<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub limit: Option<usize>,
    /// Only the earliest on-call per user, policy and level.
    pub earliest: Option<bool>,
}

impl<C: PagerDutyApi> PagerDuty<C> {
    pub async fn list_oncalls(&self, filters: &OncallFilters) -> Result<Envelope, CoreError> {
        if let Some(since) = &filters.since {
            validate_iso8601(since, "since")?;
        }
        if let Some(until) = &filters.until {
            validate_iso8601(until, "until")?;
        }

        let query = Query::new()
            .list("schedule_ids", &filters.schedule_ids)
            .list("user_ids", &filters.user_ids)
            .list("escalation_policy_ids", &filters.escalation_policy_ids)
            .optional("since", filters.since.as_deref())
            .optional("until", filters.until.as_deref())
            .optional("earliest", filters.earliest);

        let raw = self.fetch_list("/oncalls", &query, filters.limit).await?;
        let parsed: Vec<_> = raw.iter().map(parse_oncall).collect();
        self.envelopes.build(&parsed, "oncalls", None)
    }
}
