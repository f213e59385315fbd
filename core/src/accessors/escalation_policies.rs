use super::{PagerDuty, require_id};
use crate::client::{PagerDutyApi, Query};
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::parsers::parse_escalation_policy;

const ESCALATION_POLICIES_PATH: &str = "/escalation_policies";

impl<C: PagerDutyApi> PagerDuty<C> {
    pub async fn list_escalation_policies(
        &self,
        query: Option<&str>,
        user_ids: &[String],
        team_ids: &[String],
        limit: Option<usize>,
    ) -> Result<Envelope, CoreError> {
        let params = Query::new()
            .optional("query", query)
            .list("user_ids", user_ids)
            .list("team_ids", team_ids);
        let raw = self
            .fetch_list(ESCALATION_POLICIES_PATH, &params, limit)
            .await?;
        let parsed: Vec<_> = raw.iter().map(parse_escalation_policy).collect();
        self.envelopes.build(&parsed, "escalation_policies", None)
    }

    pub async fn show_escalation_policy(&self, policy_id: &str) -> Result<Envelope, CoreError> {
        let policy_id = require_id(policy_id, "policy_id")?;
        let raw = self
            .fetch_one(
                &format!("{ESCALATION_POLICIES_PATH}/{policy_id}"),
                &Query::new(),
                "escalation_policy",
            )
            .await?;
        self.envelopes
            .build_one(&parse_escalation_policy(&raw), "escalation_policy", None)
    }
}
