use super::{PagerDuty, require_id};
use crate::client::{PagerDutyApi, Query};
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::parsers::parse_team;

impl<C: PagerDutyApi> PagerDuty<C> {
    pub async fn list_teams(
        &self,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Envelope, CoreError> {
        let params = Query::new().optional("query", query);
        let raw = self.fetch_list("/teams", &params, limit).await?;
        let parsed: Vec<_> = raw.iter().map(parse_team).collect();
        self.envelopes.build(&parsed, "teams", None)
    }

    pub async fn show_team(&self, team_id: &str) -> Result<Envelope, CoreError> {
        let team_id = require_id(team_id, "team_id")?;
        let raw = self
            .fetch_one(&format!("/teams/{team_id}"), &Query::new(), "team")
            .await?;
        self.envelopes.build_one(&parse_team(&raw), "team", None)
    }
}
