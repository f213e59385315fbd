use super::{PagerDuty, require_id};
use crate::client::{PagerDutyApi, Query};
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::parsers::parse_user;

const USERS_PATH: &str = "/users";

impl<C: PagerDutyApi> PagerDuty<C> {
    pub async fn list_users(
        &self,
        team_ids: &[String],
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Envelope, CoreError> {
        let params = Query::new()
            .list("team_ids", team_ids)
            .optional("query", query);
        let raw = self.fetch_list(USERS_PATH, &params, limit).await?;
        let parsed: Vec<_> = raw.iter().map(parse_user).collect();
        self.envelopes.build(&parsed, "users", None)
    }

    pub async fn show_user(&self, user_id: &str) -> Result<Envelope, CoreError> {
        let user_id = require_id(user_id, "user_id")?;
        let raw = self
            .fetch_one(&format!("{USERS_PATH}/{user_id}"), &Query::new(), "user")
            .await?;
        self.envelopes.build_one(&parse_user(&raw), "user", None)
    }

    /// The token owner's user record.
    pub async fn show_current_user(&self) -> Result<Envelope, CoreError> {
        let raw = self
            .fetch_one(&format!("{USERS_PATH}/me"), &Query::new(), "user")
            .await?;
        self.envelopes.build_one(&parse_user(&raw), "user", None)
    }
}
