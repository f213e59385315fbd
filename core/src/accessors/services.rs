use super::{PagerDuty, require_id};
use crate::client::{PagerDutyApi, Query};
use crate::envelope::Envelope;
use crate::error::{CoreError, ValidationError};
use crate::parsers::parse_service;

impl<C: PagerDutyApi> PagerDuty<C> {
    /// `team_ids` of `None` lists every service; an explicit empty list is a
    /// caller mistake.
    pub async fn list_services(
        &self,
        team_ids: Option<&[String]>,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Envelope, CoreError> {
        if team_ids.is_some_and(<[String]>::is_empty) {
            return Err(ValidationError::Conflict {
                field: "team_ids".to_string(),
                message: "team_ids cannot be an empty list".to_string(),
            }
            .into());
        }

        let params = Query::new()
            .list("team_ids", team_ids.unwrap_or_default())
            .optional("query", query);
        let raw = self.fetch_list("/services", &params, limit).await?;
        let parsed: Vec<_> = raw.iter().map(parse_service).collect();
        self.envelopes.build(&parsed, "services", None)
    }

    pub async fn show_service(&self, service_id: &str) -> Result<Envelope, CoreError> {
        let service_id = require_id(service_id, "service_id")?;
        let raw = self
            .fetch_one(&format!("/services/{service_id}"), &Query::new(), "service")
            .await?;
        self.envelopes
            .build_one(&parse_service(&raw), "service", None)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::envelope::EnvelopeBuilder;
    use crate::fake::FakePagerDuty;

    #[tokio::test]
    async fn services_are_filtered_by_team() {
        let pd = PagerDuty::new(
            FakePagerDuty::new().respond("/services", json!([{"id": "S1", "name": "Checkout"}])),
            EnvelopeBuilder::default(),
        );
        let teams = vec!["T1".to_string(), "T2".to_string()];

        let envelope = pd.list_services(Some(teams.as_slice()), None, None).await.unwrap();

        assert_eq!(envelope.records(), &[json!({"id": "S1", "name": "Checkout"})]);
        assert_eq!(
            pd.client().calls()[0].params_named("team_ids[]"),
            vec!["T1", "T2"]
        );
    }

    #[tokio::test]
    async fn explicit_empty_team_list_is_rejected() {
        let pd = PagerDuty::new(FakePagerDuty::new(), EnvelopeBuilder::default());
        let no_teams: Vec<String> = Vec::new();
        let err = pd
            .list_services(Some(no_teams.as_slice()), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "team_ids cannot be an empty list");
        assert!(pd.client().calls().is_empty());
    }

    #[tokio::test]
    async fn show_service_reports_missing_envelope_key() {
        let pd = PagerDuty::new(
            FakePagerDuty::new().respond("/services/S1", json!({"services": []})),
            EnvelopeBuilder::default(),
        );
        let err = pd.show_service("S1").await.unwrap_err();
        assert_eq!(err.to_string(), "Response missing 'service' field");
    }
}
