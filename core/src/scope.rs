//! "My teams / services / escalation policies" for the token's owner.
//!
//! Resolution walks four dependent lookups in order. A failing stage stops the
//! walk and whatever was gathered so far is returned together with the stage
//! that failed, so callers always get a usable (possibly empty) scope.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::client::{PagerDutyApi, PrincipalProvider, Query};
use crate::error::{UpstreamError, handle_api_error};
use crate::parsers::parse_user;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserScope {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub team_ids: Vec<String>,
    pub service_ids: Vec<String>,
    pub escalation_policy_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeStage {
    Principal,
    Teams,
    Services,
    EscalationPolicies,
}

impl ScopeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Teams => "teams",
            Self::Services => "services",
            Self::EscalationPolicies => "escalation_policies",
        }
    }
}

impl fmt::Display for ScopeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScopeOutcome {
    Complete,
    Degraded {
        failed_stage: ScopeStage,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeResolution {
    pub scope: UserScope,
    pub outcome: ScopeOutcome,
}

impl ScopeResolution {
    pub fn is_complete(&self) -> bool {
        self.outcome == ScopeOutcome::Complete
    }

    fn degraded(scope: UserScope, stage: ScopeStage, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        // Upstream failures were already logged with their response body.
        tracing::warn!(stage = %stage, reason = %reason, "continuing with partial user scope");
        Self {
            scope,
            outcome: ScopeOutcome::Degraded {
                failed_stage: stage,
                reason,
            },
        }
    }
}

pub struct ScopeResolver<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C> ScopeResolver<'a, C>
where
    C: PagerDutyApi + PrincipalProvider + ?Sized,
{
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Never fails; see [`ScopeOutcome`] for how far resolution got.
    pub async fn resolve(&self) -> ScopeResolution {
        let raw_principal = match self
            .client
            .current_principal()
            .await
            .or_else(handle_api_error)
        {
            Ok(raw) => raw,
            Err(err) => {
                return ScopeResolution::degraded(
                    UserScope::default(),
                    ScopeStage::Principal,
                    err.to_string(),
                );
            }
        };

        let principal = parse_user(&raw_principal);
        let Some(user_id) = principal.id.as_deref().and_then(clean_id) else {
            return ScopeResolution::degraded(
                UserScope::default(),
                ScopeStage::Principal,
                "current user record has no id",
            );
        };

        let mut scope = UserScope {
            user_id,
            name: principal.name,
            email: principal.email,
            ..UserScope::default()
        };

        scope.team_ids = match team_ids(&raw_principal) {
            Ok(ids) => ids,
            Err(reason) => return ScopeResolution::degraded(scope, ScopeStage::Teams, reason),
        };

        if !scope.team_ids.is_empty() {
            let query = Query::new().list("team_ids", &scope.team_ids);
            match self.list_ids("/services", &query).await {
                Ok(ids) => scope.service_ids = ids,
                Err(err) => {
                    return ScopeResolution::degraded(scope, ScopeStage::Services, err.to_string());
                }
            }
        }

        let query = Query::new().list("user_ids", std::slice::from_ref(&scope.user_id));
        match self.list_ids("/escalation_policies", &query).await {
            Ok(ids) => scope.escalation_policy_ids = ids,
            Err(err) => {
                return ScopeResolution::degraded(
                    scope,
                    ScopeStage::EscalationPolicies,
                    err.to_string(),
                );
            }
        }

        tracing::info!(
            user_id = %scope.user_id,
            teams = scope.team_ids.len(),
            services = scope.service_ids.len(),
            escalation_policies = scope.escalation_policy_ids.len(),
            "resolved user scope"
        );
        ScopeResolution {
            scope,
            outcome: ScopeOutcome::Complete,
        }
    }

    async fn list_ids(&self, path: &str, query: &Query) -> Result<Vec<String>, UpstreamError> {
        let records = self
            .client
            .list_all(path, query.pairs())
            .await
            .or_else(handle_api_error)?;
        Ok(records
            .iter()
            .filter_map(|record| record.get("id"))
            .filter_map(coerce_id)
            .collect())
    }
}

/// Team ids off the principal record. Unlike later stages, a malformed list
/// here is a stage failure rather than something to skip.
fn team_ids(principal: &Value) -> Result<Vec<String>, String> {
    let teams = principal
        .get("teams")
        .and_then(Value::as_array)
        .ok_or_else(|| "current user record has no teams list".to_string())?;

    let mut ids = Vec::with_capacity(teams.len());
    for team in teams {
        let id = team
            .get("id")
            .ok_or_else(|| "team entry without an id".to_string())?;
        ids.extend(coerce_id(id));
    }
    Ok(ids)
}

fn coerce_id(value: &Value) -> Option<String> {
    value.as_str().and_then(clean_id)
}

fn clean_id(id: &str) -> Option<String> {
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fake::FakePagerDuty;

    fn principal() -> Value {
        json!({
            "id": "U1",
            "name": "Alice",
            "email": "alice@example.com",
            "teams": [{"id": "T1"}, {"id": " T2 "}, {"id": ""}, {"id": null}, {"id": 7}]
        })
    }

    #[tokio::test]
    async fn complete_resolution_collects_every_stage() {
        let fake = FakePagerDuty::new()
            .principal(principal())
            .respond("/services", json!([{"id": "S1"}, {"id": "  "}, {"name": "no id"}]))
            .respond("/escalation_policies", json!([{"id": "EP1"}, {"id": "EP2"}]));

        let resolution = ScopeResolver::new(&fake).resolve().await;

        assert!(resolution.is_complete());
        assert_eq!(
            resolution.scope,
            UserScope {
                user_id: "U1".to_string(),
                name: Some("Alice".to_string()),
                email: Some("alice@example.com".to_string()),
                team_ids: vec!["T1".to_string(), "T2".to_string()],
                service_ids: vec!["S1".to_string()],
                escalation_policy_ids: vec!["EP1".to_string(), "EP2".to_string()],
            }
        );

        let service_calls = fake.calls_to("/services");
        assert_eq!(service_calls[0].params_named("team_ids[]"), vec!["T1", "T2"]);
        let policy_calls = fake.calls_to("/escalation_policies");
        assert_eq!(policy_calls[0].params_named("user_ids[]"), vec!["U1"]);
    }

    #[tokio::test]
    async fn principal_failure_yields_empty_scope() {
        let fake = FakePagerDuty::new().principal_fails(UpstreamError::transport("timed out"));

        let resolution = ScopeResolver::new(&fake).resolve().await;

        assert_eq!(resolution.scope, UserScope::default());
        assert_eq!(
            resolution.outcome,
            ScopeOutcome::Degraded {
                failed_stage: ScopeStage::Principal,
                reason: "timed out".to_string(),
            }
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn principal_without_id_yields_empty_scope() {
        let fake = FakePagerDuty::new().principal(json!({"name": "ghost", "teams": []}));
        let resolution = ScopeResolver::new(&fake).resolve().await;
        assert_eq!(resolution.scope, UserScope::default());
        assert!(matches!(
            resolution.outcome,
            ScopeOutcome::Degraded {
                failed_stage: ScopeStage::Principal,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn malformed_team_entry_stops_after_principal() {
        let fake = FakePagerDuty::new()
            .principal(json!({"id": "U1", "teams": [{"id": "T1"}, {"summary": "no id key"}]}))
            .respond("/escalation_policies", json!([{"id": "EP1"}]));

        let resolution = ScopeResolver::new(&fake).resolve().await;

        assert_eq!(resolution.scope.user_id, "U1");
        assert!(resolution.scope.team_ids.is_empty());
        assert!(resolution.scope.escalation_policy_ids.is_empty());
        assert!(matches!(
            resolution.outcome,
            ScopeOutcome::Degraded {
                failed_stage: ScopeStage::Teams,
                ..
            }
        ));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn service_failure_keeps_user_and_teams() {
        let fake = FakePagerDuty::new()
            .principal(principal())
            .fail("/services", UpstreamError::http(500, "Internal Server Error"))
            .respond("/escalation_policies", json!([{"id": "EP1"}]));

        let resolution = ScopeResolver::new(&fake).resolve().await;

        assert_eq!(resolution.scope.user_id, "U1");
        assert_eq!(resolution.scope.team_ids, vec!["T1", "T2"]);
        assert!(resolution.scope.service_ids.is_empty());
        assert!(resolution.scope.escalation_policy_ids.is_empty());
        assert_eq!(
            resolution.outcome,
            ScopeOutcome::Degraded {
                failed_stage: ScopeStage::Services,
                reason: "PagerDuty API responded with HTTP 500".to_string(),
            }
        );
        assert!(fake.calls_to("/escalation_policies").is_empty());
    }

    #[tokio::test]
    async fn policy_failure_keeps_everything_gathered_before_it() {
        let fake = FakePagerDuty::new()
            .principal(principal())
            .respond("/services", json!([{"id": "S1"}]))
            .fail("/escalation_policies", UpstreamError::transport("connection reset"));

        let resolution = ScopeResolver::new(&fake).resolve().await;

        assert_eq!(resolution.scope.service_ids, vec!["S1"]);
        assert!(resolution.scope.escalation_policy_ids.is_empty());
        assert!(matches!(
            resolution.outcome,
            ScopeOutcome::Degraded {
                failed_stage: ScopeStage::EscalationPolicies,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn no_teams_skips_service_lookup() {
        let fake = FakePagerDuty::new()
            .principal(json!({"id": "U1", "teams": []}))
            .respond("/escalation_policies", json!([{"id": "EP1"}]));

        let resolution = ScopeResolver::new(&fake).resolve().await;

        assert!(resolution.is_complete());
        assert!(resolution.scope.service_ids.is_empty());
        assert_eq!(resolution.scope.escalation_policy_ids, vec!["EP1"]);
        assert!(fake.calls_to("/services").is_empty());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = ScopeOutcome::Degraded {
            failed_stage: ScopeStage::EscalationPolicies,
            reason: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(outcome).unwrap(),
            json!({"status": "degraded", "failed_stage": "escalation_policies", "reason": "boom"})
        );
    }
}
