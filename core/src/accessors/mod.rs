//! Resource accessors: one upstream round-trip (or a short sequence of them)
//! per operation, parsed and wrapped in an [`Envelope`].
//!
//! Upstream failures are logged through [`handle_api_error`] and propagated
//! unchanged; argument problems surface as [`ValidationError`]s before any
//! request is made.

mod escalation_policies;
mod incidents;
mod oncalls;
mod schedules;
mod services;
mod teams;
mod users;

use serde_json::Value;

use crate::client::{PagerDutyApi, Query};
use crate::envelope::{Envelope, EnvelopeBuilder};
use crate::error::{CoreError, UpstreamError, ValidationError, handle_api_error};

pub use incidents::{
    IncidentEnrichment, IncidentFilters, IncidentStatus, Urgency, incident_metadata,
};
pub use oncalls::OncallFilters;

/// Typed access to the PagerDuty REST API through an injected client.
pub struct PagerDuty<C> {
    client: C,
    envelopes: EnvelopeBuilder,
}

impl<C: PagerDutyApi> PagerDuty<C> {
    pub fn new(client: C, envelopes: EnvelopeBuilder) -> Self {
        Self { client, envelopes }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn envelopes(&self) -> &EnvelopeBuilder {
        &self.envelopes
    }

    /// An empty, successful envelope; used when a scoped query has nothing to
    /// filter on and would otherwise fall back to an unscoped listing.
    pub fn empty(&self, resource_name: &str) -> Result<Envelope, CoreError> {
        self.envelopes.build::<Value>(&[], resource_name, None)
    }

    async fn fetch_list(
        &self,
        path: &str,
        query: &Query,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, UpstreamError> {
        tracing::debug!(path, params = query.pairs().len(), "listing");
        let mut records = self
            .client
            .list_all(path, query.pairs())
            .await
            .or_else(handle_api_error)?;
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// GETs `path` and returns the record under `key`.
    async fn fetch_one(
        &self,
        path: &str,
        query: &Query,
        key: &str,
    ) -> Result<Value, UpstreamError> {
        tracing::debug!(path, "fetching");
        let mut body = self
            .client
            .get(path, query.pairs())
            .await
            .or_else(handle_api_error)?;
        take_field(&mut body, key)
    }
}

pub(crate) fn take_field(body: &mut Value, key: &str) -> Result<Value, UpstreamError> {
    body.as_object_mut()
        .and_then(|object| object.remove(key))
        .ok_or_else(|| UpstreamError::missing_field(key))
        .or_else(handle_api_error)
}

/// Trims `value` and checks it can be spliced into a request path as-is.
pub(crate) fn require_id<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    let reserved = |c: char| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace();
    if matches!(value, "." | "..") || value.contains(reserved) {
        return Err(ValidationError::InvalidId {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}
