//! Seams to the upstream REST API. The runtime crate provides the reqwest
//! implementation; tests use an in-memory fake.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamError;

/// Query parameters as ordered pairs; array filters repeat their `name[]` key.
pub type QueryParams = [(String, String)];

#[async_trait]
pub trait PagerDutyApi: Send + Sync {
    /// Every record of a collection endpoint, across all pages.
    async fn list_all(&self, path: &str, params: &QueryParams) -> Result<Vec<Value>, UpstreamError>;

    /// The decoded JSON body of a single GET.
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, UpstreamError>;
}

#[async_trait]
pub trait PrincipalProvider: Send + Sync {
    /// Raw user record of the token's owner.
    async fn current_principal(&self) -> Result<Value, UpstreamError>;
}

/// Builds query pairs the way the PagerDuty API expects them.
#[derive(Debug, Default, Clone)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn optional<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// `key[]=a&key[]=b`; nothing when `values` is empty.
    pub fn list<S: AsRef<str>>(mut self, key: &str, values: &[S]) -> Self {
        for value in values {
            self.pairs
                .push((format!("{key}[]"), value.as_ref().to_string()));
        }
        self
    }

    pub fn pairs(&self) -> &QueryParams {
        &self.pairs
    }
}
