//! Canned PagerDuty responses for runtime tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pagerduty_mcp_core::client::QueryParams;
use pagerduty_mcp_core::{PagerDutyApi, PrincipalProvider, UpstreamError};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub(crate) path: String,
    params: Vec<(String, String)>,
}

impl Call {
    pub(crate) fn values(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

/// Unrouted paths answer 404; without a principal `/users/me` answers 401.
#[derive(Default)]
pub(crate) struct StaticPagerDuty {
    routes: HashMap<String, Value>,
    principal: Option<Value>,
    calls: Mutex<Vec<Call>>,
}

impl StaticPagerDuty {
    pub(crate) fn route(mut self, path: &str, body: Value) -> Self {
        self.routes.insert(path.to_string(), body);
        self
    }

    pub(crate) fn principal(mut self, user: Value) -> Self {
        self.principal = Some(user);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub(crate) fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    fn lookup(&self, path: &str, params: &QueryParams) -> Result<Value, UpstreamError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                path: path.to_string(),
                params: params.to_vec(),
            });
        }
        self.routes.get(path).cloned().ok_or_else(|| {
            let body = json!({"error": {"message": "Not Found", "code": 2100}});
            UpstreamError::http(404, body.to_string())
        })
    }
}

#[async_trait]
impl PagerDutyApi for StaticPagerDuty {
    async fn list_all(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<Vec<Value>, UpstreamError> {
        match self.lookup(path, params)? {
            Value::Array(records) => Ok(records),
            other => Ok(vec![other]),
        }
    }

    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, UpstreamError> {
        self.lookup(path, params)
    }
}

#[async_trait]
impl PrincipalProvider for StaticPagerDuty {
    async fn current_principal(&self) -> Result<Value, UpstreamError> {
        self.principal.clone().ok_or_else(|| {
            UpstreamError::http(401, json!({"error": {"message": "Unauthorized"}}).to_string())
        })
    }
}
