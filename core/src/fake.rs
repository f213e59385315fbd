//! Scripted in-memory PagerDuty for accessor and resolver tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::{PagerDutyApi, PrincipalProvider, QueryParams};
use crate::error::UpstreamError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn params_named(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

pub(crate) struct FakePagerDuty {
    responses: HashMap<String, Result<Value, UpstreamError>>,
    principal: Result<Value, UpstreamError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakePagerDuty {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            principal: Err(UpstreamError::http(
                401,
                r#"{"error":{"message":"Unauthorized","code":2006}}"#,
            )),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Scripted body for `path`: an array for `list_all`, an object for `get`.
    pub fn respond(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), Ok(body));
        self
    }

    pub fn fail(mut self, path: &str, err: UpstreamError) -> Self {
        self.responses.insert(path.to_string(), Err(err));
        self
    }

    pub fn principal(mut self, user: Value) -> Self {
        self.principal = Ok(user);
        self
    }

    pub fn principal_fails(mut self, err: UpstreamError) -> Self {
        self.principal = Err(err);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    fn record_and_lookup(&self, path: &str, params: &QueryParams) -> Result<Value, UpstreamError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                path: path.to_string(),
                params: params.to_vec(),
            });
        }
        self.responses.get(path).cloned().unwrap_or_else(|| {
            Err(UpstreamError::http(
                404,
                json!({"error": {"message": "Not Found", "code": 2100}}).to_string(),
            ))
        })
    }
}

#[async_trait]
impl PagerDutyApi for FakePagerDuty {
    async fn list_all(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<Vec<Value>, UpstreamError> {
        match self.record_and_lookup(path, params)? {
            Value::Array(items) => Ok(items),
            other => Err(UpstreamError::transport(format!(
                "fake response for {path} is not a list: {other}"
            ))),
        }
    }

    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, UpstreamError> {
        self.record_and_lookup(path, params)
    }
}

#[async_trait]
impl PrincipalProvider for FakePagerDuty {
    async fn current_principal(&self) -> Result<Value, UpstreamError> {
        self.principal.clone()
    }
}
