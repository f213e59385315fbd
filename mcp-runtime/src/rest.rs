//! reqwest-backed PagerDuty REST client.

use async_trait::async_trait;
use pagerduty_mcp_core::client::QueryParams;
use pagerduty_mcp_core::{PagerDutyApi, PrincipalProvider, UpstreamError};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;

use crate::util::{self, StartupError};

const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";
const PAGE_SIZE: usize = 100;

pub struct RestClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl RestClient {
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self, StartupError> {
        reqwest::Url::parse(api_url).map_err(|source| StartupError::InvalidApiUrl {
            url: api_url.to_string(),
            source,
        })?;
        Ok(Self {
            http: util::client()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(
        &self,
        path: &str,
        params: &QueryParams,
        page: Option<(usize, usize)>,
    ) -> Result<reqwest::Url, UpstreamError> {
        let mut url =
            reqwest::Url::parse(&format!("{}{}", self.api_url, path)).map_err(|e| {
                UpstreamError::transport(format!("Invalid request URL for {path}: {e}"))
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            if let Some((limit, offset)) = page {
                pairs.append_pair("limit", &limit.to_string());
                pairs.append_pair("offset", &offset.to_string());
            }
        }
        Ok(url)
    }

    async fn get_json(&self, url: reqwest::Url) -> Result<Value, UpstreamError> {
        tracing::debug!(path = url.path(), "GET");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Token token={}", self.token))
            .header(ACCEPT, ACCEPT_V2)
            .send()
            .await
            .map_err(|e| {
                UpstreamError::transport(format!(
                    "Failed to reach PagerDuty API at {}: {e}",
                    self.api_url
                ))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            UpstreamError::transport(format!("Failed to read PagerDuty API response: {e}"))
        })?;
        if !status.is_success() {
            return Err(UpstreamError::http(status.as_u16(), text));
        }
        serde_json::from_str(&text).map_err(|e| {
            UpstreamError::transport(format!("PagerDuty API returned invalid JSON: {e}"))
        })
    }
}

/// Collection endpoints return their records under the last path segment:
/// `/schedules/S1/users` lists `users`.
fn collection_key(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Records of one page and whether the API reports more after it.
fn split_page(mut body: Value, key: &str) -> Result<(Vec<Value>, bool), UpstreamError> {
    let more = body.get("more").and_then(Value::as_bool).unwrap_or(false);
    match body.get_mut(key).map(Value::take) {
        Some(Value::Array(records)) => Ok((records, more)),
        _ => Err(UpstreamError::missing_field(key)),
    }
}

#[async_trait]
impl PagerDutyApi for RestClient {
    async fn list_all(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<Vec<Value>, UpstreamError> {
        let key = collection_key(path);
        let mut records = Vec::new();
        loop {
            let url = self.url(path, params, Some((PAGE_SIZE, records.len())))?;
            let (page, more) = split_page(self.get_json(url).await?, key)?;
            let fetched = page.len();
            records.extend(page);
            if !more || fetched == 0 {
                break;
            }
        }
        Ok(records)
    }

    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, UpstreamError> {
        let url = self.url(path, params, None)?;
        self.get_json(url).await
    }
}

#[async_trait]
impl PrincipalProvider for RestClient {
    async fn current_principal(&self) -> Result<Value, UpstreamError> {
        let mut body = self.get("/users/me", &[]).await?;
        body.get_mut("user")
            .map(Value::take)
            .ok_or_else(|| UpstreamError::missing_field("user"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn collection_key_is_last_segment() {
        assert_eq!(collection_key("/incidents"), "incidents");
        assert_eq!(collection_key("/schedules/S1/users"), "users");
        assert_eq!(collection_key("/incidents/Q1/past_incidents/"), "past_incidents");
    }

    #[test]
    fn split_page_reads_records_and_more_flag() {
        let body = json!({"oncalls": [{"id": 1}], "more": true, "offset": 0});
        let (records, more) = split_page(body, "oncalls").unwrap();
        assert_eq!(records, vec![json!({"id": 1})]);
        assert!(more);

        let (_, more) = split_page(json!({"oncalls": []}), "oncalls").unwrap();
        assert!(!more);
    }

    #[test]
    fn split_page_requires_the_collection_key() {
        let err = split_page(json!({"error": "nope"}), "teams").unwrap_err();
        assert_eq!(err.to_string(), "Response missing 'teams' field");
    }

    #[test]
    fn url_keeps_repeated_array_params_and_paging() {
        let client = RestClient::new("https://api.pagerduty.com/", "token").unwrap();
        let params = vec![
            ("team_ids[]".to_string(), "T1".to_string()),
            ("team_ids[]".to_string(), "T2".to_string()),
        ];
        let url = client.url("/services", &params, Some((100, 200))).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.pagerduty.com/services?team_ids%5B%5D=T1&team_ids%5B%5D=T2&limit=100&offset=200"
        );
    }

    #[test]
    fn invalid_api_url_is_a_startup_error() {
        let err = RestClient::new("not a url", "token").err().unwrap();
        assert_eq!(err.code(), "invalid_api_url");
    }
}
