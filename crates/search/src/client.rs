//! Splunk REST Client
//!
//! Talks to the management port (8089 by default) with JSON output.

use crate::backend::SearchBackend;
use crate::error::SearchError;
use crate::job::{BackendHealth, JobStatus};
use crate::rule::SavedSearch;
use crate::ResultRow;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for a single REST call
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Connection settings for a Splunk instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplunkConfig {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub username: String,
    pub password: String,
    /// App namespace; all apps when unset
    pub app: Option<String>,
    /// Verify the server certificate (management ports are often self-signed)
    pub verify_tls: bool,
}

impl Default for SplunkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8089,
            scheme: "https".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            app: None,
            verify_tls: false,
        }
    }
}

impl SplunkConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Path prefix for namespaced endpoints
    pub fn namespace(&self) -> String {
        match self.app.as_deref().filter(|a| !a.is_empty()) {
            Some(app) => format!("/servicesNS/-/{}", app),
            None => "/services".to_string(),
        }
    }
}

/// Authenticated Splunk REST client
pub struct SplunkClient {
    http: Client,
    base_url: String,
    namespace: String,
    session_key: String,
}

impl SplunkClient {
    /// Log in and keep the session key for subsequent calls
    pub async fn connect(config: &SplunkConfig) -> Result<Self, SearchError> {
        info!("Connecting to Splunk at {}", config.base_url());

        let http = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()
            .map_err(|e| SearchError::Connection(e.to_string()))?;

        let base_url = config.base_url();
        let endpoint = "/services/auth/login";
        let response = http
            .post(format!("{}{}", base_url, endpoint))
            .form(&[
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
                ("output_mode", "json"),
            ])
            .send()
            .await?;

        let body = checked_json(endpoint, response).await.map_err(|e| match e {
            SearchError::Http { status, body, .. } if status == 401 => {
                SearchError::Authentication(body)
            }
            other => other,
        })?;
        let session_key = parse_session_key(&body)?;

        info!("Logged in to Splunk as {}", config.username);
        Ok(Self {
            http,
            base_url,
            namespace: config.namespace(),
            session_key,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Splunk {}", self.session_key))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Splunk {}", self.session_key))
    }
}

#[async_trait]
impl SearchBackend for SplunkClient {
    async fn health(&self) -> Result<BackendHealth, SearchError> {
        let endpoint = "/services/server/info";
        let response = self
            .get(endpoint)
            .query(&[("output_mode", "json")])
            .send()
            .await?;
        let body = checked_json(endpoint, response).await?;
        parse_health(&body)
    }

    async fn saved_searches(&self) -> Result<Vec<SavedSearch>, SearchError> {
        let endpoint = format!("{}/saved/searches", self.namespace);
        let response = self
            .get(&endpoint)
            .query(&[("output_mode", "json"), ("count", "0")])
            .send()
            .await?;
        let body = checked_json(&endpoint, response).await?;
        let rules = parse_saved_searches(&body)?;
        debug!("Fetched {} saved search(es)", rules.len());
        Ok(rules)
    }

    async fn create_job(&self, query: &str) -> Result<String, SearchError> {
        let endpoint = format!("{}/search/jobs", self.namespace);
        let response = self
            .post(&endpoint)
            .form(&[
                ("search", query),
                ("exec_mode", "normal"),
                ("output_mode", "json"),
            ])
            .send()
            .await?;
        let body = checked_json(&endpoint, response).await?;
        parse_sid(&body)
    }

    async fn job_status(&self, sid: &str) -> Result<JobStatus, SearchError> {
        let endpoint = format!("{}/search/jobs/{}", self.namespace, sid);
        let response = self
            .get(&endpoint)
            .query(&[("output_mode", "json")])
            .send()
            .await?;
        let body = checked_json(&endpoint, response).await?;
        parse_job_status(&body)
    }

    async fn job_results(&self, sid: &str) -> Result<Vec<ResultRow>, SearchError> {
        let endpoint = format!("{}/search/jobs/{}/results", self.namespace, sid);
        let response = self
            .get(&endpoint)
            .query(&[("output_mode", "json"), ("count", "0")])
            .send()
            .await?;
        let body = checked_json(&endpoint, response).await?;
        parse_results(body)
    }
}

/// Turn a non-success status into [`SearchError::Http`], otherwise decode JSON
async fn checked_json(endpoint: &str, response: Response) -> Result<Value, SearchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SearchError::Http {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

fn first_entry_content(body: &Value) -> Result<&Value, SearchError> {
    body.get("entry")
        .and_then(|e| e.get(0))
        .and_then(|e| e.get("content"))
        .ok_or_else(|| SearchError::InvalidResponse("missing entry[0].content".into()))
}

pub(crate) fn parse_session_key(body: &Value) -> Result<String, SearchError> {
    body.get("sessionKey")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SearchError::Authentication("no session key in login response".into()))
}

pub(crate) fn parse_health(body: &Value) -> Result<BackendHealth, SearchError> {
    first_entry_content(body)?
        .get("health_info")
        .and_then(Value::as_str)
        .map(BackendHealth::from_status)
        .ok_or_else(|| SearchError::InvalidResponse("server info without health_info".into()))
}

pub(crate) fn parse_saved_searches(body: &Value) -> Result<Vec<SavedSearch>, SearchError> {
    body.get("entry")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::InvalidResponse("saved searches without entry list".into()))?
        .iter()
        .map(SavedSearch::from_entry)
        .collect()
}

pub(crate) fn parse_sid(body: &Value) -> Result<String, SearchError> {
    body.get("sid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SearchError::InvalidResponse("job creation without sid".into()))
}

pub(crate) fn parse_job_status(body: &Value) -> Result<JobStatus, SearchError> {
    let content = first_entry_content(body)?;

    let messages = content
        .get("messages")
        .and_then(Value::as_object)
        .map(|by_level| {
            by_level
                .values()
                .filter_map(Value::as_array)
                .flatten()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<String>>()
        })
        .unwrap_or_default();

    Ok(JobStatus {
        is_done: flag(content.get("isDone")),
        is_failed: flag(content.get("isFailed")),
        done_progress: number(content.get("doneProgress")),
        scan_count: number(content.get("scanCount")) as u64,
        event_count: number(content.get("eventCount")) as u64,
        result_count: number(content.get("resultCount")) as u64,
        messages,
    })
}

pub(crate) fn parse_results(mut body: Value) -> Result<Vec<ResultRow>, SearchError> {
    match body.get_mut("results").map(Value::take) {
        Some(Value::Array(rows)) => Ok(rows),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(SearchError::InvalidResponse(format!(
            "results is not a list: {}",
            other
        ))),
    }
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0),
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
