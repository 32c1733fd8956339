//! Remote API gateway
//!
//! Two endpoint families are used: the v9 resource API (GET with a query
//! string) and the v3 reports API (POST with a JSON body). Both authenticate
//! with the caller's API token as basic-auth user and `api_token` as password.
//!
//! A non-2xx answer is not an error at this level: the status is handed back
//! to the caller together with the decoded body. A failure to reach the
//! service is reported as [`TogglError::TransportUnreachable`], and a 200
//! whose body is not JSON as [`TogglError::MalformedResponse`].

use crate::credentials::Credentials;
use crate::error::{Result, TogglError};
use crate::options::ResolvedParams;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE: &str = "https://api.track.toggl.com/api/v9";
pub const DEFAULT_REPORTS_BASE: &str = "https://api.track.toggl.com/reports/api/v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// `(user, password)` for basic auth.
    pub basic_auth: (String, String),
    pub user_agent: Option<String>,
}

/// Status code and decoded body of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Turn a non-200 answer into [`TogglError::RemoteCallFailed`].
    pub fn into_success(self) -> Result<Value> {
        if self.is_success() {
            return Ok(self.body);
        }
        let body = match &self.body {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Err(TogglError::RemoteCallFailed {
            status: self.status,
            body,
        })
    }
}

/// Performs one HTTP request. No retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// [`Transport`] backed by `reqwest`, with the client's default timeouts.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TogglError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let (user, password) = &request.basic_auth;

        let mut builder = self
            .client
            .request(method, &request.url)
            .basic_auth(user, Some(password))
            .header(CONTENT_TYPE, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }
        if let Some(agent) = &request.user_agent {
            builder = builder.header(USER_AGENT, agent);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TogglError::TransportUnreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TogglError::TransportUnreachable(e.to_string()))?;
        let body = decode_body(status, &bytes)?;

        Ok(ApiResponse { status, body })
    }
}

/// Decode a response body. A 200 must carry JSON; an error answer that is
/// not JSON keeps its text so it can be reported.
fn decode_body(status: u16, bytes: &[u8]) -> Result<Value> {
    match serde_json::from_slice(bytes) {
        Ok(body) => Ok(body),
        Err(e) if status == 200 => Err(TogglError::MalformedResponse(format!(
            "body is not JSON: {e}"
        ))),
        Err(e) => {
            debug!(status, error = %e, "Error response body is not JSON");
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            Ok(if text.is_empty() { Value::Null } else { Value::String(text) })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: String,
    pub reports_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            reports_base: DEFAULT_REPORTS_BASE.to_string(),
        }
    }
}

/// Authenticated access to the resource and reports APIs for one caller.
#[derive(Clone)]
pub struct TogglClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    credentials: Credentials,
    user_agent: Option<String>,
}

impl TogglClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        credentials: Credentials,
        user_agent: Option<String>,
    ) -> Self {
        if !credentials.has_token() {
            warn!("No Toggl API token available, requests will be unauthenticated");
        }
        Self {
            transport,
            endpoints,
            credentials,
            user_agent: user_agent.filter(|agent| !agent.is_empty()),
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// GET `{api_base}/{path}` with `params` as query string.
    pub async fn resource(&self, path: &str, params: &ResolvedParams) -> Result<ApiResponse> {
        let url = join_url(&self.endpoints.api_base, path);
        let request = ApiRequest {
            method: HttpMethod::Get,
            url,
            query: query_pairs(params),
            body: None,
            basic_auth: self.credentials.basic_auth(),
            user_agent: self.user_agent.clone(),
        };
        self.send(request).await
    }

    /// POST the summary report query for `workspace_id` as JSON.
    pub async fn summary_report(
        &self,
        workspace_id: &str,
        params: &ResolvedParams,
    ) -> Result<ApiResponse> {
        let path = format!("workspace/{workspace_id}/summary/time_entries");
        let url = join_url(&self.endpoints.reports_base, &path);
        let body = serde_json::to_value(params)
            .map_err(|e| TogglError::MalformedResponse(format!("cannot encode report query: {e}")))?;
        let request = ApiRequest {
            method: HttpMethod::Post,
            url,
            query: Vec::new(),
            body: Some(body),
            basic_auth: self.credentials.basic_auth(),
            user_agent: self.user_agent.clone(),
        };
        self.send(request).await
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        info!(method = %request.method, url = %request.url, "Calling Toggl API");
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!(status = response.status, "Toggl API returned an error status");
        }
        Ok(response)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Flatten params into query pairs; lists become `name[0]=..&name[1]=..`.
pub fn query_pairs(params: &ResolvedParams) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    pairs.push((format!("{key}[{index}]"), scalar_text(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs_flatten_lists() {
        let mut params = ResolvedParams::new();
        params.insert("user_ids".into(), json!([3, 4]));
        params.insert("active".into(), json!(true));
        params.insert("name".into(), json!("x"));
        assert_eq!(
            query_pairs(&params),
            vec![
                ("active".to_string(), "1".to_string()),
                ("name".to_string(), "x".to_string()),
                ("user_ids[0]".to_string(), "3".to_string()),
                ("user_ids[1]".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_json_success_is_malformed() {
        assert!(matches!(
            decode_body(200, b"<html>maintenance</html>"),
            Err(TogglError::MalformedResponse(_))
        ));
        assert!(matches!(decode_body(200, b""), Err(TogglError::MalformedResponse(_))));
        assert_eq!(decode_body(200, b"null").unwrap(), Value::Null);
    }

    #[test]
    fn test_non_json_error_keeps_text() {
        assert_eq!(
            decode_body(503, b"Service Unavailable\n").unwrap(),
            json!("Service Unavailable")
        );
        assert_eq!(decode_body(502, b"").unwrap(), Value::Null);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://h/api/v9/", "/workspaces"), "https://h/api/v9/workspaces");
    }

    #[test]
    fn test_into_success_keeps_status() {
        let err = ApiResponse::new(429, json!("Too many requests"))
            .into_success()
            .unwrap_err();
        match err {
            TogglError::RemoteCallFailed { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "Too many requests");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
