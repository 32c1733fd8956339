#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use toggl_wiki::error::Result;
use toggl_wiki::gateway::Endpoints;
use toggl_wiki::{ApiRequest, ApiResponse, Credentials, TogglError, TogglExtension, Transport, TtlCache};

pub const API_BASE: &str = "https://toggl.test/api/v9";
pub const REPORTS_BASE: &str = "https://toggl.test/reports/api/v3";

enum Outcome {
    Respond(ApiResponse),
    Unreachable,
}

struct Route {
    url_suffix: String,
    outcome: Outcome,
    once: bool,
}

/// Transport double that answers by URL suffix and records every request.
/// Unrouted URLs get a 404 with a null body.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url_suffix: &str, status: u16, body: Value) {
        self.push(url_suffix, Outcome::Respond(ApiResponse::new(status, body)), false);
    }

    /// Answer the next matching request only, ahead of other routes.
    pub fn respond_once(&self, url_suffix: &str, status: u16, body: Value) {
        self.push(url_suffix, Outcome::Respond(ApiResponse::new(status, body)), true);
    }

    pub fn unreachable(&self, url_suffix: &str) {
        self.push(url_suffix, Outcome::Unreachable, false);
    }

    fn push(&self, url_suffix: &str, outcome: Outcome, once: bool) {
        let route = Route {
            url_suffix: url_suffix.to_string(),
            outcome,
            once,
        };
        let mut routes = self.routes.lock().unwrap();
        if once {
            routes.insert(0, route);
        } else {
            routes.push(route);
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url_suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(url_suffix))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        let Some(index) = routes.iter().position(|route| url.ends_with(&route.url_suffix)) else {
            return Ok(ApiResponse::new(404, Value::Null));
        };
        let result = match &routes[index].outcome {
            Outcome::Respond(response) => Ok(response.clone()),
            Outcome::Unreachable => Err(TogglError::TransportUnreachable("connection refused".into())),
        };
        if routes[index].once {
            routes.remove(index);
        }
        result
    }
}

pub fn endpoints() -> Endpoints {
    Endpoints {
        api_base: API_BASE.to_string(),
        reports_base: REPORTS_BASE.to_string(),
    }
}

pub fn extension(transport: Arc<FakeTransport>, default_workspace: Option<&str>) -> TogglExtension {
    TogglExtension::new(transport, endpoints(), Arc::new(TtlCache::default()))
        .with_default_workspace(default_workspace.map(str::to_string))
}

pub fn credentials() -> Credentials {
    Credentials::new(Some("secret-token".to_string()))
}

pub fn summary_path(workspace_id: &str) -> String {
    format!("/workspace/{workspace_id}/summary/time_entries")
}

/// One project group with two sub-groups: an hour and half an hour.
pub fn sample_summary() -> Value {
    json!({
        "groups": [{
            "id": 1,
            "title": {"project": "A", "client": "X"},
            "sub_groups": [
                {"id": "a", "seconds": 3600},
                {"id": "b", "seconds": 1800}
            ]
        }]
    })
}

/// Two user groups with client sub-groups.
pub fn users_by_clients_summary() -> Value {
    json!({
        "groups": [
            {"id": 10, "title": {"user": "Ada"}, "sub_groups": [
                {"id": 100, "title": "Acme", "seconds": 7200},
                {"id": 200, "title": "Globex", "seconds": 3600}
            ]},
            {"id": 20, "title": {"user": "Grace"}, "sub_groups": [
                {"id": 100, "title": "Acme", "seconds": 900}
            ]}
        ]
    })
}
