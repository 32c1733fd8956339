//! Workspace and API token resolution
//!
//! The API token lives in the caller's user preferences, which the host owns.
//! [`CredentialStore`] is the seam to that storage.

use crate::error::{Result, TogglError};
use crate::options::QueryOptions;
use dashmap::DashMap;
use tracing::debug;

/// Name of the user preference holding the API token.
pub const API_KEY_PREFERENCE: &str = "toggl-apikey";

/// Password half of the basic-auth pair used with an API token.
pub const API_TOKEN_PASSWORD: &str = "api_token";

/// The preference the host has to register so users can store their token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyPreference {
    pub name: &'static str,
    pub kind: &'static str,
    pub section: &'static str,
    pub label_message: &'static str,
    pub help_message: &'static str,
}

pub fn api_key_preference() -> ApiKeyPreference {
    ApiKeyPreference {
        name: API_KEY_PREFERENCE,
        kind: "text",
        section: "personal/toggl",
        label_message: "toggl-apikey",
        help_message: "toggl-apikey-help",
    }
}

pub trait CredentialStore: Send + Sync {
    /// Stored API token of `user`, if any.
    fn api_token(&self, user: &str) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    tokens: DashMap<String, String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_api_token(&self, user: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(user.into(), token.into());
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn api_token(&self, user: &str) -> Option<String> {
        self.tokens
            .get(user)
            .map(|token| token.value().clone())
            .filter(|token| !token.is_empty())
    }
}

/// Basic-auth credentials for both Toggl APIs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_token: Option<String>,
}

impl Credentials {
    pub fn new(api_token: Option<String>) -> Self {
        Self {
            api_token: api_token.filter(|token| !token.is_empty()),
        }
    }

    pub fn from_store(store: &dyn CredentialStore, user: &str) -> Self {
        Self::new(store.api_token(user))
    }

    pub fn has_token(&self) -> bool {
        self.api_token.is_some()
    }

    /// `(user, password)` pair: the token as user, `api_token` as password.
    pub fn basic_auth(&self) -> (String, String) {
        (
            self.api_token.clone().unwrap_or_default(),
            API_TOKEN_PASSWORD.to_string(),
        )
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Workspace id from the `workspace_id` option, else the configured default.
pub fn resolve_workspace_id(options: &QueryOptions, default: Option<&str>) -> Result<String> {
    if let Some(id) = options.text("workspace_id").filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    match default.filter(|id| !id.is_empty()) {
        Some(id) => {
            debug!(workspace_id = id, "Using default workspace");
            Ok(id.to_string())
        }
        None => Err(TogglError::MissingWorkspaceId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::extract_options;

    #[test]
    fn test_explicit_workspace_wins() {
        let options = extract_options(["workspace_id=42"]);
        assert_eq!(resolve_workspace_id(&options, Some("7")).unwrap(), "42");
    }

    #[test]
    fn test_default_workspace_used() {
        let options = QueryOptions::new();
        assert_eq!(resolve_workspace_id(&options, Some("7")).unwrap(), "7");
    }

    #[test]
    fn test_missing_workspace_is_an_error() {
        let options = QueryOptions::new();
        assert!(matches!(
            resolve_workspace_id(&options, None),
            Err(TogglError::MissingWorkspaceId)
        ));
        assert!(matches!(
            resolve_workspace_id(&options, Some("")),
            Err(TogglError::MissingWorkspaceId)
        ));
    }

    #[test]
    fn test_store_lookup_and_basic_auth() {
        let store = InMemoryCredentialStore::new();
        store.set_api_token("alice", "secret");
        let credentials = Credentials::from_store(&store, "alice");
        assert_eq!(
            credentials.basic_auth(),
            ("secret".to_string(), "api_token".to_string())
        );
        assert!(!Credentials::from_store(&store, "bob").has_token());
    }

    #[test]
    fn test_api_key_preference() {
        let preference = api_key_preference();
        assert_eq!(preference.name, "toggl-apikey");
        assert_eq!(preference.section, "personal/toggl");
        assert_eq!(preference.help_message, "toggl-apikey-help");
    }

    #[test]
    fn test_debug_hides_token() {
        let credentials = Credentials::new(Some("secret".into()));
        assert!(!format!("{credentials:?}").contains("secret"));
    }
}
