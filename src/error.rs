//! Error types and user-visible error fragments
//!
//! Every failure of a tag invocation degrades to an HTML fragment carrying a
//! message key and its parameters. The localization of those keys belongs to
//! the host; [`DefaultMessages`] provides English text for standalone use.

use thiserror::Error;

pub const MSG_WORKSPACE_ID: &str = "toggl-error-workspace-id";
pub const MSG_RESPONSE_ERROR: &str = "toggl-response-error";
pub const MSG_UNREACHABLE: &str = "toggl-error-unreachable";
pub const MSG_MALFORMED: &str = "toggl-error-malformed-response";
pub const MSG_CONFIG: &str = "toggl-error-config";

#[derive(Debug, Error)]
pub enum TogglError {
    #[error("no workspace id given and no default workspace configured")]
    MissingWorkspaceId,
    #[error("remote call failed with status {status}")]
    RemoteCallFailed { status: u16, body: String },
    #[error("remote service unreachable: {0}")]
    TransportUnreachable(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TogglError>;

/// A message key plus positional parameters, resolved by a [`MessageLocalizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub key: &'static str,
    pub params: Vec<String>,
}

impl TogglError {
    pub fn message(&self) -> ErrorMessage {
        let (key, params) = match self {
            TogglError::MissingWorkspaceId => (MSG_WORKSPACE_ID, Vec::new()),
            TogglError::RemoteCallFailed { status, body } => {
                let mut params = vec![status.to_string()];
                if !body.is_empty() {
                    params.push(body.clone());
                }
                (MSG_RESPONSE_ERROR, params)
            }
            TogglError::TransportUnreachable(reason) => (MSG_UNREACHABLE, vec![reason.clone()]),
            TogglError::MalformedResponse(reason) => (MSG_MALFORMED, vec![reason.clone()]),
            TogglError::Config(reason) => (MSG_CONFIG, vec![reason.clone()]),
        };
        ErrorMessage { key, params }
    }

    /// Status code of a failed remote call, if this error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TogglError::RemoteCallFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Host-provided lookup from message keys to display text.
///
/// Parameters use the `$1`, `$2`, ... placeholder convention.
pub trait MessageLocalizer: Send + Sync {
    fn localize(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMessages;

impl MessageLocalizer for DefaultMessages {
    fn localize(&self, key: &str) -> Option<String> {
        let text = match key {
            MSG_WORKSPACE_ID => {
                "No Toggl workspace id given. Pass workspace_id=... or configure a default workspace."
            }
            MSG_RESPONSE_ERROR => "Toggl responded with an error (status $1).",
            MSG_UNREACHABLE => "Toggl could not be reached: $1",
            MSG_MALFORMED => "Toggl returned an unexpected response: $1",
            MSG_CONFIG => "Toggl extension misconfigured: $1",
            _ => return None,
        };
        Some(text.to_string())
    }
}

/// Render an error message into the fragment shown in place of the tag output.
pub fn error_fragment(message: &ErrorMessage, localizer: &dyn MessageLocalizer) -> String {
    let template = localizer
        .localize(message.key)
        .unwrap_or_else(|| format!("&lt;{}&gt;", message.key));
    let text = substitute_params(&template, &message.params);
    format!("<div class=\"toggl-error alert alert-danger\">{text}</div>")
}

/// Replace `$1`, `$2`, ... in one pass, so parameter text is never expanded.
fn substitute_params(template: &str, params: &[String]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        output.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits = after.len() - after.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let param = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| params.get(index));
        match param {
            Some(param) => output.push_str(&escape_html(param)),
            None => output.push_str(&rest[pos..pos + 1 + digits]),
        }
        rest = &after[digits..];
    }
    output.push_str(rest);
    output
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failure_fragment_carries_status() {
        let err = TogglError::RemoteCallFailed {
            status: 429,
            body: String::new(),
        };
        let html = error_fragment(&err.message(), &DefaultMessages);
        assert!(html.contains("429"));
        assert!(html.starts_with("<div class=\"toggl-error alert alert-danger\">"));
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn test_missing_workspace_message_key() {
        let message = TogglError::MissingWorkspaceId.message();
        assert_eq!(message.key, MSG_WORKSPACE_ID);
        assert!(message.params.is_empty());
    }

    #[test]
    fn test_unknown_key_is_shown_escaped() {
        struct Nothing;
        impl MessageLocalizer for Nothing {
            fn localize(&self, _key: &str) -> Option<String> {
                None
            }
        }
        let html = error_fragment(&TogglError::MissingWorkspaceId.message(), &Nothing);
        assert!(html.contains("&lt;toggl-error-workspace-id&gt;"));
    }

    #[test]
    fn test_params_are_substituted_once() {
        let message = ErrorMessage {
            key: MSG_RESPONSE_ERROR,
            params: vec!["cost $2 <b>".to_string(), "x".to_string()],
        };
        struct Two;
        impl MessageLocalizer for Two {
            fn localize(&self, _key: &str) -> Option<String> {
                Some("$1 / $2 / $3 / $".to_string())
            }
        }
        assert_eq!(
            error_fragment(&message, &Two),
            "<div class=\"toggl-error alert alert-danger\">cost $2 &lt;b&gt; / x / $3 / $</div>"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}
