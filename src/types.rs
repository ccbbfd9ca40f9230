//! Wire-facing data types shared by the transport, gateway, and router.
//!
//! Upstream tool servers identify every invocable operation by a namespaced
//! name of the form `APP__OPERATION`. Execution outcomes are modeled as a
//! two-shape enum so a result can never be partially populated.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between the app namespace and the operation name.
pub const NAME_SEPARATOR: &str = "__";

/// Meta-function exposed by the unified server for intent search.
pub const SEARCH_FUNCTIONS: &str = "ACI_SEARCH_FUNCTIONS";

/// Meta-function exposed by the unified server for execution.
pub const EXECUTE_FUNCTION: &str = "ACI_EXECUTE_FUNCTION";

/// A remotely invocable function as reported by an upstream server.
///
/// Upstream responses may carry extra fields (schemas, tags); only the name
/// and description are retained here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Full namespaced name, e.g. `GMAIL__SEND_EMAIL`.
    pub name: String,

    /// Human-readable description, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FunctionDescriptor {
    /// Create a descriptor with a description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
        }
    }

    /// Create a descriptor without a description.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// The app namespace, i.e. the part before `__`.
    pub fn app_name(&self) -> Option<&str> {
        self.name.split_once(NAME_SEPARATOR).map(|(app, _)| app)
    }

    /// The operation within the app, i.e. the part after `__`.
    pub fn operation_name(&self) -> Option<&str> {
        self.name.split_once(NAME_SEPARATOR).map(|(_, op)| op)
    }
}

/// Failure classification carried by a failed [`ExecutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The per-call deadline elapsed before a response arrived.
    Timeout,
    /// The upstream returned a non-2xx status.
    Http,
    /// The connection could not be established or the body was unparseable.
    Transport,
    /// Direct call against an app missing from the enabled-apps allowlist.
    NotEnabled,
    /// No function matched an intent or name lookup.
    NotFound,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::Http => "http_error",
            Self::Transport => "transport_error",
            Self::NotEnabled => "not_enabled",
            Self::NotFound => "not_found",
        };
        write!(f, "{}", label)
    }
}

/// One invocation attempt, as fed to [`batch_execute`].
///
/// [`batch_execute`]: crate::gateway::ToolGateway::batch_execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Full namespaced function name.
    pub function_name: String,

    /// Open JSON object of argument name to value. Schemas live upstream;
    /// the gateway never types these.
    pub arguments: Value,

    /// Per-call timeout; the gateway default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ExecutionRequest {
    /// Create a request with the default timeout.
    pub fn new(function_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            function_name: function_name.into(),
            arguments,
            timeout_secs: None,
        }
    }

    /// Set an explicit per-call timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Outcome of one invocation: exactly a success with a payload, or a
/// classified failure with a message. Callers always receive one of the two
/// shapes; no operation surfaces a panic or a raw error past the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// The upstream call succeeded; `payload` is the parsed JSON response
    /// body, unmodified.
    Success { payload: Value },

    /// The call failed; `kind` classifies the failure per the taxonomy.
    Failure { kind: ErrorKind, message: String },
}

impl ExecutionResult {
    /// Build a success result.
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    /// Build a failure result.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Whether this result is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The payload, if this result is a success.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    /// The failure kind, if this result is a failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// The failure message, if this result is a failure.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_app_and_operation() {
        let desc = FunctionDescriptor::new("GMAIL__SEND_EMAIL", "Send an email");
        assert_eq!(desc.app_name(), Some("GMAIL"));
        assert_eq!(desc.operation_name(), Some("SEND_EMAIL"));
    }

    #[test]
    fn test_descriptor_without_separator() {
        let desc = FunctionDescriptor::named("MALFORMED");
        assert_eq!(desc.app_name(), None);
        assert_eq!(desc.operation_name(), None);
    }

    #[test]
    fn test_descriptor_deserializes_with_extra_fields() {
        let raw = json!({
            "name": "GITHUB__CREATE_ISSUE",
            "description": "Create an issue",
            "parameters": { "type": "object" },
            "tags": ["development"]
        });

        let desc: FunctionDescriptor = serde_json::from_value(raw).unwrap();
        assert_eq!(desc.name, "GITHUB__CREATE_ISSUE");
        assert_eq!(desc.description.as_deref(), Some("Create an issue"));
    }

    #[test]
    fn test_descriptor_missing_description() {
        let raw = json!({ "name": "SLACK__SEND_MESSAGE" });
        let desc: FunctionDescriptor = serde_json::from_value(raw).unwrap();
        assert!(desc.description.is_none());
    }

    #[test]
    fn test_execution_result_success_shape() {
        let result = ExecutionResult::success(json!({"id": 42}));
        assert!(result.is_success());
        assert_eq!(result.payload(), Some(&json!({"id": 42})));
        assert!(result.error_kind().is_none());
        assert!(result.error_message().is_none());
    }

    #[test]
    fn test_execution_result_failure_shape() {
        let result = ExecutionResult::failure(ErrorKind::Timeout, "deadline elapsed");
        assert!(!result.is_success());
        assert!(result.payload().is_none());
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(result.error_message(), Some("deadline elapsed"));
    }

    #[test]
    fn test_execution_result_serde_tag() {
        let success = ExecutionResult::success(json!({"ok": true}));
        let v = serde_json::to_value(&success).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["payload"]["ok"], true);

        let failure = ExecutionResult::failure(ErrorKind::Http, "HTTP 502");
        let v = serde_json::to_value(&failure).unwrap();
        assert_eq!(v["status"], "failure");
        assert_eq!(v["kind"], "http");
        assert_eq!(v["message"], "HTTP 502");
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
        assert_eq!(ErrorKind::Http.to_string(), "http_error");
        assert_eq!(ErrorKind::Transport.to_string(), "transport_error");
        assert_eq!(ErrorKind::NotEnabled.to_string(), "not_enabled");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }

    #[test]
    fn test_execution_request_builder() {
        let request = ExecutionRequest::new("GITHUB__CREATE_ISSUE", json!({"title": "Bug"}))
            .with_timeout(90);
        assert_eq!(request.function_name, "GITHUB__CREATE_ISSUE");
        assert_eq!(request.arguments["title"], "Bug");
        assert_eq!(request.timeout_secs, Some(90));
    }

    #[test]
    fn test_execution_request_serde_roundtrip() {
        let request = ExecutionRequest::new("SLACK__SEND_MESSAGE", json!({"channel": "#ops"}));
        let text = serde_json::to_string(&request).unwrap();
        let back: ExecutionRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back.function_name, "SLACK__SEND_MESSAGE");
        assert!(back.timeout_secs.is_none());
    }
}
