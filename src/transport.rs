//! Upstream transport: HTTP calls against the two tool-server kinds.
//!
//! The [`ToolTransport`] trait is the seam between the gateway and the wire.
//! [`HttpTransport`] is the production implementation; [`MockTransport`]
//! scripts outcomes for tests. Every call is a single attempt: the transport
//! cannot know whether an operation is side-effecting, so retries are a
//! caller policy.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::AuthConfig;
use crate::error::{GatewayError, Result};
use crate::types::{EXECUTE_FUNCTION, FunctionDescriptor};

/// Header carrying the API key; omitted entirely when no key is configured.
const HEADER_API_KEY: &str = "X-API-KEY";

/// Header naming whose linked accounts a call operates against; always sent.
const HEADER_LINKED_ACCOUNT: &str = "X-Linked-Account-Owner-Id";

/// Transport seam between the gateway and the upstream servers.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// POST one tool call to `{base_url}/tools/call` and return the parsed
    /// JSON response body. Failures are classified into the error taxonomy.
    async fn call_tool(
        &self,
        base_url: &str,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value>;

    /// GET the full catalog from `{base_url}/tools`.
    async fn fetch_catalog(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Vec<FunctionDescriptor>>;
}

/// Production transport over a shared reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
    api_key: Option<String>,
    linked_account_id: String,
}

impl HttpTransport {
    /// Create a transport from the auth configuration.
    ///
    /// A missing API key is degraded mode, not an error: some upstream
    /// operations accept unauthenticated calls, and rejecting is the
    /// server's job.
    pub fn new(auth: &AuthConfig) -> Result<Self> {
        if auth.api_key.is_none() {
            log::warn!("No API key configured - upstream calls run unauthenticated");
        }
        Self::with_credentials(auth.api_key.clone(), auth.linked_account_id.clone())
    }

    /// Create a transport with explicit credentials.
    pub fn with_credentials(
        api_key: Option<String>,
        linked_account_id: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            linked_account_id: linked_account_id.into(),
        })
    }

    fn endpoint(base_url: &str, path: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), path)
    }

    fn apply_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.header(HEADER_API_KEY, key),
            None => request,
        };
        request.header(HEADER_LINKED_ACCOUNT, &self.linked_account_id)
    }

    /// Map a reqwest send/decode error onto the failure taxonomy.
    fn classify(err: reqwest::Error, timeout: Duration) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(timeout.as_secs())
        } else if err.is_decode() {
            GatewayError::Transport(format!("unparseable response body: {}", err))
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    /// Drain a non-2xx response into an Http error carrying status and body.
    async fn http_error(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let message = match response.text().await {
            Ok(body) if !body.is_empty() => body,
            _ => "(no response body)".to_string(),
        };
        GatewayError::Http { status, message }
    }
}

#[async_trait]
impl ToolTransport for HttpTransport {
    async fn call_tool(
        &self,
        base_url: &str,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let url = Self::endpoint(base_url, "tools/call");
        let body = json!({ "name": name, "arguments": arguments });

        let request = self
            .apply_headers(self.client.post(&url))
            .timeout(timeout)
            .json(&body);

        let response = request
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        if !response.status().is_success() {
            return Err(Self::http_error(response).await);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Self::classify(e, timeout))
    }

    async fn fetch_catalog(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Vec<FunctionDescriptor>> {
        let url = Self::endpoint(base_url, "tools");

        let request = self.apply_headers(self.client.get(&url)).timeout(timeout);

        let response = request
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        if !response.status().is_success() {
            return Err(Self::http_error(response).await);
        }

        response
            .json::<Vec<FunctionDescriptor>>()
            .await
            .map_err(|e| Self::classify(e, timeout))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("linked_account_id", &self.linked_account_id)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

/// Scripted outcome for one [`MockTransport`] key.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Successful call returning this payload.
    Payload(Value),
    /// Deadline elapsed.
    Timeout,
    /// Upstream returned an error status.
    Http { status: u16, message: String },
    /// Connection or parse failure.
    Transport(String),
}

/// One recorded upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub base_url: String,
    pub name: String,
    /// Resolved routing key: the inner function name for execution
    /// meta-calls, otherwise `name` itself.
    pub routed: String,
    pub arguments: Value,
}

/// Scripted transport for tests.
///
/// Outcomes and delays are keyed by routing key: `ACI_EXECUTE_FUNCTION`
/// calls route by their inner `function_name` argument so a batch of
/// executions can be scripted per target function.
#[derive(Debug, Default)]
pub struct MockTransport {
    outcomes: HashMap<String, MockOutcome>,
    delays: HashMap<String, Duration>,
    catalog: Vec<FunctionDescriptor>,
    catalog_error: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
    catalog_fetches: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful payload for a routing key.
    pub fn with_payload(mut self, key: impl Into<String>, payload: Value) -> Self {
        self.outcomes.insert(key.into(), MockOutcome::Payload(payload));
        self
    }

    /// Script an arbitrary outcome for a routing key.
    pub fn with_outcome(mut self, key: impl Into<String>, outcome: MockOutcome) -> Self {
        self.outcomes.insert(key.into(), outcome);
        self
    }

    /// Delay responses for a routing key, to skew completion order.
    pub fn with_delay(mut self, key: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(key.into(), delay);
        self
    }

    /// Script the catalog listing.
    pub fn with_catalog(mut self, catalog: Vec<FunctionDescriptor>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Make catalog fetches fail.
    pub fn with_catalog_error(mut self, message: impl Into<String>) -> Self {
        self.catalog_error = Some(message.into());
        self
    }

    /// All recorded tool calls, in dispatch order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Total number of tool calls issued.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of tool calls whose routing key matched.
    pub fn calls_for(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.routed == key)
            .count()
    }

    /// Number of catalog fetches issued.
    pub fn catalog_fetches(&self) -> usize {
        self.catalog_fetches.load(Ordering::SeqCst)
    }

    fn route_key(name: &str, arguments: &Value) -> String {
        if name == EXECUTE_FUNCTION {
            if let Some(inner) = arguments.get("function_name").and_then(Value::as_str) {
                return inner.to_string();
            }
        }
        name.to_string()
    }
}

#[async_trait]
impl ToolTransport for MockTransport {
    async fn call_tool(
        &self,
        base_url: &str,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let routed = Self::route_key(name, &arguments);

        self.calls.lock().unwrap().push(RecordedCall {
            base_url: base_url.to_string(),
            name: name.to_string(),
            routed: routed.clone(),
            arguments,
        });

        if let Some(delay) = self.delays.get(&routed) {
            tokio::time::sleep(*delay).await;
        }

        match self.outcomes.get(&routed) {
            Some(MockOutcome::Payload(payload)) => Ok(payload.clone()),
            Some(MockOutcome::Timeout) => Err(GatewayError::Timeout(timeout.as_secs())),
            Some(MockOutcome::Http { status, message }) => Err(GatewayError::Http {
                status: *status,
                message: message.clone(),
            }),
            Some(MockOutcome::Transport(message)) => {
                Err(GatewayError::Transport(message.clone()))
            }
            None => Err(GatewayError::Transport(format!(
                "no scripted outcome for '{}'",
                routed
            ))),
        }
    }

    async fn fetch_catalog(
        &self,
        _base_url: &str,
        _timeout: Duration,
    ) -> Result<Vec<FunctionDescriptor>> {
        self.catalog_fetches.fetch_add(1, Ordering::SeqCst);

        match &self.catalog_error {
            Some(message) => Err(GatewayError::Transport(message.clone())),
            None => Ok(self.catalog.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        assert_eq!(
            HttpTransport::endpoint("http://localhost:8101", "tools/call"),
            "http://localhost:8101/tools/call"
        );
        assert_eq!(
            HttpTransport::endpoint("http://localhost:8100/", "tools"),
            "http://localhost:8100/tools"
        );
    }

    #[test]
    fn test_headers_with_api_key() {
        let transport =
            HttpTransport::with_credentials(Some("secret".to_string()), "alice").unwrap();

        let request = transport
            .apply_headers(transport.client.post("http://localhost:8101/tools/call"))
            .build()
            .unwrap();

        assert_eq!(request.headers().get(HEADER_API_KEY).unwrap(), "secret");
        assert_eq!(
            request.headers().get(HEADER_LINKED_ACCOUNT).unwrap(),
            "alice"
        );
    }

    #[test]
    fn test_headers_without_api_key() {
        let transport = HttpTransport::with_credentials(None, "default").unwrap();

        let request = transport
            .apply_headers(transport.client.post("http://localhost:8101/tools/call"))
            .build()
            .unwrap();

        // Degraded mode: the key header is omitted, never sent empty.
        assert!(request.headers().get(HEADER_API_KEY).is_none());
        assert_eq!(
            request.headers().get(HEADER_LINKED_ACCOUNT).unwrap(),
            "default"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let transport =
            HttpTransport::with_credentials(Some("secret".to_string()), "alice").unwrap();
        let debug = format!("{:?}", transport);
        assert!(debug.contains("has_api_key: true"));
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_mock_scripted_payload() {
        let mock = MockTransport::new().with_payload("GMAIL__SEND_EMAIL", json!({"sent": true}));

        let payload = mock
            .call_tool(
                "http://apps",
                "GMAIL__SEND_EMAIL",
                json!({}),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(payload, json!({"sent": true}));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_unscripted_key_is_transport_error() {
        let mock = MockTransport::new();

        let err = mock
            .call_tool("http://apps", "NOPE__OP", json!({}), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_mock_routes_execute_calls_by_inner_function() {
        let mock = MockTransport::new().with_payload("GITHUB__CREATE_ISSUE", json!({"id": 42}));

        let payload = mock
            .call_tool(
                "http://unified",
                EXECUTE_FUNCTION,
                json!({
                    "function_name": "GITHUB__CREATE_ISSUE",
                    "function_arguments": {"title": "Bug"}
                }),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(payload["id"], 42);
        assert_eq!(mock.calls_for("GITHUB__CREATE_ISSUE"), 1);
        assert_eq!(mock.calls()[0].name, EXECUTE_FUNCTION);
    }

    #[tokio::test]
    async fn test_mock_scripted_failures() {
        let mock = MockTransport::new()
            .with_outcome("A__TIMES_OUT", MockOutcome::Timeout)
            .with_outcome(
                "B__BAD",
                MockOutcome::Http {
                    status: 500,
                    message: "boom".to_string(),
                },
            );

        let err = mock
            .call_tool("http://apps", "A__TIMES_OUT", json!({}), Duration::from_secs(7))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(7)));

        let err = mock
            .call_tool("http://apps", "B__BAD", json!({}), Duration::from_secs(7))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Http { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_mock_catalog() {
        let mock = MockTransport::new().with_catalog(vec![FunctionDescriptor::named(
            "GITHUB__CREATE_ISSUE",
        )]);

        let catalog = mock
            .fetch_catalog("http://apps", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(mock.catalog_fetches(), 1);

        let failing = MockTransport::new().with_catalog_error("listing down");
        let err = failing
            .fetch_catalog("http://apps", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
