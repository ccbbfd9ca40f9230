//! acigate - unified tool-invocation gateway client
//!
//! Discovers and executes wrapped third-party functions across two kinds of
//! upstream tool servers: an Apps server (direct, namespaced calls) and a
//! Unified server (intent-based semantic search). Discovery results are
//! cached with a TTL, intents route to ranked selections, and batches fan
//! out in parallel while preserving input order.

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod router;
pub mod transport;
pub mod types;

pub use config::Config;
pub use error::{GatewayError, Result};
pub use gateway::ToolGateway;
pub use router::{IntentRouter, RankOrder, RoutingDecision, Scorer};
pub use transport::{HttpTransport, MockOutcome, MockTransport, ToolTransport};
pub use types::{ErrorKind, ExecutionRequest, ExecutionResult, FunctionDescriptor};
