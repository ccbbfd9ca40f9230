//! Intent routing: map free text to a ranked function selection.
//!
//! The router asks the gateway's search for candidates and applies a
//! selection policy. The default policy is rank-order top-1: the upstream
//! relevance order is authoritative and the first candidate wins. A custom
//! [`Scorer`] may be installed; abstaining (or misbehaving) scorers fall
//! back to top-1.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::ToolGateway;
use crate::transport::ToolTransport;
use crate::types::{ExecutionResult, FunctionDescriptor};

/// Candidates requested from search per routed intent.
const ROUTE_SEARCH_LIMIT: u32 = 5;

/// Outcome of routing one intent.
///
/// The decision failed iff `selected` is absent; execution is only ever
/// attached after a selection exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The intent as given by the caller.
    pub intent: String,

    /// Top-ranked candidate, absent when nothing matched.
    pub selected: Option<FunctionDescriptor>,

    /// Remaining candidates in rank order.
    pub alternatives: Vec<FunctionDescriptor>,

    /// Present only when auto-execution was requested and a selection
    /// existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
}

impl RoutingDecision {
    fn not_found(intent: &str) -> Self {
        Self {
            intent: intent.to_string(),
            selected: None,
            alternatives: Vec::new(),
            execution: None,
        }
    }

    /// Whether a function was selected for this intent.
    pub fn succeeded(&self) -> bool {
        self.selected.is_some()
    }
}

/// Pluggable selection policy over ranked candidates.
///
/// `select` returns the index of the winning candidate, or `None` to
/// abstain. Candidates are never empty when this is called.
pub trait Scorer: Send + Sync {
    fn select(&self, intent: &str, candidates: &[FunctionDescriptor]) -> Option<usize>;
}

/// Default policy: the first candidate by upstream relevance order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankOrder;

impl Scorer for RankOrder {
    fn select(&self, _intent: &str, _candidates: &[FunctionDescriptor]) -> Option<usize> {
        Some(0)
    }
}

/// Routes free-text intents to functions via the gateway.
pub struct IntentRouter<T: ToolTransport> {
    gateway: Arc<ToolGateway<T>>,
    categories: BTreeMap<String, Vec<String>>,
    scorer: Box<dyn Scorer>,
}

impl<T: ToolTransport> IntentRouter<T> {
    /// Create a router with the default category table and rank-order
    /// selection.
    pub fn new(gateway: Arc<ToolGateway<T>>) -> Self {
        Self {
            gateway,
            categories: default_categories(),
            scorer: Box::new(RankOrder),
        }
    }

    /// Install a custom selection policy.
    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// The category table: descriptive metadata mapping category names to
    /// app names. Not consulted by the default policy; custom scorers are
    /// the sanctioned consumer.
    pub fn categories(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categories
    }

    /// The category an app belongs to, if any.
    pub fn category_of(&self, app: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, apps)| apps.iter().any(|a| a == app))
            .map(|(category, _)| category.as_str())
    }

    /// Route an intent to a function selection.
    pub async fn route(&self, intent: &str, context: Option<&Value>) -> RoutingDecision {
        let _ = context; // reserved for future routing refinement

        let mut candidates = self.gateway.search(intent, ROUTE_SEARCH_LIMIT, true).await;

        if candidates.is_empty() {
            log::warn!("No functions matched intent '{}'", intent);
            return RoutingDecision::not_found(intent);
        }

        let index = match self.scorer.select(intent, &candidates) {
            Some(i) if i < candidates.len() => i,
            _ => 0,
        };
        let selected = candidates.remove(index);

        RoutingDecision {
            intent: intent.to_string(),
            selected: Some(selected),
            alternatives: candidates,
            execution: None,
        }
    }

    /// Route an intent and optionally execute the selection.
    ///
    /// Execution happens only when `auto_execute` is set AND the context
    /// carries an `"arguments"` entry; otherwise the caller triggers
    /// execution explicitly with the selected function's name. A failed
    /// routing is returned unchanged.
    pub async fn route_and_execute(
        &self,
        intent: &str,
        context: Option<&Value>,
        auto_execute: bool,
    ) -> RoutingDecision {
        let mut decision = self.route(intent, context).await;

        let Some(selected) = decision.selected.as_ref() else {
            return decision;
        };

        if auto_execute {
            if let Some(arguments) = context.and_then(|c| c.get("arguments")) {
                let result = self
                    .gateway
                    .execute(&selected.name, arguments.clone(), None)
                    .await;
                decision.execution = Some(result);
            }
        }

        decision
    }
}

/// Built-in category table. Descriptive metadata only; see
/// [`IntentRouter::categories`].
fn default_categories() -> BTreeMap<String, Vec<String>> {
    let table = [
        ("communication", vec!["GMAIL", "SLACK", "DISCORD"]),
        ("development", vec!["GITHUB", "GITLAB", "BITBUCKET"]),
        ("search", vec!["BRAVE_SEARCH", "GOOGLE", "DUCKDUCKGO"]),
        ("productivity", vec!["NOTION", "TODOIST", "CALENDAR"]),
        ("ai", vec!["OPENAI", "ANTHROPIC", "HUGGINGFACE"]),
    ];

    table
        .into_iter()
        .map(|(category, apps)| {
            (
                category.to_string(),
                apps.into_iter().map(String::from).collect(),
            )
        })
        .collect()
}
