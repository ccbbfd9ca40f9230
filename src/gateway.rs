//! Tool gateway façade: discovery, execution, and batch dispatch.
//!
//! Composes the discovery cache and the upstream transport behind the
//! public gateway operations. Discovery (`search`, `list_tools`) is advisory and
//! degrades to empty on failure; execution (`execute`, `direct_call`,
//! `batch_execute`) always reports a structured [`ExecutionResult`] and
//! never propagates an error past this boundary.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{Value, json};

use crate::cache::{CacheKey, DiscoveryCache};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::transport::ToolTransport;
use crate::types::{
    EXECUTE_FUNCTION, ExecutionRequest, ExecutionResult, FunctionDescriptor, NAME_SEPARATOR,
    SEARCH_FUNCTIONS,
};

/// Façade over the two upstream tool servers.
///
/// Plain constructed value: the composition root owns the transport and the
/// gateway's lifetime. There is no process-wide instance.
pub struct ToolGateway<T: ToolTransport> {
    transport: Arc<T>,
    cache: DiscoveryCache,
    apps_url: String,
    unified_url: String,
    enabled_apps: HashSet<String>,
    default_timeout: Duration,
    search_timeout: Duration,
    catalog_timeout: Duration,
}

impl<T: ToolTransport> ToolGateway<T> {
    /// Create a gateway over the given transport and configuration.
    pub fn new(transport: Arc<T>, config: &Config) -> Self {
        Self {
            transport,
            cache: DiscoveryCache::new(
                config.cache.enabled,
                Duration::from_secs(config.cache.ttl_secs),
            ),
            apps_url: config.servers.apps_url.clone(),
            unified_url: config.servers.unified_url.clone(),
            enabled_apps: config.enabled_apps.iter().cloned().collect(),
            default_timeout: Duration::from_secs(config.execution.default_timeout_secs),
            search_timeout: Duration::from_secs(config.execution.search_timeout_secs),
            catalog_timeout: Duration::from_secs(config.execution.catalog_timeout_secs),
        }
    }

    /// Search functions by intent. Advisory: any failure degrades to an
    /// empty result. Use [`try_search`](Self::try_search) to distinguish
    /// "no matches" from "upstream unreachable".
    pub async fn search(
        &self,
        intent: &str,
        limit: u32,
        use_cache: bool,
    ) -> Vec<FunctionDescriptor> {
        match self.try_search(intent, limit, use_cache).await {
            Ok(functions) => functions,
            Err(e) => {
                log::error!("Function search for '{}' degraded to empty: {}", intent, e);
                Vec::new()
            }
        }
    }

    /// Search functions by intent, surfacing failures.
    pub async fn try_search(
        &self,
        intent: &str,
        limit: u32,
        use_cache: bool,
    ) -> Result<Vec<FunctionDescriptor>> {
        let key = CacheKey::search(intent, limit);

        if use_cache && self.cache.is_valid(&key) {
            if let Some(hit) = self.cache.get(&key) {
                log::debug!("Using cached results for: {}", intent);
                return Ok(hit);
            }
        }

        let arguments = json!({ "intent": intent, "limit": limit });
        let payload = self
            .transport
            .call_tool(&self.unified_url, SEARCH_FUNCTIONS, arguments, self.search_timeout)
            .await?;

        let functions: Vec<FunctionDescriptor> = serde_json::from_value(payload)?;

        // A successful live call always refreshes the cache, even when the
        // read side skipped it.
        self.cache.put(key, functions.clone());

        Ok(functions)
    }

    /// Execute a function through the unified server. Never cached.
    pub async fn execute(
        &self,
        function_name: &str,
        arguments: Value,
        timeout_secs: Option<u64>,
    ) -> ExecutionResult {
        let timeout = timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let body = json!({
            "function_name": function_name,
            "function_arguments": arguments,
        });

        match self
            .transport
            .call_tool(&self.unified_url, EXECUTE_FUNCTION, body, timeout)
            .await
        {
            Ok(payload) => {
                log::info!("Executed {}", function_name);
                ExecutionResult::success(payload)
            }
            Err(e) => {
                log::error!("Execution of {} failed: {}", function_name, e);
                e.into()
            }
        }
    }

    /// Call an operation directly on the apps server.
    ///
    /// Gated on the enabled-apps allowlist before any network activity.
    pub async fn direct_call(
        &self,
        app: &str,
        operation: &str,
        arguments: Value,
    ) -> ExecutionResult {
        if !self.enabled_apps.contains(app) {
            log::warn!("App {} not in enabled apps", app);
            return GatewayError::NotEnabled(app.to_string()).into();
        }

        let full_name = format!("{}{}{}", app, NAME_SEPARATOR, operation);

        match self
            .transport
            .call_tool(&self.apps_url, &full_name, arguments, self.default_timeout)
            .await
        {
            Ok(payload) => ExecutionResult::success(payload),
            Err(e) => {
                log::error!("Direct call to {} failed: {}", full_name, e);
                e.into()
            }
        }
    }

    /// List the apps server's catalog. Advisory; degrades to empty.
    ///
    /// The filter keeps descriptors whose name starts with `APP__` and is
    /// applied client-side, not passed upstream.
    pub async fn list_tools(&self, app_filter: Option<&str>) -> Vec<FunctionDescriptor> {
        match self.try_list_tools(app_filter).await {
            Ok(tools) => tools,
            Err(e) => {
                log::error!("Tool listing degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    /// List the apps server's catalog, surfacing failures.
    pub async fn try_list_tools(
        &self,
        app_filter: Option<&str>,
    ) -> Result<Vec<FunctionDescriptor>> {
        let mut tools = self
            .transport
            .fetch_catalog(&self.apps_url, self.catalog_timeout)
            .await?;

        if let Some(app) = app_filter {
            let prefix = format!("{}{}", app, NAME_SEPARATOR);
            tools.retain(|t| t.name.starts_with(&prefix));
        }

        Ok(tools)
    }

    /// Look up one descriptor by exact name.
    ///
    /// Linear scan over the catalog; catalogs are hundreds of entries and
    /// this is not a hot path.
    pub async fn get_tool_definition(&self, name: &str) -> Option<FunctionDescriptor> {
        self.list_tools(None)
            .await
            .into_iter()
            .find(|t| t.name == name)
    }

    /// Execute a batch of requests.
    ///
    /// Results are positionally aligned with `requests` in both modes.
    /// `parallel` fans all calls out at once and awaits the full set; one
    /// slot's failure never cancels the others. Sequential mode dispatches
    /// strictly one at a time in input order.
    pub async fn batch_execute(
        &self,
        requests: &[ExecutionRequest],
        parallel: bool,
    ) -> Vec<ExecutionResult> {
        if parallel {
            join_all(requests.iter().map(|request| {
                self.execute(
                    &request.function_name,
                    request.arguments.clone(),
                    request.timeout_secs,
                )
            }))
            .await
        } else {
            let mut results = Vec::with_capacity(requests.len());
            for request in requests {
                results.push(
                    self.execute(
                        &request.function_name,
                        request.arguments.clone(),
                        request.timeout_secs,
                    )
                    .await,
                );
            }
            results
        }
    }

    /// Empty the discovery cache. Idempotent.
    pub fn clear_cache(&self) {
        self.cache.clear();
        log::info!("Discovery cache cleared");
    }
}
