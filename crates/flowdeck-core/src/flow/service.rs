// ── Flow query service ──
//
// The read-only inbound interface a presentation layer consumes. Only
// `FlowTree`/`FlowSummary` cross this boundary; provider handles stay
// inside the engine. No mutation endpoints, no retries -- retry policy
// belongs to the caller.

use flowdeck_api::Capabilities;

use crate::config::ConnectionConfig;
use crate::connection::ConnectionManager;
use crate::error::CoreError;
use crate::flow::builder::{FlowLimits, FlowTreeBuilder};
use crate::flow::model::{FlowSummary, FlowTree};

/// How many flow roots `list_flows` considers per queue.
const DEFAULT_LIST_LIMIT: usize = 50;

/// Read-only flow queries over the managed connection.
pub struct FlowService {
    manager: ConnectionManager,
    config: ConnectionConfig,
    limits: FlowLimits,
    list_limit: usize,
}

impl FlowService {
    pub fn new(manager: ConnectionManager, config: ConnectionConfig) -> Self {
        Self {
            manager,
            config,
            limits: FlowLimits::default(),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }

    pub fn with_limits(mut self, limits: FlowLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_list_limit(mut self, list_limit: usize) -> Self {
        self.list_limit = list_limit;
        self
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// All flows across all queues, newest first.
    ///
    /// Each poll is a fresh snapshot; every tree is rebuilt from the
    /// backend, and any build failure surfaces unchanged.
    pub async fn list_flows(&self) -> Result<Vec<FlowSummary>, CoreError> {
        let provider = self.manager.provider(&self.config).await?;
        let builder = FlowTreeBuilder::with_limits(provider.as_ref(), self.limits);

        let queues = provider.list_queues().await?;
        let mut summaries = Vec::new();
        for queue in queues {
            let roots = provider.list_flow_roots(&queue, self.list_limit).await?;
            for root in roots {
                let tree = builder.build_from(root).await?;
                summaries.push(tree.summary());
            }
        }

        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(summaries)
    }

    /// One flow, fully reconstructed.
    pub async fn get_flow(&self, queue: &str, flow_id: &str) -> Result<FlowTree, CoreError> {
        let provider = self.manager.provider(&self.config).await?;
        FlowTreeBuilder::with_limits(provider.as_ref(), self.limits)
            .build(queue, flow_id)
            .await
    }

    /// Names of the queues known to the backend.
    pub async fn list_queues(&self) -> Result<Vec<String>, CoreError> {
        let provider = self.manager.provider(&self.config).await?;
        Ok(provider.list_queues().await?)
    }

    /// Capability descriptor of the connected backend (connects first
    /// if needed).
    pub async fn capabilities(&self) -> Result<Capabilities, CoreError> {
        let provider = self.manager.provider(&self.config).await?;
        Ok(provider.capabilities())
    }
}
