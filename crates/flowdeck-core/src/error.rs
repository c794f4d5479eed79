// ── Core error types ──
//
// User-facing errors from flowdeck-core. These are NOT backend-specific --
// consumers never see raw Redis errors directly. The
// `From<flowdeck_api::Error>` impl translates provider-layer errors into
// domain-appropriate variants.

use thiserror::Error;

use crate::flow::FlowNode;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to queue backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Queue backend disconnected")]
    Disconnected,

    #[error("Operation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// An in-flight connect was superseded by a newer configuration.
    /// Safe to drop or retry with the current configuration.
    #[error("Connect attempt superseded by a configuration change")]
    ConfigChanged,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Job not found: {job_id} in queue '{queue}'")]
    JobNotFound { queue: String, job_id: String },

    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    /// A flow-tree build failed partway through traversal. Carries the
    /// partially built subtree so callers may render or discard it.
    #[error(transparent)]
    PartialGraph(Box<PartialGraphError>),

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if a plain retry with the same inputs may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
                | Self::ConfigChanged
                | Self::Disconnected
        )
    }
}

/// Traversal failure with the partial result attached.
///
/// `partial` is the subtree assembled from every node resolved before
/// the failure (no node appears twice); `None` only when the root
/// itself never resolved.
#[derive(Debug, Error)]
#[error("Flow graph incomplete after {resolved} resolved nodes: {cause}")]
pub struct PartialGraphError {
    pub partial: Option<FlowNode>,
    pub resolved: usize,
    pub cause: GraphFailure,
}

/// Why a flow-tree build stopped early.
#[derive(Debug, Error)]
pub enum GraphFailure {
    #[error("backend call failed mid-traversal: {0}")]
    Backend(#[from] flowdeck_api::Error),

    #[error("flow exceeds the configured depth limit ({max})")]
    DepthExceeded { max: usize },

    #[error("flow exceeds the configured node budget ({max})")]
    NodeBudgetExceeded { max: usize },
}

// ── Conversion from provider-layer errors ────────────────────────────

impl From<flowdeck_api::Error> for CoreError {
    fn from(err: flowdeck_api::Error) -> Self {
        match err {
            flowdeck_api::Error::Connection { message } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: message,
            },
            flowdeck_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            flowdeck_api::Error::JobNotFound { queue, job_id } => {
                CoreError::JobNotFound { queue, job_id }
            }
            flowdeck_api::Error::QueueNotFound { queue } => CoreError::QueueNotFound { queue },
            flowdeck_api::Error::Backend(e) => CoreError::Backend {
                message: e.to_string(),
            },
            flowdeck_api::Error::Deserialization { message } => CoreError::Internal(message),
            flowdeck_api::Error::Unsupported(op) => CoreError::Unsupported {
                operation: op.to_owned(),
            },
        }
    }
}

impl From<PartialGraphError> for CoreError {
    fn from(err: PartialGraphError) -> Self {
        CoreError::PartialGraph(Box::new(err))
    }
}
