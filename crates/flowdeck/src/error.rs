//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use flowdeck_config::ConfigError;
use flowdeck_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the queue backend at {url}")]
    #[diagnostic(
        code(flowdeck::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             URL: {url}\n\
             Try: flowdeck status --url redis://localhost:6379"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Queue backend connection lost")]
    #[diagnostic(code(flowdeck::disconnected))]
    Disconnected,

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(flowdeck::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Connection configuration changed mid-request")]
    #[diagnostic(
        code(flowdeck::config_changed),
        help("Another caller retargeted the shared connection; re-run the command.")
    )]
    ConfigChanged,

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(flowdeck::not_found),
        help("Run: flowdeck {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Flow only partially reconstructed ({resolved} jobs resolved)")]
    #[diagnostic(
        code(flowdeck::partial_flow),
        help(
            "The traversal stopped early: {reason}\n\
             Re-run to retry; the flow may also still be settling."
        )
    )]
    PartialFlow { resolved: usize, reason: String },

    // ── Validation / configuration ───────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(flowdeck::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(flowdeck::config))]
    Config(Box<ConfigError>),

    // ── Backend ──────────────────────────────────────────────────────

    #[error("Backend error: {message}")]
    #[diagnostic(code(flowdeck::backend))]
    Backend { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(flowdeck::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Disconnected => CliError::Disconnected,

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::ConfigChanged => CliError::ConfigChanged,

            CoreError::JobNotFound { queue, job_id } => CliError::NotFound {
                resource_type: "flow".into(),
                identifier: format!("{queue}/{job_id}"),
                list_command: "flows list".into(),
            },

            CoreError::QueueNotFound { queue } => CliError::NotFound {
                resource_type: "queue".into(),
                identifier: queue,
                list_command: "queues list".into(),
            },

            CoreError::PartialGraph(partial) => CliError::PartialFlow {
                resolved: partial.resolved,
                reason: partial.cause.to_string(),
            },

            CoreError::Unsupported { operation } => CliError::Backend {
                message: format!("operation not supported: {operation}"),
            },

            CoreError::Backend { message } | CoreError::Internal(message) => {
                CliError::Backend { message }
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}
