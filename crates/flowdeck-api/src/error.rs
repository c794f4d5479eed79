use thiserror::Error;

/// Top-level error type for the `flowdeck-api` crate.
///
/// Covers every failure mode of the provider layer: connection
/// establishment, backend queries, and payload decoding.
/// `flowdeck-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// Backend unreachable or it rejected the credentials.
    #[error("Cannot reach queue backend: {message}")]
    Connection { message: String },

    /// A backend call exceeded the configured deadline.
    #[error("Operation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Lookup ──────────────────────────────────────────────────────
    /// The referenced job does not exist in the given queue.
    #[error("Job '{job_id}' not found in queue '{queue}'")]
    JobNotFound { queue: String, job_id: String },

    /// The referenced queue is unknown to the backend.
    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    // ── Backend ─────────────────────────────────────────────────────
    /// Raw client error from an established connection.
    #[error("Backend error: {0}")]
    Backend(#[from] redis::RedisError),

    // ── Data ────────────────────────────────────────────────────────
    /// A job record held a payload the provider could not decode.
    #[error("Malformed job record: {message}")]
    Deserialization { message: String },

    // ── Capability ──────────────────────────────────────────────────
    /// Operation not supported by this provider kind.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound { .. } | Self::QueueNotFound { .. })
    }

    /// Returns `true` if the configured deadline was exceeded.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::Backend(e) => e.is_io_error() || e.is_connection_refusal() || e.is_timeout(),
            _ => false,
        }
    }
}
