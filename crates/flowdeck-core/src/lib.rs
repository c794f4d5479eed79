//! Connection lifecycle and flow-tree engine for flowdeck.
//!
//! This crate owns the control-plane logic between the provider layer
//! (`flowdeck-api`) and UI consumers:
//!
//! - **[`ConnectionManager`]** — owns at most one live provider
//!   process-wide. Deduplicates concurrent connect attempts into one
//!   shared in-flight handle, tears down and rebuilds the provider when
//!   the target configuration changes, and publishes
//!   [`ConnectionState`] transitions through a watch channel.
//!
//! - **[`FlowTreeBuilder`]** — reconstructs a hierarchical flow from
//!   the backend's flat job-and-children representation: explicit-stack
//!   DFS with cycle and size guards, per-subtree status roll-ups, and
//!   partial-result errors when a traversal cannot complete.
//!
//! - **[`FlowService`]** — the read-only query surface
//!   (`list_flows` / `get_flow`) a presentation layer consumes. Only
//!   [`FlowTree`] and [`FlowSummary`] cross that boundary.
//!
//! - **[`CoreError`]** — user-facing failure taxonomy; provider-layer
//!   errors are enriched and rethrown, never swallowed.

pub mod config;
pub mod connection;
pub mod error;
pub mod flow;

pub use config::ConnectionConfig;
pub use connection::{ConnectionManager, ConnectionState, ProviderFactory, SharedProvider};
pub use error::{CoreError, GraphFailure, PartialGraphError};
pub use flow::{FlowLimits, FlowNode, FlowService, FlowSummary, FlowTree, FlowTreeBuilder};

// Re-export the provider-layer vocabulary consumers need: the status
// enum shared with the flow model and the capability descriptor types.
pub use flowdeck_api::{Capabilities, JobStatus, ProviderKind, redacted_url};
