//! Provider layer for the flowdeck engine.
//!
//! This crate owns everything that talks to a queue backend directly:
//!
//! - **[`QueueProvider`]** — the uniform contract every backend adapter
//!   implements: connect/disconnect lifecycle, queue and job lookups,
//!   and child discovery for flow reconstruction.
//!
//! - **[`BullMqProvider`]** — the concrete adapter for BullMQ state in
//!   Redis: job hashes, dependency sets, and per-state membership
//!   structures, probed over one shared multiplexed connection.
//!
//! - **Wire model** ([`JobHandle`], [`JobStatus`]) — the minimal job
//!   record the engine needs. Handles never cross the engine's outbound
//!   boundary; `flowdeck-core` converts them into flow trees.
//!
//! - **[`Error`]** — the provider-layer failure taxonomy (connection,
//!   timeout, lookup, backend, decoding) that `flowdeck-core` maps into
//!   user-facing diagnostics.

pub mod bullmq;
pub mod error;
pub mod job;
pub mod provider;

pub use bullmq::BullMqProvider;
pub use error::Error;
pub use job::{JobHandle, JobStatus};
pub use provider::{Capabilities, ProviderKind, QueueProvider, redacted_url};
