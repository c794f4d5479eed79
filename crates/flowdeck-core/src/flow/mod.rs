//! Flow reconstruction: domain model, tree builder, and the read-only
//! query service.

pub mod builder;
pub mod model;
pub mod service;

pub use builder::{FlowLimits, FlowTreeBuilder};
pub use model::{FlowNode, FlowSummary, FlowTree};
pub use service::FlowService;
