// ── Job wire model ──
//
// `JobHandle` is the provider-internal record for one job: just enough
// to render it as a flow node and to discover its dependents. It never
// crosses the engine's outbound boundary -- `flowdeck-core` converts
// handles into `FlowNode`s.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job, as reported by the backend.
///
/// The kebab-case wire names match the backend's own vocabulary
/// (`waiting-children`, not `WaitingChildren`) so they round-trip
/// through JSON consumers unchanged.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum JobStatus {
    Waiting,
    Active,
    Delayed,
    WaitingChildren,
    Prioritized,
    Paused,
    Completed,
    Failed,
    /// The backend reported a state this build does not recognize.
    Unknown,
}

impl JobStatus {
    /// Terminal states: the job will not change again without outside
    /// intervention.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// States that warrant continued polling of the containing flow.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Active | Self::Waiting | Self::Delayed | Self::WaitingChildren
        )
    }
}

/// One job record fetched from the backend.
#[derive(Debug, Clone)]
pub struct JobHandle {
    /// Backend-assigned job id (stringly typed; BullMQ uses integers).
    pub id: String,
    /// Queue the job lives in.
    pub queue: String,
    /// Job name given at enqueue time.
    pub name: String,
    pub status: JobStatus,
    /// Opaque job payload.
    pub data: serde_json::Value,
    /// When the job was created.
    pub timestamp: DateTime<Utc>,
    /// When a worker picked the job up, if it has been.
    pub processed_on: Option<DateTime<Utc>>,
    /// When the job reached a terminal state, if it has.
    pub finished_on: Option<DateTime<Utc>>,
    /// Failure message for failed jobs.
    pub failed_reason: Option<String>,
    /// Full key of the parent job, when this job is part of a flow.
    /// `None` marks a flow root (or a plain standalone job).
    pub parent_key: Option<String>,
}

impl JobHandle {
    /// `true` when this job heads a flow (no parent above it).
    pub fn is_root(&self) -> bool {
        self.parent_key.is_none()
    }
}

/// Convert a backend millisecond epoch into a UTC timestamp.
///
/// Out-of-range values collapse to the epoch rather than failing the
/// whole fetch -- a clock-mangled timestamp should not hide a job.
pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
