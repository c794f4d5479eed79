// ── Flow domain types ──
//
// The only shapes that cross the engine's outbound boundary. Trees are
// value objects: constructed fresh on every fetch, never mutated, owned
// by whoever requested them. Field names serialize camelCase -- the
// wire shape dashboard clients consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowdeck_api::{JobHandle, JobStatus};

/// One job in a reconstructed flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    pub name: String,
    pub queue_name: String,
    pub status: JobStatus,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_on: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_on: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    /// `None` marks a leaf. An empty vec never appears here -- the
    /// builder collapses "backend reported zero children" into absence,
    /// so "leaf" and "children not resolved" stay distinguishable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FlowNode>>,
}

impl FlowNode {
    pub(crate) fn from_handle(job: JobHandle, children: Option<Vec<FlowNode>>) -> Self {
        Self {
            id: job.id,
            name: job.name,
            queue_name: job.queue,
            status: job.status,
            data: job.data,
            timestamp: job.timestamp,
            processed_on: job.processed_on,
            finished_on: job.finished_on,
            failed_reason: job.failed_reason,
            children,
        }
    }

    /// `true` if any node in this subtree is in a state that warrants
    /// continued polling. Short-circuits on the first hit.
    pub fn has_live_nodes(&self) -> bool {
        if self.status.is_live() {
            return true;
        }
        self.children
            .as_deref()
            .is_some_and(|kids| kids.iter().any(FlowNode::has_live_nodes))
    }
}

/// A fully reconstructed flow: root job plus transitive dependents,
/// with roll-up counts consistent with a full traversal of `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTree {
    /// Root job id; doubles as the flow id.
    pub id: String,
    pub queue_name: String,
    pub root: FlowNode,
    pub total_nodes: usize,
    pub completed_nodes: usize,
    pub failed_nodes: usize,
}

impl FlowTree {
    /// Recompute the poll-again predicate from the tree. Deliberately
    /// not part of the serialized shape: it is a point-in-time answer,
    /// not a property of the snapshot.
    pub fn is_live(&self) -> bool {
        self.root.has_live_nodes()
    }

    /// Project the flat listing row for this flow.
    pub fn summary(&self) -> FlowSummary {
        FlowSummary {
            id: self.id.clone(),
            name: self.root.name.clone(),
            queue_name: self.queue_name.clone(),
            status: self.root.status,
            total_jobs: self.total_nodes,
            completed_jobs: self.completed_nodes,
            failed_jobs: self.failed_nodes,
            timestamp: self.root.timestamp,
        }
    }
}

/// Flat listing row for flow list views; derived from a [`FlowTree`] so
/// list clients never need the full tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub id: String,
    pub name: String,
    pub queue_name: String,
    pub status: JobStatus,
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: &str, status: JobStatus, children: Option<Vec<FlowNode>>) -> FlowNode {
        FlowNode {
            id: id.into(),
            name: format!("job-{id}"),
            queue_name: "render".into(),
            status,
            data: serde_json::Value::Null,
            timestamp: DateTime::<Utc>::default(),
            processed_on: None,
            finished_on: None,
            failed_reason: None,
            children,
        }
    }

    #[test]
    fn live_predicate_short_circuits_at_the_root() {
        let tree = node("1", JobStatus::WaitingChildren, None);
        assert!(tree.has_live_nodes());
    }

    #[test]
    fn live_predicate_finds_deep_live_nodes() {
        let deep = node("3", JobStatus::Active, None);
        let mid = node("2", JobStatus::Completed, Some(vec![deep]));
        let root = node("1", JobStatus::Completed, Some(vec![mid]));
        assert!(root.has_live_nodes());
    }

    #[test]
    fn terminal_only_trees_are_not_live() {
        let kids = vec![
            node("2", JobStatus::Completed, None),
            node("3", JobStatus::Failed, None),
        ];
        let root = node("1", JobStatus::Completed, Some(kids));
        assert!(!root.has_live_nodes());
    }

    #[test]
    fn summary_projects_root_fields_and_counts() {
        let kids = vec![
            node("2", JobStatus::Completed, None),
            node("3", JobStatus::Failed, None),
        ];
        let tree = FlowTree {
            id: "1".into(),
            queue_name: "render".into(),
            root: node("1", JobStatus::WaitingChildren, Some(kids)),
            total_nodes: 3,
            completed_nodes: 1,
            failed_nodes: 1,
        };

        let summary = tree.summary();
        assert_eq!(summary.id, "1");
        assert_eq!(summary.name, "job-1");
        assert_eq!(summary.status, JobStatus::WaitingChildren);
        assert_eq!(summary.total_jobs, 3);
        assert_eq!(summary.completed_jobs, 1);
        assert_eq!(summary.failed_jobs, 1);
        assert!(tree.is_live());
    }

    #[test]
    fn leaves_serialize_without_a_children_key() {
        let leaf = node("2", JobStatus::Completed, None);
        let json = serde_json::to_value(&leaf).unwrap();
        assert!(json.get("children").is_none());
        assert_eq!(json["queueName"], "render");
        assert_eq!(json["status"], "completed");
    }
}
