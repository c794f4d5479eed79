// ── Flow tree builder ──
//
// Turns a flat job-and-children graph into a `FlowTree`, counting
// aggregates in the same pass. The walk is an explicit work-stack DFS
// with a visited set and hard depth/node caps: the input graph comes
// from an external system and gets no benefit of the doubt about being
// acyclic or reasonably sized.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use flowdeck_api::{JobHandle, JobStatus, QueueProvider};

use crate::error::{CoreError, GraphFailure, PartialGraphError};
use crate::flow::model::{FlowNode, FlowTree};

/// Traversal bounds for one build.
///
/// Defaults (5 000 nodes, 64 levels) are far above anything a sane flow
/// produces; deployments with deeper pipelines raise them through the
/// `[flows]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowLimits {
    /// Maximum nodes resolved per build, root included.
    pub max_nodes: usize,
    /// Maximum levels beneath the root.
    pub max_depth: usize,
}

impl Default for FlowLimits {
    fn default() -> Self {
        Self {
            max_nodes: 5_000,
            max_depth: 64,
        }
    }
}

/// `(queue, id)` -- job ids are only unique within a queue.
type NodeKey = (String, String);

fn key_of(job: &JobHandle) -> NodeKey {
    (job.queue.clone(), job.id.clone())
}

/// Builds [`FlowTree`]s from a provider's job graph.
pub struct FlowTreeBuilder<'a> {
    provider: &'a dyn QueueProvider,
    limits: FlowLimits,
}

impl<'a> FlowTreeBuilder<'a> {
    pub fn new(provider: &'a dyn QueueProvider) -> Self {
        Self::with_limits(provider, FlowLimits::default())
    }

    pub fn with_limits(provider: &'a dyn QueueProvider, limits: FlowLimits) -> Self {
        Self { provider, limits }
    }

    /// Fetch the root job and build its flow tree.
    pub async fn build(&self, queue: &str, job_id: &str) -> Result<FlowTree, CoreError> {
        let root = self.provider.get_job(queue, job_id).await?;
        self.build_from(root).await
    }

    /// Build the flow tree rooted at an already-fetched job.
    pub async fn build_from(&self, root: JobHandle) -> Result<FlowTree, CoreError> {
        let root_key = key_of(&root);
        let flow_id = root.id.clone();
        let queue_name = root.queue.clone();

        let mut visited: HashSet<NodeKey> = HashSet::new();
        visited.insert(root_key.clone());

        let mut nodes: HashMap<NodeKey, JobHandle> = HashMap::new();
        let mut children_of: HashMap<NodeKey, Vec<NodeKey>> = HashMap::new();
        let mut tally = Tally::default();

        tally.count(root.status);
        nodes.insert(root_key.clone(), root.clone());

        let mut stack: Vec<(JobHandle, usize)> = vec![(root, 0)];

        while let Some((job, depth)) = stack.pop() {
            let job_key = key_of(&job);

            let kids = match self.provider.get_children(&job).await {
                Ok(kids) => kids,
                Err(e) => return Err(partial(nodes, &children_of, &root_key, e.into())),
            };
            if kids.is_empty() {
                continue;
            }
            if depth + 1 > self.limits.max_depth {
                return Err(partial(
                    nodes,
                    &children_of,
                    &root_key,
                    GraphFailure::DepthExceeded {
                        max: self.limits.max_depth,
                    },
                ));
            }

            let mut accepted: Vec<JobHandle> = Vec::new();
            let mut accepted_keys: Vec<NodeKey> = Vec::new();
            for child in kids {
                let child_key = key_of(&child);
                if !visited.insert(child_key.clone()) {
                    // The backend reported a child that is already part
                    // of this tree; truncate the edge instead of failing
                    // the whole build (or recursing forever).
                    debug!(
                        queue = %child.queue,
                        id = %child.id,
                        "duplicate child reference dropped"
                    );
                    continue;
                }
                if tally.total >= self.limits.max_nodes {
                    return Err(partial(
                        nodes,
                        &children_of,
                        &root_key,
                        GraphFailure::NodeBudgetExceeded {
                            max: self.limits.max_nodes,
                        },
                    ));
                }
                tally.count(child.status);
                nodes.insert(child_key.clone(), child.clone());
                accepted_keys.push(child_key);
                accepted.push(child);
            }

            if !accepted_keys.is_empty() {
                children_of.insert(job_key, accepted_keys);
            }
            // Reverse push keeps the DFS visiting siblings in provider
            // order; output order is fixed by `children_of` either way.
            for child in accepted.into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        let root_node = assemble(&root_key, &mut nodes, &children_of)
            .ok_or_else(|| CoreError::Internal("flow root vanished during assembly".into()))?;

        Ok(FlowTree {
            id: flow_id,
            queue_name,
            root: root_node,
            total_nodes: tally.total,
            completed_nodes: tally.completed,
            failed_nodes: tally.failed,
        })
    }
}

// ── Aggregation ──────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: usize,
    completed: usize,
    failed: usize,
}

impl Tally {
    /// Each node lands in exactly one bucket; everything non-terminal
    /// still counts toward the total.
    fn count(&mut self, status: JobStatus) {
        self.total += 1;
        match status {
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
            _ => {}
        }
    }
}

// ── Assembly ─────────────────────────────────────────────────────────

/// Consume the collected handles into a `FlowNode` tree. Recursion here
/// is bounded: the walk already enforced the depth cap and broke cycles.
fn assemble(
    key: &NodeKey,
    nodes: &mut HashMap<NodeKey, JobHandle>,
    children_of: &HashMap<NodeKey, Vec<NodeKey>>,
) -> Option<FlowNode> {
    let job = nodes.remove(key)?;
    let children = children_of
        .get(key)
        .map(|kids| {
            kids.iter()
                .filter_map(|k| assemble(k, nodes, children_of))
                .collect::<Vec<_>>()
        })
        .filter(|kids| !kids.is_empty());
    Some(FlowNode::from_handle(job, children))
}

/// Package everything resolved so far into a `PartialGraph` error.
fn partial(
    mut nodes: HashMap<NodeKey, JobHandle>,
    children_of: &HashMap<NodeKey, Vec<NodeKey>>,
    root_key: &NodeKey,
    cause: GraphFailure,
) -> CoreError {
    let resolved = nodes.len();
    let partial = assemble(root_key, &mut nodes, children_of);
    PartialGraphError {
        partial,
        resolved,
        cause,
    }
    .into()
}
