// Scripted in-memory provider shared by the engine integration tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use flowdeck_api::{Capabilities, Error, JobHandle, JobStatus, ProviderKind, QueueProvider};
use flowdeck_core::{ConnectionConfig, ConnectionManager, SharedProvider};

pub type Key = (String, String);

/// Build a job handle whose timestamp follows its (numeric) id, so
/// newest-first orderings are easy to assert.
pub fn job(queue: &str, id: &str, status: JobStatus) -> JobHandle {
    let seq: i64 = id.parse().unwrap_or(0);
    JobHandle {
        id: id.into(),
        queue: queue.into(),
        name: format!("job-{id}"),
        status,
        data: serde_json::Value::Null,
        timestamp: Utc
            .timestamp_millis_opt(1_700_000_000_000 + seq * 1_000)
            .single()
            .unwrap(),
        processed_on: None,
        finished_on: None,
        failed_reason: (status == JobStatus::Failed).then(|| "timeout".to_owned()),
        parent_key: None,
    }
}

/// In-memory `QueueProvider` with a static job graph and scriptable
/// failure behavior. Counters expose how often the lifecycle methods
/// ran so tests can assert the manager's guarantees.
#[derive(Debug)]
pub struct MockProvider {
    jobs: HashMap<Key, JobHandle>,
    children: HashMap<Key, Vec<Key>>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    connect_delay: Duration,
    failing_connects: AtomicUsize,
    fail_children_of: Option<Key>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            children: HashMap::new(),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            connect_delay: Duration::ZERO,
            failing_connects: AtomicUsize::new(0),
            fail_children_of: None,
        }
    }

    pub fn with_job(mut self, job: JobHandle) -> Self {
        self.jobs.insert((job.queue.clone(), job.id.clone()), job);
        self
    }

    /// Register `child` as a dependent of `parent`. Both jobs must have
    /// been added already; sibling order follows registration order.
    pub fn with_edge(mut self, parent: (&str, &str), child: (&str, &str)) -> Self {
        let parent_key: Key = (parent.0.into(), parent.1.into());
        let child_key: Key = (child.0.into(), child.1.into());
        if let Some(job) = self.jobs.get_mut(&child_key) {
            job.parent_key = Some(format!("bull:{}:{}", parent.0, parent.1));
        }
        self.children.entry(parent_key).or_default().push(child_key);
        self
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Make the next `n` connect calls fail.
    pub fn failing_connects(self, n: usize) -> Self {
        self.failing_connects.store(n, Ordering::SeqCst);
        self
    }

    pub fn fail_children_of(mut self, queue: &str, id: &str) -> Self {
        self.fail_children_of = Some((queue.into(), id.into()));
        self
    }

    pub fn connects(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueProvider for MockProvider {
    async fn connect(&self) -> Result<(), Error> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        let remaining = self.failing_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Connection {
                message: "mock backend refused the connection".into(),
            });
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            display_name: "BullMQ",
            kind: ProviderKind::BullMq,
        }
    }

    async fn list_queues(&self) -> Result<Vec<String>, Error> {
        let mut queues: Vec<String> = self.jobs.keys().map(|(q, _)| q.clone()).collect();
        queues.sort();
        queues.dedup();
        Ok(queues)
    }

    async fn get_job(&self, queue: &str, job_id: &str) -> Result<JobHandle, Error> {
        self.jobs
            .get(&(queue.to_owned(), job_id.to_owned()))
            .cloned()
            .ok_or_else(|| Error::JobNotFound {
                queue: queue.to_owned(),
                job_id: job_id.to_owned(),
            })
    }

    async fn get_children(&self, job: &JobHandle) -> Result<Vec<JobHandle>, Error> {
        let key: Key = (job.queue.clone(), job.id.clone());
        if self.fail_children_of.as_ref() == Some(&key) {
            return Err(Error::Connection {
                message: "mock child lookup failure".into(),
            });
        }
        Ok(self
            .children
            .get(&key)
            .map(|kids| {
                kids.iter()
                    .filter_map(|k| self.jobs.get(k).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_flow_roots(&self, queue: &str, limit: usize) -> Result<Vec<JobHandle>, Error> {
        let mut roots: Vec<JobHandle> = self
            .jobs
            .values()
            .filter(|job| {
                job.queue == queue
                    && job.parent_key.is_none()
                    && self
                        .children
                        .contains_key(&(job.queue.clone(), job.id.clone()))
            })
            .cloned()
            .collect();
        roots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        roots.truncate(limit);
        Ok(roots)
    }
}

/// A manager whose factory hands out the given providers in order.
/// Panics if the manager asks for more providers than were scripted.
pub fn scripted_manager(providers: Vec<Arc<MockProvider>>) -> ConnectionManager {
    let remaining = std::sync::Mutex::new(providers.into_iter());
    ConnectionManager::with_factory(Arc::new(move |_config: &ConnectionConfig| {
        let provider: SharedProvider = remaining
            .lock()
            .unwrap()
            .next()
            .expect("factory asked for more providers than scripted");
        provider
    }))
}

pub fn config(url: &str) -> ConnectionConfig {
    ConnectionConfig::new(url.parse().unwrap())
}
