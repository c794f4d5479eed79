// ── BullMQ provider ──
//
// Concrete `QueueProvider` speaking the BullMQ key scheme over Redis.
// One multiplexed connection is shared by all callers; it is safe for
// concurrent outstanding queries, so the provider holds no per-request
// locks beyond the connection slot itself.

mod keys;
mod state;

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use async_trait::async_trait;

use crate::error::Error;
use crate::job::{JobHandle, JobStatus, millis_to_datetime};
use crate::provider::{Capabilities, ProviderKind, QueueProvider, redacted_url};

use keys::{DEFAULT_PREFIX, KeyScheme};
use state::StateProbes;

/// `QueueProvider` implementation for BullMQ-managed Redis state.
#[derive(Debug)]
pub struct BullMqProvider {
    url: Url,
    keys: KeyScheme,
    timeout: Duration,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl BullMqProvider {
    /// Build a provider against the given Redis URL with the stock
    /// "bull" key prefix. Does NOT connect -- call
    /// [`connect()`](QueueProvider::connect) first.
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self::with_prefix(url, timeout, DEFAULT_PREFIX)
    }

    /// Build a provider with a deployment-specific key prefix.
    pub fn with_prefix(url: Url, timeout: Duration, prefix: &str) -> Self {
        Self {
            url,
            keys: KeyScheme::new(prefix),
            timeout,
            conn: Mutex::new(None),
        }
    }

    // ── Connection plumbing ──────────────────────────────────────────

    /// Clone the live connection handle, or fail if disconnected.
    async fn connection(&self) -> Result<MultiplexedConnection, Error> {
        self.conn
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::Connection {
                message: "provider is not connected".into(),
            })
    }

    /// Run one backend call under the configured deadline.
    async fn bounded<T>(
        &self,
        op: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, Error> {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    // ── Backend queries ──────────────────────────────────────────────

    /// Fetch one job record, or `None` when the hash does not exist.
    async fn fetch_job(
        &self,
        conn: &mut MultiplexedConnection,
        queue: &str,
        id: &str,
    ) -> Result<Option<JobHandle>, Error> {
        let fields: HashMap<String, String> =
            self.bounded(conn.hgetall(self.keys.job(queue, id))).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let mut job = parse_record(queue, id, &fields)?;
        job.status = self.probe_state(conn, queue, id).await?;
        Ok(Some(job))
    }

    /// One pipelined round trip gathering every state membership for a
    /// job id; see [`state::classify`] for the precedence rules.
    async fn probe_state(
        &self,
        conn: &mut MultiplexedConnection,
        queue: &str,
        id: &str,
    ) -> Result<JobStatus, Error> {
        type Probes = (
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<u64>,
            Option<u64>,
            Option<u64>,
        );

        let mut pipe = redis::pipe();
        for set in ["completed", "failed", "delayed", "waiting-children", "prioritized"] {
            pipe.cmd("ZSCORE").arg(self.keys.state(queue, set)).arg(id);
        }
        for list in ["active", "wait", "paused"] {
            pipe.cmd("LPOS").arg(self.keys.state(queue, list)).arg(id);
        }

        let (completed, failed, delayed, waiting_children, prioritized, active, wait, paused): Probes =
            self.bounded(pipe.query_async(conn)).await?;

        Ok(state::classify(StateProbes {
            completed,
            failed,
            delayed,
            waiting_children,
            prioritized,
            active,
            wait,
            paused,
        }))
    }

    /// Collect every key matching `pattern` via incremental SCAN.
    async fn scan_keys(
        &self,
        conn: &mut MultiplexedConnection,
        pattern: &str,
    ) -> Result<Vec<String>, Error> {
        let scan = async {
            let mut keys = Vec::new();
            let mut iter = conn.scan_match::<_, String>(pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            Ok::<_, redis::RedisError>(keys)
        };
        self.bounded(scan).await
    }
}

#[async_trait]
impl QueueProvider for BullMqProvider {
    async fn connect(&self) -> Result<(), Error> {
        let mut guard = self.conn.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let client = redis::Client::open(self.url.as_str()).map_err(|e| Error::Connection {
            message: e.to_string(),
        })?;

        let mut conn =
            match tokio::time::timeout(self.timeout, client.get_multiplexed_async_connection())
                .await
            {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    return Err(Error::Connection {
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    return Err(Error::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    });
                }
            };

        // Verify the backend actually answers before exposing the handle.
        let pong: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(|e| match e {
                Error::Timeout { timeout_secs } => Error::Timeout { timeout_secs },
                other => Error::Connection {
                    message: other.to_string(),
                },
            })?;
        debug!(url = %redacted_url(&self.url), %pong, "connected to Redis backend");

        *guard = Some(conn);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        // Dropping the last clone of the multiplexed handle closes the
        // socket; callers mid-query finish on their own clones.
        if self.conn.lock().await.take().is_some() {
            debug!(url = %redacted_url(&self.url), "disconnected from Redis backend");
        }
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            display_name: "BullMQ",
            kind: ProviderKind::BullMq,
        }
    }

    async fn list_queues(&self) -> Result<Vec<String>, Error> {
        let mut conn = self.connection().await?;
        let keys = self.scan_keys(&mut conn, &self.keys.meta_pattern()).await?;

        let mut queues: Vec<String> = keys
            .iter()
            .filter_map(|key| self.keys.queue_of_meta(key))
            .collect();
        queues.sort();
        queues.dedup();
        Ok(queues)
    }

    async fn get_job(&self, queue: &str, job_id: &str) -> Result<JobHandle, Error> {
        let mut conn = self.connection().await?;
        self.fetch_job(&mut conn, queue, job_id)
            .await?
            .ok_or_else(|| Error::JobNotFound {
                queue: queue.to_owned(),
                job_id: job_id.to_owned(),
            })
    }

    async fn get_children(&self, job: &JobHandle) -> Result<Vec<JobHandle>, Error> {
        let mut conn = self.connection().await?;

        let pending: Vec<String> = self
            .bounded(conn.smembers(self.keys.dependencies(&job.queue, &job.id)))
            .await?;
        let processed: Vec<String> = self
            .bounded(conn.hkeys(self.keys.processed(&job.queue, &job.id)))
            .await?;

        let child_keys: BTreeSet<String> = pending.into_iter().chain(processed).collect();

        let mut children = Vec::with_capacity(child_keys.len());
        for key in child_keys {
            let Some((queue, id)) = self.keys.parse_job_key(&key) else {
                debug!(%key, "skipping unparseable child key");
                continue;
            };
            match self.fetch_job(&mut conn, &queue, &id).await? {
                Some(child) => children.push(child),
                None => debug!(%key, "child job record no longer exists"),
            }
        }

        sort_creation_order(&mut children);
        Ok(children)
    }

    async fn list_flow_roots(&self, queue: &str, limit: usize) -> Result<Vec<JobHandle>, Error> {
        let mut conn = self.connection().await?;

        let meta_exists: bool = self
            .bounded(conn.exists(self.keys.state(queue, "meta")))
            .await?;
        if !meta_exists {
            return Err(Error::QueueNotFound {
                queue: queue.to_owned(),
            });
        }

        let mut ids = BTreeSet::new();
        for pattern in self.keys.flow_marker_patterns(queue) {
            for key in self.scan_keys(&mut conn, &pattern).await? {
                if let Some(id) = self.keys.job_id_of_marker(queue, &key) {
                    ids.insert(id);
                }
            }
        }

        let mut roots = Vec::new();
        for id in ids {
            if let Some(job) = self.fetch_job(&mut conn, queue, &id).await? {
                if job.is_root() {
                    roots.push(job);
                }
            }
        }

        roots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        roots.truncate(limit);
        Ok(roots)
    }
}

// ── Record parsing ───────────────────────────────────────────────────

/// Decode a raw job hash into a [`JobHandle`] (status left `Unknown`;
/// the caller derives it from state probes).
fn parse_record(
    queue: &str,
    id: &str,
    fields: &HashMap<String, String>,
) -> Result<JobHandle, Error> {
    let data = match fields.get("data").map(String::as_str) {
        None | Some("") => serde_json::Value::Null,
        Some(raw) => serde_json::from_str(raw).map_err(|e| Error::Deserialization {
            message: format!("job {queue}:{id} payload is not valid JSON: {e}"),
        })?,
    };

    Ok(JobHandle {
        id: id.to_owned(),
        queue: queue.to_owned(),
        name: fields.get("name").cloned().unwrap_or_default(),
        status: JobStatus::Unknown,
        data,
        timestamp: millis_to_datetime(parse_millis(fields, "timestamp").unwrap_or(0)),
        processed_on: parse_millis(fields, "processedOn").map(millis_to_datetime),
        finished_on: parse_millis(fields, "finishedOn").map(millis_to_datetime),
        failed_reason: fields.get("failedReason").filter(|r| !r.is_empty()).cloned(),
        parent_key: fields.get("parentKey").filter(|k| !k.is_empty()).cloned(),
    })
}

fn parse_millis(fields: &HashMap<String, String>, name: &str) -> Option<i64> {
    fields.get(name).and_then(|raw| raw.parse().ok())
}

/// Order siblings by creation: numeric ids ascending (BullMQ assigns
/// them monotonically), custom string ids after, lexicographically.
fn sort_creation_order(jobs: &mut [JobHandle]) {
    jobs.sort_by(|a, b| match (a.id.parse::<u64>(), b.id.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.id.cmp(&b.id),
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn parse_record_full_fields() {
        let fields = record(&[
            ("name", "render-frame"),
            ("data", r#"{"frame":12}"#),
            ("timestamp", "1700000000000"),
            ("processedOn", "1700000001000"),
            ("finishedOn", "1700000002000"),
            ("failedReason", "timeout"),
            ("parentKey", "bull:render:1"),
        ]);

        let job = parse_record("render", "7", &fields).unwrap();
        assert_eq!(job.id, "7");
        assert_eq!(job.queue, "render");
        assert_eq!(job.name, "render-frame");
        assert_eq!(job.data, serde_json::json!({"frame": 12}));
        assert_eq!(job.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(
            job.processed_on.unwrap().timestamp_millis(),
            1_700_000_001_000
        );
        assert_eq!(
            job.finished_on.unwrap().timestamp_millis(),
            1_700_000_002_000
        );
        assert_eq!(job.failed_reason.as_deref(), Some("timeout"));
        assert_eq!(job.parent_key.as_deref(), Some("bull:render:1"));
        assert!(!job.is_root());
    }

    #[test]
    fn parse_record_minimal_fields() {
        let fields = record(&[("name", "root"), ("timestamp", "1700000000000")]);

        let job = parse_record("render", "1", &fields).unwrap();
        assert_eq!(job.data, serde_json::Value::Null);
        assert_eq!(job.processed_on, None);
        assert_eq!(job.finished_on, None);
        assert_eq!(job.failed_reason, None);
        assert!(job.is_root());
    }

    #[test]
    fn parse_record_rejects_broken_payload() {
        let fields = record(&[("data", "{not json")]);
        let err = parse_record("render", "1", &fields).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }), "{err:?}");
    }

    #[test]
    fn creation_order_sorts_numeric_before_custom_ids() {
        let mut jobs: Vec<JobHandle> = ["10", "2", "alpha", "1", "beta"]
            .iter()
            .map(|id| {
                parse_record("q", id, &record(&[("timestamp", "0")])).unwrap()
            })
            .collect();
        sort_creation_order(&mut jobs);

        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10", "alpha", "beta"]);
    }
}
