// ── BullMQ key scheme ──
//
// All BullMQ state lives under "{prefix}:{queue}:...". Job records are
// hashes at "{prefix}:{queue}:{id}"; flow bookkeeping hangs off the job
// key ("...:dependencies" set, "...:processed" hash); per-state
// membership lives in queue-level sets and lists.

/// Default key prefix used by BullMQ unless a deployment overrides it.
pub(crate) const DEFAULT_PREFIX: &str = "bull";

#[derive(Debug, Clone)]
pub(crate) struct KeyScheme {
    prefix: String,
}

impl KeyScheme {
    pub(crate) fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Hash holding one job record.
    pub(crate) fn job(&self, queue: &str, id: &str) -> String {
        format!("{}:{queue}:{id}", self.prefix)
    }

    /// Queue-level state set/list (e.g. "completed", "active", "wait").
    pub(crate) fn state(&self, queue: &str, name: &str) -> String {
        format!("{}:{queue}:{name}", self.prefix)
    }

    /// Set of still-unprocessed child job keys.
    pub(crate) fn dependencies(&self, queue: &str, id: &str) -> String {
        format!("{}:dependencies", self.job(queue, id))
    }

    /// Hash of already-processed child job keys -> results.
    pub(crate) fn processed(&self, queue: &str, id: &str) -> String {
        format!("{}:processed", self.job(queue, id))
    }

    /// Scan pattern matching every queue's meta hash.
    pub(crate) fn meta_pattern(&self) -> String {
        format!("{}:*:meta", self.prefix)
    }

    /// Extract the queue name from a ":meta" key, if it is one.
    pub(crate) fn queue_of_meta(&self, key: &str) -> Option<String> {
        let rest = key.strip_prefix(&format!("{}:", self.prefix))?;
        let queue = rest.strip_suffix(":meta")?;
        if queue.is_empty() {
            return None;
        }
        Some(queue.to_owned())
    }

    /// Scan patterns whose matches identify jobs with dependents.
    pub(crate) fn flow_marker_patterns(&self, queue: &str) -> [String; 2] {
        [
            format!("{}:{queue}:*:dependencies", self.prefix),
            format!("{}:{queue}:*:processed", self.prefix),
        ]
    }

    /// Extract the job id from a flow-marker key matched by
    /// [`flow_marker_patterns`](Self::flow_marker_patterns).
    pub(crate) fn job_id_of_marker(&self, queue: &str, key: &str) -> Option<String> {
        let rest = key.strip_prefix(&format!("{}:{queue}:", self.prefix))?;
        let id = rest
            .strip_suffix(":dependencies")
            .or_else(|| rest.strip_suffix(":processed"))?;
        if id.is_empty() || id.contains(':') {
            return None;
        }
        Some(id.to_owned())
    }

    /// Split a full job key into `(queue, id)`.
    ///
    /// Queue names may themselves contain colons; the id is always the
    /// final segment.
    pub(crate) fn parse_job_key(&self, key: &str) -> Option<(String, String)> {
        let rest = key.strip_prefix(&format!("{}:", self.prefix))?;
        let (queue, id) = rest.rsplit_once(':')?;
        if queue.is_empty() || id.is_empty() {
            return None;
        }
        Some((queue.to_owned(), id.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scheme() -> KeyScheme {
        KeyScheme::new(DEFAULT_PREFIX)
    }

    #[test]
    fn job_and_state_keys() {
        let keys = scheme();
        assert_eq!(keys.job("mail", "42"), "bull:mail:42");
        assert_eq!(keys.state("mail", "completed"), "bull:mail:completed");
        assert_eq!(keys.dependencies("mail", "42"), "bull:mail:42:dependencies");
        assert_eq!(keys.processed("mail", "42"), "bull:mail:42:processed");
    }

    #[test]
    fn meta_key_roundtrip() {
        let keys = scheme();
        assert_eq!(keys.queue_of_meta("bull:mail:meta").as_deref(), Some("mail"));
        assert_eq!(
            keys.queue_of_meta("bull:mail:priority:meta").as_deref(),
            Some("mail:priority")
        );
        assert_eq!(keys.queue_of_meta("bull:mail:42"), None);
        assert_eq!(keys.queue_of_meta("other:mail:meta"), None);
    }

    #[test]
    fn parse_job_key_takes_last_segment_as_id() {
        let keys = scheme();
        assert_eq!(
            keys.parse_job_key("bull:mail:42"),
            Some(("mail".into(), "42".into()))
        );
        // queue names may contain colons
        assert_eq!(
            keys.parse_job_key("bull:mail:eu:7"),
            Some(("mail:eu".into(), "7".into()))
        );
        assert_eq!(keys.parse_job_key("bull:mail:"), None);
        assert_eq!(keys.parse_job_key("nope:mail:42"), None);
    }

    #[test]
    fn marker_keys_yield_job_ids() {
        let keys = scheme();
        assert_eq!(
            keys.job_id_of_marker("mail", "bull:mail:42:dependencies")
                .as_deref(),
            Some("42")
        );
        assert_eq!(
            keys.job_id_of_marker("mail", "bull:mail:42:processed")
                .as_deref(),
            Some("42")
        );
        assert_eq!(keys.job_id_of_marker("mail", "bull:mail:42"), None);
        assert_eq!(keys.job_id_of_marker("mail", "bull:other:42:processed"), None);
    }
}
