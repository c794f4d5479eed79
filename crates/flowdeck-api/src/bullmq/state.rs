// ── Job state derivation ──
//
// BullMQ has no per-job state field; a job's state is defined by which
// queue-level structure holds its id. One pipelined probe per job
// gathers all memberships, and `classify` turns them into a status.

use crate::job::JobStatus;

/// Raw membership probe results for one job id.
///
/// Sorted-set probes carry the ZSCORE (present = member); list probes
/// carry the LPOS index.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StateProbes {
    pub completed: Option<f64>,
    pub failed: Option<f64>,
    pub delayed: Option<f64>,
    pub waiting_children: Option<f64>,
    pub prioritized: Option<f64>,
    pub active: Option<u64>,
    pub wait: Option<u64>,
    pub paused: Option<u64>,
}

/// Map probe results to a [`JobStatus`].
///
/// Terminal sets win over anything else: a finished job may linger in
/// other structures briefly while the backend cleans up after itself.
pub(crate) fn classify(probes: StateProbes) -> JobStatus {
    if probes.completed.is_some() {
        JobStatus::Completed
    } else if probes.failed.is_some() {
        JobStatus::Failed
    } else if probes.active.is_some() {
        JobStatus::Active
    } else if probes.waiting_children.is_some() {
        JobStatus::WaitingChildren
    } else if probes.delayed.is_some() {
        JobStatus::Delayed
    } else if probes.prioritized.is_some() {
        JobStatus::Prioritized
    } else if probes.wait.is_some() {
        JobStatus::Waiting
    } else if probes.paused.is_some() {
        JobStatus::Paused
    } else {
        JobStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_probes_are_unknown() {
        assert_eq!(classify(StateProbes::default()), JobStatus::Unknown);
    }

    #[test]
    fn terminal_sets_win() {
        let probes = StateProbes {
            completed: Some(1.0),
            active: Some(0),
            wait: Some(3),
            ..StateProbes::default()
        };
        assert_eq!(classify(probes), JobStatus::Completed);

        let probes = StateProbes {
            failed: Some(1.0),
            delayed: Some(2.0),
            ..StateProbes::default()
        };
        assert_eq!(classify(probes), JobStatus::Failed);
    }

    #[test]
    fn single_membership_maps_directly() {
        let cases = [
            (
                StateProbes {
                    waiting_children: Some(1.0),
                    ..StateProbes::default()
                },
                JobStatus::WaitingChildren,
            ),
            (
                StateProbes {
                    delayed: Some(1.0),
                    ..StateProbes::default()
                },
                JobStatus::Delayed,
            ),
            (
                StateProbes {
                    prioritized: Some(1.0),
                    ..StateProbes::default()
                },
                JobStatus::Prioritized,
            ),
            (
                StateProbes {
                    wait: Some(0),
                    ..StateProbes::default()
                },
                JobStatus::Waiting,
            ),
            (
                StateProbes {
                    paused: Some(0),
                    ..StateProbes::default()
                },
                JobStatus::Paused,
            ),
        ];
        for (probes, expected) in cases {
            assert_eq!(classify(probes), expected);
        }
    }
}
