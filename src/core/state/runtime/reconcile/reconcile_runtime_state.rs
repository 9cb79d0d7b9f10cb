use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePhase {
    #[default]
    Idle,
    Running,
}

/// Counters of one finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassCounts {
    pub pods: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Pods not attempted because the pass was cancelled.
    pub abandoned: usize,
}

/// Reconciliation bookkeeping for one controlling resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceReconcileState {
    pub key: String,
    pub phase: ReconcilePhase,
    pub target_namespace: Option<String>,
    pub observed_generation: Option<i64>,
    pub requeue_interval_ms: u64,
    pub next_due_at: Option<DateTime<Utc>>,

    pub last_pass_id: Option<Uuid>,
    pub last_pass_started_at: Option<DateTime<Utc>>,
    pub last_pass_finished_at: Option<DateTime<Utc>>,
    pub last_counts: PassCounts,

    /// Why the last tick did not run a pass, if it did not.
    pub last_skip_reason: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
}

/// In-memory reconciliation state of every controlling resource this
/// process drives. Created on start, dropped on shutdown, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileRuntimeState {
    pub resources: BTreeMap<String, ResourceReconcileState>,
}

impl ReconcileRuntimeState {
    fn entry(&mut self, key: &str) -> &mut ResourceReconcileState {
        self.resources
            .entry(key.to_string())
            .or_insert_with(|| ResourceReconcileState {
                key: key.to_string(),
                ..Default::default()
            })
    }

    pub fn get(&self, key: &str) -> Option<&ResourceReconcileState> {
        self.resources.get(key)
    }

    /// Idle → Running.
    pub fn start_pass(
        &mut self,
        key: &str,
        pass_id: Uuid,
        namespace: &str,
        generation: Option<i64>,
        now: DateTime<Utc>,
    ) {
        let entry = self.entry(key);
        entry.phase = ReconcilePhase::Running;
        entry.target_namespace = Some(namespace.to_string());
        entry.observed_generation = generation;
        entry.last_pass_id = Some(pass_id);
        entry.last_pass_started_at = Some(now);
        entry.last_skip_reason = None;
    }

    /// Running → Idle, next pass due at `now + interval`.
    pub fn finish_pass(
        &mut self,
        key: &str,
        counts: PassCounts,
        interval: std::time::Duration,
        now: DateTime<Utc>,
    ) {
        let entry = self.entry(key);
        entry.phase = ReconcilePhase::Idle;
        entry.last_pass_finished_at = Some(now);
        entry.last_counts = counts;
        entry.requeue_interval_ms = interval.as_millis() as u64;
        entry.next_due_at = chrono::Duration::from_std(interval).ok().map(|d| now + d);
        if counts.failed > 0 {
            entry.last_error_at = Some(now);
            entry.last_error_message =
                Some(format!("{} of {} pods failed", counts.failed, counts.pods));
        } else {
            entry.last_error_message = None;
        }
    }

    /// Record a tick whose pass did not run. Generation and due time are
    /// left as they were.
    pub fn skip_pass(&mut self, key: &str, reason: String, now: DateTime<Utc>) {
        let entry = self.entry(key);
        entry.phase = ReconcilePhase::Idle;
        entry.last_error_at = Some(now);
        entry.last_error_message = Some(reason.clone());
        entry.last_skip_reason = Some(reason);
    }

    pub fn forget(&mut self, key: &str) {
        self.resources.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pass_moves_through_running_back_to_idle() {
        let mut state = ReconcileRuntimeState::default();
        let now = Utc::now();
        let id = Uuid::new_v4();

        state.start_pass("ops/maid", id, "default", Some(2), now);
        assert_eq!(state.get("ops/maid").unwrap().phase, ReconcilePhase::Running);

        let counts = PassCounts { pods: 2, succeeded: 1, failed: 1, abandoned: 0 };
        state.finish_pass("ops/maid", counts, Duration::from_secs(10), now);
        let entry = state.get("ops/maid").unwrap();
        assert_eq!(entry.phase, ReconcilePhase::Idle);
        assert_eq!(entry.last_pass_id, Some(id));
        assert_eq!(entry.observed_generation, Some(2));
        assert_eq!(entry.next_due_at, Some(now + chrono::Duration::seconds(10)));
        assert_eq!(entry.last_counts.failed, 1);
        assert!(entry.last_error_at.is_some());
    }

    #[test]
    fn skipped_pass_keeps_generation_and_due_time() {
        let mut state = ReconcileRuntimeState::default();
        let now = Utc::now();
        state.start_pass("k", Uuid::new_v4(), "default", Some(1), now);
        state.finish_pass("k", PassCounts::default(), Duration::from_secs(10), now);
        let before = state.get("k").unwrap().clone();

        state.skip_pass("k", "ClusterMaid not found".into(), now);
        let after = state.get("k").unwrap();
        assert_eq!(after.observed_generation, before.observed_generation);
        assert_eq!(after.next_due_at, before.next_due_at);
        assert_eq!(after.last_skip_reason.as_deref(), Some("ClusterMaid not found"));
    }

    #[test]
    fn clean_pass_clears_the_previous_error() {
        let mut state = ReconcileRuntimeState::default();
        let now = Utc::now();
        state.skip_pass("k", "pods in namespace 'default': forbidden".into(), now);
        assert!(state.get("k").unwrap().last_error_message.is_some());

        state.start_pass("k", Uuid::new_v4(), "default", Some(1), now);
        let counts = PassCounts { pods: 2, succeeded: 1, failed: 1, abandoned: 0 };
        state.finish_pass("k", counts, Duration::from_secs(10), now);
        assert_eq!(
            state.get("k").unwrap().last_error_message.as_deref(),
            Some("1 of 2 pods failed")
        );

        state.start_pass("k", Uuid::new_v4(), "default", Some(1), now);
        let counts = PassCounts { pods: 2, succeeded: 2, failed: 0, abandoned: 0 };
        state.finish_pass("k", counts, Duration::from_secs(10), now);
        let entry = state.get("k").unwrap();
        assert_eq!(entry.last_error_message, None);
        assert_eq!(entry.last_error_at, Some(now));
    }
}
