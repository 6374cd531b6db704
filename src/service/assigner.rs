//! Reviewer selection for unassigned requests.
//!
//! A pure read-compute-write invoked synchronously inside `assign`: no
//! scheduler process, no stored assignment state. Balance emerges because
//! every assignment increments the chosen reviewer's active count, pushing
//! the next pick elsewhere.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{ActorId, ActorRole, ReviewerWorkload};
use crate::infra::{IdentityDirectory, RequestStore, Result, VerificationError};

/// Days of terminal-request history considered for the turnaround tiebreak.
pub const TURNAROUND_WINDOW_DAYS: i64 = 30;

/// Chooses the reviewer who should receive the next assignment.
pub struct WorkloadAssigner {
    store: Arc<dyn RequestStore>,
    directory: Arc<dyn IdentityDirectory>,
    window: Duration,
}

impl WorkloadAssigner {
    pub fn new(store: Arc<dyn RequestStore>, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self {
            store,
            directory,
            window: Duration::days(TURNAROUND_WINDOW_DAYS),
        }
    }

    /// Override the turnaround window (tests shrink it).
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Pick the eligible reviewer with the fewest active (pending or
    /// in-review) assignments; ties go to the lowest trailing-window average
    /// turnaround, with no history counting as zero, then to the lowest
    /// verifier id so the choice is deterministic.
    pub async fn pick(&self, role: ActorRole) -> Result<ActorId> {
        let candidates = self.directory.actors_holding(role).await?;
        if candidates.is_empty() {
            return Err(VerificationError::NoEligibleReviewer(role));
        }

        let workloads = self.store.reviewer_workloads(self.window).await?;
        let by_id: HashMap<ActorId, &ReviewerWorkload> =
            workloads.iter().map(|w| (w.verifier_id, w)).collect();

        let mut best: Option<(ActorId, u64, f64)> = None;
        for candidate in candidates {
            let (active, turnaround) = match by_id.get(&candidate) {
                Some(w) => (w.counts.active(), w.avg_turnaround_secs.unwrap_or(0.0)),
                None => (0, 0.0),
            };
            let better = match best {
                None => true,
                Some((best_id, best_active, best_turnaround)) => {
                    active < best_active
                        || (active == best_active && turnaround < best_turnaround)
                        || (active == best_active
                            && turnaround == best_turnaround
                            && candidate.0 < best_id.0)
                }
            };
            if better {
                best = Some((candidate, active, turnaround));
            }
        }

        // Non-empty candidates guarantee a pick.
        let (verifier, active, _) = best.expect("candidate set checked non-empty");
        tracing::debug!(
            verifier = %verifier,
            active_assignments = active,
            role = %role,
            "assigner picked reviewer"
        );
        Ok(verifier)
    }
}
