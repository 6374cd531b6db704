//! Derived per-reviewer workload views.
//!
//! Nothing here is stored: counts and turnaround are computed from the
//! request rows assigned to each verifier at query time.

use serde::{Deserialize, Serialize};

use super::ActorId;

/// Request counts for one verifier, grouped by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadCounts {
    pub total: u64,
    pub pending: u64,
    pub in_review: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl WorkloadCounts {
    /// Requests currently demanding the verifier's attention; the quantity
    /// the assigner balances on.
    pub fn active(&self) -> u64 {
        self.pending + self.in_review
    }
}

/// One verifier's workload snapshot, as read by the assigner and the
/// dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerWorkload {
    pub verifier_id: ActorId,
    pub counts: WorkloadCounts,
    /// Mean of `verification_date − created_at` over terminal requests in
    /// the trailing window; `None` when the verifier has no such history.
    pub avg_turnaround_secs: Option<f64>,
}

/// Dashboard row: workload plus the derived efficiency score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerReport {
    pub verifier_id: ActorId,
    pub counts: WorkloadCounts,
    pub avg_turnaround_hours: f64,
    /// 0–100; see [`efficiency_score`].
    pub efficiency_score: f64,
}

/// `0.5·(approved/total) + 0.5·max(0, 1 − turnaround_hours/24)`, scaled to
/// 0–100. A verifier with no requests scores zero rather than dividing by
/// zero.
pub fn efficiency_score(counts: &WorkloadCounts, avg_turnaround_hours: f64) -> f64 {
    if counts.total == 0 {
        return 0.0;
    }
    let approval_component = counts.approved as f64 / counts.total as f64;
    let speed_component = (1.0 - avg_turnaround_hours / 24.0).max(0.0);
    (0.5 * approval_component + 0.5 * speed_component) * 100.0
}
