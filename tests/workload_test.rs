//! Workload distribution and the reviewer report.

mod common;

use common::*;

use std::collections::HashMap;

use roadwatch_verification::domain::{ActorId, RequestStatus};

#[tokio::test]
async fn fresh_reviewers_receive_balanced_assignments() {
    // N requests across M equally-eligible reviewers with no history:
    // max per-reviewer count minus min must be at most 1.
    let h = harness().await;
    let reviewers = h.seed_verifiers(3).await;

    for _ in 0..10 {
        let incident = h.seed_incident().await;
        let req = h
            .service
            .create_request(RequestSpec::new(incident).build())
            .await
            .unwrap();
        h.service
            .assign_verifier(req.request_id, None, supervisor_id())
            .await
            .unwrap();
    }

    let mut per_reviewer: HashMap<ActorId, u64> = HashMap::new();
    for reviewer in &reviewers {
        let counts = h.backend_counts(*reviewer).await;
        per_reviewer.insert(*reviewer, counts);
    }

    let max = per_reviewer.values().max().copied().unwrap_or(0);
    let min = per_reviewer.values().min().copied().unwrap_or(0);
    assert!(
        max - min <= 1,
        "distribution skewed: {per_reviewer:?} (max {max}, min {min})"
    );
    assert_eq!(per_reviewer.values().sum::<u64>(), 10);
}

#[tokio::test]
async fn assignments_avoid_the_busy_reviewer() {
    let h = harness().await;
    let reviewers = h.seed_verifiers(2).await;

    // Load the first reviewer with explicit assignments.
    for _ in 0..3 {
        let incident = h.seed_incident().await;
        let req = h
            .service
            .create_request(RequestSpec::new(incident).build())
            .await
            .unwrap();
        h.service
            .assign_verifier(req.request_id, Some(reviewers[0]), supervisor_id())
            .await
            .unwrap();
    }

    // The next automatic assignment must go to the idle reviewer.
    let incident = h.seed_incident().await;
    let req = h
        .service
        .create_request(RequestSpec::new(incident).build())
        .await
        .unwrap();
    let req = h
        .service
        .assign_verifier(req.request_id, None, supervisor_id())
        .await
        .unwrap();
    assert_eq!(req.assigned_verifier, Some(reviewers[1]));
}

#[tokio::test]
async fn workload_report_reflects_terminal_outcomes() {
    let h = harness().await;
    let reviewers = h.seed_verifiers(1).await;

    // Two approved, one rejected, one still in review.
    let mut in_review = None;
    for i in 0..4 {
        let incident = h.seed_incident().await;
        let req = h
            .service
            .create_request(RequestSpec::new(incident).build())
            .await
            .unwrap();
        let req = h
            .service
            .assign_verifier(req.request_id, None, supervisor_id())
            .await
            .unwrap();
        match i {
            0 | 1 => {
                h.service
                    .approve(req.request_id, reviewers[0], "confirmed".to_string())
                    .await
                    .unwrap();
            }
            2 => {
                h.service
                    .reject(req.request_id, reviewers[0], "not ours".to_string())
                    .await
                    .unwrap();
            }
            _ => in_review = Some(req.request_id),
        }
    }

    let report = h.service.get_workload().await.unwrap();
    assert_eq!(report.len(), 1);
    let row = &report[0];
    assert_eq!(row.verifier_id, reviewers[0]);
    assert_eq!(row.counts.total, 4);
    assert_eq!(row.counts.approved, 2);
    assert_eq!(row.counts.rejected, 1);
    assert_eq!(row.counts.in_review, 1);

    // Half approved with near-instant turnaround: approval component
    // contributes 25, speed component 50.
    assert!((row.efficiency_score - 75.0).abs() < 1.0);

    // The still-open request is untouched.
    let open = h
        .service
        .get_request(in_review.expect("one request stays open"))
        .await
        .unwrap();
    assert_eq!(open.status, RequestStatus::InReview);
}

impl common::Harness {
    /// In-review count for one reviewer, via the store contract.
    async fn backend_counts(&self, reviewer: ActorId) -> u64 {
        use roadwatch_verification::infra::RequestStore;
        self.backend
            .count_by_verifier(reviewer)
            .await
            .unwrap()
            .in_review
    }
}
