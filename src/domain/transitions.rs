//! The request state machine.
//!
//! [`plan`] is the single source of the transition table: it validates an
//! action against the request's current status and produces the field
//! changes, the timeline entry and the linked-incident sync that the journal
//! must commit as one unit. It performs no IO and never mutates its input:
//! an illegal action returns [`VerificationError::InvalidTransition`] and
//! nothing else happens.
//!
//! ```text
//! pending ──assign──► in_review ──approve──► approved   (terminal)
//!    ▲                    │      ──reject───► rejected   (terminal)
//!    │                    └──request_more_info──► requires_more_info
//!    └────────────assign (resubmission)───────────────┘
//! ```
//!
//! `reprioritize` is legal from any non-terminal status and leaves the
//! status unchanged.

use chrono::{DateTime, Utc};

use crate::infra::{Result, VerificationError};

use super::{
    ActorId, IncidentStatus, NewTimelineEntry, PriorityLevel, RequestStatus, StatusChanges,
    TimelineAction, VerificationRequest,
};

/// An action an actor is attempting against a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestAction {
    Assign { verifier: ActorId },
    Approve { notes: String },
    Reject { reason: String },
    RequestMoreInfo { notes: String },
    Reprioritize { priority: PriorityLevel },
}

/// Everything one successful transition writes, computed up front so the
/// journal can apply it atomically.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub new_status: RequestStatus,
    pub changes: StatusChanges,
    pub entry: NewTimelineEntry,
    /// Status the linked incident must be moved to in the same transaction.
    pub incident_update: Option<IncidentStatus>,
}

/// Validate `action` against the request's current status and plan the
/// resulting writes.
pub fn plan(
    request: &VerificationRequest,
    action: RequestAction,
    actor: ActorId,
    now: DateTime<Utc>,
) -> Result<TransitionPlan> {
    let from = request.status;

    match action {
        RequestAction::Assign { verifier } => {
            if !matches!(
                from,
                RequestStatus::Pending | RequestStatus::RequiresMoreInfo
            ) {
                return Err(invalid(request, from, "assign"));
            }
            Ok(TransitionPlan {
                new_status: RequestStatus::InReview,
                changes: StatusChanges {
                    assigned_verifier: Some(verifier),
                    ..StatusChanges::default()
                },
                entry: NewTimelineEntry::new(
                    request.request_id,
                    TimelineAction::Assigned,
                    actor,
                    Some(format!("assigned to verifier {verifier}")),
                    now,
                ),
                incident_update: None,
            })
        }

        RequestAction::Approve { notes } => {
            if from != RequestStatus::InReview {
                return Err(invalid(request, from, "approve"));
            }
            Ok(TransitionPlan {
                new_status: RequestStatus::Approved,
                changes: StatusChanges {
                    verification_date: Some(now),
                    verification_notes: Some(notes.clone()),
                    ..StatusChanges::default()
                },
                entry: NewTimelineEntry::new(
                    request.request_id,
                    TimelineAction::Approved,
                    actor,
                    Some(notes),
                    now,
                ),
                incident_update: Some(IncidentStatus::Approved),
            })
        }

        RequestAction::Reject { reason } => {
            if from != RequestStatus::InReview {
                return Err(invalid(request, from, "reject"));
            }
            Ok(TransitionPlan {
                new_status: RequestStatus::Rejected,
                changes: StatusChanges {
                    verification_date: Some(now),
                    rejection_reason: Some(reason.clone()),
                    ..StatusChanges::default()
                },
                entry: NewTimelineEntry::new(
                    request.request_id,
                    TimelineAction::Rejected,
                    actor,
                    Some(reason),
                    now,
                ),
                incident_update: Some(IncidentStatus::Rejected),
            })
        }

        RequestAction::RequestMoreInfo { notes } => {
            if from != RequestStatus::InReview {
                return Err(invalid(request, from, "request_more_info"));
            }
            Ok(TransitionPlan {
                new_status: RequestStatus::RequiresMoreInfo,
                changes: StatusChanges {
                    // Leaving review counts as the first verification pass;
                    // the journal keeps an earlier stamp if one exists.
                    verification_date: Some(now),
                    verification_notes: Some(notes.clone()),
                    ..StatusChanges::default()
                },
                entry: NewTimelineEntry::new(
                    request.request_id,
                    TimelineAction::Resubmitted,
                    actor,
                    Some(notes),
                    now,
                ),
                incident_update: None,
            })
        }

        RequestAction::Reprioritize { priority } => {
            if from.is_terminal() {
                return Err(invalid(request, from, "reprioritize"));
            }
            Ok(TransitionPlan {
                new_status: from,
                changes: StatusChanges {
                    priority_level: Some(priority),
                    ..StatusChanges::default()
                },
                entry: NewTimelineEntry::new(
                    request.request_id,
                    TimelineAction::PriorityChanged,
                    actor,
                    Some(format!(
                        "priority changed from {} to {}",
                        request.priority_level, priority
                    )),
                    now,
                ),
                incident_update: None,
            })
        }
    }
}

fn invalid(
    request: &VerificationRequest,
    from: RequestStatus,
    action: &'static str,
) -> VerificationError {
    VerificationError::InvalidTransition {
        request_id: request.request_id,
        from,
        action,
    }
}
