//! Append-only timeline of actions taken on a verification request.
//!
//! Entries are written exactly once, in the same transaction as the status
//! change they describe, and are never updated or deleted. The entries of a
//! request, replayed in order, are the full provenance of its status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ActorId, RequestId, RequestStatus, TimelineId};

/// What happened to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAction {
    Created,
    Assigned,
    Approved,
    Rejected,
    /// More information was requested from the reporter.
    Resubmitted,
    PriorityChanged,
}

impl TimelineAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineAction::Created => "created",
            TimelineAction::Assigned => "assigned",
            TimelineAction::Approved => "approved",
            TimelineAction::Rejected => "rejected",
            TimelineAction::Resubmitted => "resubmitted",
            TimelineAction::PriorityChanged => "priority_changed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(TimelineAction::Created),
            "assigned" => Some(TimelineAction::Assigned),
            "approved" => Some(TimelineAction::Approved),
            "rejected" => Some(TimelineAction::Rejected),
            "resubmitted" => Some(TimelineAction::Resubmitted),
            "priority_changed" => Some(TimelineAction::PriorityChanged),
            _ => None,
        }
    }
}

impl fmt::Display for TimelineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded action. Owned by exactly one request, ordered by timestamp
/// (insertion order breaks timestamp ties so replay is deterministic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timeline_id: TimelineId,
    pub request_id: RequestId,
    pub action_type: TimelineAction,
    pub action_by: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An entry about to be appended; the ledger assigns the id.
#[derive(Debug, Clone)]
pub struct NewTimelineEntry {
    pub request_id: RequestId,
    pub action_type: TimelineAction,
    pub action_by: ActorId,
    pub action_notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NewTimelineEntry {
    pub fn new(
        request_id: RequestId,
        action_type: TimelineAction,
        action_by: ActorId,
        action_notes: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            action_type,
            action_by,
            action_notes,
            timestamp,
        }
    }
}

/// Fold a request's timeline (oldest first) down to the status it proves.
///
/// Returns `None` for an empty timeline; a stored request always has at
/// least its `created` entry.
pub fn replay_status(entries: &[TimelineEntry]) -> Option<RequestStatus> {
    let mut status = None;
    for entry in entries {
        status = Some(match entry.action_type {
            TimelineAction::Created => RequestStatus::Pending,
            TimelineAction::Assigned => RequestStatus::InReview,
            TimelineAction::Approved => RequestStatus::Approved,
            TimelineAction::Rejected => RequestStatus::Rejected,
            TimelineAction::Resubmitted => RequestStatus::RequiresMoreInfo,
            // Priority changes do not move the lifecycle.
            TimelineAction::PriorityChanged => status?,
        });
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(request_id: RequestId, action: TimelineAction) -> TimelineEntry {
        TimelineEntry {
            timeline_id: TimelineId::new(),
            request_id,
            action_type: action,
            action_by: ActorId::new(),
            action_notes: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn replay_reconstructs_full_lifecycle() {
        let id = RequestId::new();
        let entries = vec![
            entry(id, TimelineAction::Created),
            entry(id, TimelineAction::Assigned),
            entry(id, TimelineAction::Resubmitted),
            entry(id, TimelineAction::Assigned),
            entry(id, TimelineAction::Approved),
        ];
        assert_eq!(replay_status(&entries), Some(RequestStatus::Approved));
    }

    #[test]
    fn replay_keeps_status_across_priority_changes() {
        let id = RequestId::new();
        let entries = vec![
            entry(id, TimelineAction::Created),
            entry(id, TimelineAction::PriorityChanged),
            entry(id, TimelineAction::Assigned),
            entry(id, TimelineAction::PriorityChanged),
        ];
        assert_eq!(replay_status(&entries), Some(RequestStatus::InReview));
    }

    #[test]
    fn replay_of_empty_timeline_is_none() {
        assert_eq!(replay_status(&[]), None);
    }

    #[test]
    fn leading_priority_change_is_unprovable() {
        // A priority_changed entry before created has no prior status to
        // carry; the fold refuses to invent one.
        let id = RequestId::new();
        let entries = vec![entry(id, TimelineAction::PriorityChanged)];
        assert_eq!(replay_status(&entries), None);
    }
}
