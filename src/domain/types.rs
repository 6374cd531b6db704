//! Core identifier and enum types for the verification workflow.
//!
//! Statuses, priorities and request types are closed enums shared by the
//! state machine and the request store; any other value is rejected at the
//! boundary instead of being stored as free text.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Verification request identifier, assigned at creation and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reported incident identifier. Incident rows are owned by the intake
/// module; this core only references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub Uuid);

impl IncidentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Actor identifier (citizen, verifier or supervisor). Reviewers are actors,
/// so `verifier_id` parameters throughout the crate carry this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timeline entry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a verification request was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// First verification of a freshly reported incident.
    NewReport,
    /// Re-verification after the reporter supplied more information.
    Resubmission,
    /// Escalated by staff for supervisor attention.
    Escalation,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::NewReport => "new_report",
            RequestType::Resubmission => "resubmission",
            RequestType::Escalation => "escalation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_report" => Some(RequestType::NewReport),
            "resubmission" => Some(RequestType::Resubmission),
            "escalation" => Some(RequestType::Escalation),
            _ => None,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered priority. The derived `Ord` follows declaration order, so
/// `Low < Medium < High < Critical` holds and `rank()` mirrors it for SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Low => "low",
            PriorityLevel::Medium => "medium",
            PriorityLevel::High => "high",
            PriorityLevel::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(PriorityLevel::Low),
            "medium" => Some(PriorityLevel::Medium),
            "high" => Some(PriorityLevel::High),
            "critical" => Some(PriorityLevel::Critical),
            _ => None,
        }
    }

    /// Stable numeric rank for ordering in queries (higher = more urgent).
    pub fn rank(&self) -> i16 {
        match self {
            PriorityLevel::Low => 0,
            PriorityLevel::Medium => 1,
            PriorityLevel::High => 2,
            PriorityLevel::Critical => 3,
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a verification request.
///
/// Transitions between these values only ever happen through
/// [`crate::domain::plan`]; the store rejects any other string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
    RequiresMoreInfo,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InReview => "in_review",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::RequiresMoreInfo => "requires_more_info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "in_review" => Some(RequestStatus::InReview),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "requires_more_info" => Some(RequestStatus::RequiresMoreInfo),
            _ => None,
        }
    }

    /// Terminal statuses admit no further transition; a new request is
    /// opened for any further action on the same incident.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Roles resolved by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Citizen,
    Verifier,
    Supervisor,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Citizen => "citizen",
            ActorRole::Verifier => "verifier",
            ActorRole::Supervisor => "supervisor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "citizen" => Some(ActorRole::Citizen),
            "verifier" => Some(ActorRole::Verifier),
            "supervisor" => Some(ActorRole::Supervisor),
            _ => None,
        }
    }

    /// Whether the role may approve, reject or request more information.
    pub fn can_verify(&self) -> bool {
        matches!(self, ActorRole::Verifier | ActorRole::Supervisor)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The slice of the incident collaborator's status vocabulary this core
/// touches. Approve/reject write `Approved`/`Rejected`; the rest exist for
/// fixtures and read-backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Reported,
    InProgress,
    Approved,
    Rejected,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Reported => "reported",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Approved => "approved",
            IncidentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reported" => Some(IncidentStatus::Reported),
            "in_progress" => Some(IncidentStatus::InProgress),
            "approved" => Some(IncidentStatus::Approved),
            "rejected" => Some(IncidentStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
