use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categories::{CategoryId, Ceiling, ClaimPayload};
use crate::money::Amount;

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review status tracked throughout the welfare application workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    CommitteePending,
    CommitteeApproved,
    CommitteeRejected,
    AdminPending,
    Approved,
    AdminRejected,
    NeedReceipt,
    Completed,
    Cancelled,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::CommitteePending => "COMMITTEE_PENDING",
            ApplicationStatus::CommitteeApproved => "COMMITTEE_APPROVED",
            ApplicationStatus::CommitteeRejected => "COMMITTEE_REJECTED",
            ApplicationStatus::AdminPending => "ADMIN_PENDING",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::AdminRejected => "ADMIN_REJECTED",
            ApplicationStatus::NeedReceipt => "NEED_RECEIPT",
            ApplicationStatus::Completed => "COMPLETED",
            ApplicationStatus::Cancelled => "CANCELLED",
        }
    }

    /// No reviewer or student action can move the application any further.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::CommitteeRejected
                | ApplicationStatus::AdminRejected
                | ApplicationStatus::Completed
                | ApplicationStatus::Cancelled
        )
    }

    pub const fn is_cancellable(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Submitted
                | ApplicationStatus::UnderReview
                | ApplicationStatus::CommitteePending
                | ApplicationStatus::AdminPending
        )
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Capacity in which an actor touches an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Student,
    Committee,
    Admin,
    System,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::Committee => "committee",
            ActorRole::Admin => "admin",
            ActorRole::System => "system",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated caller, resolved by the host before it reaches the review core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    pub id: String,
}

impl Actor {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            role: ActorRole::Student,
            id: id.into(),
        }
    }

    pub fn committee(id: impl Into<String>) -> Self {
        Self {
            role: ActorRole::Committee,
            id: id.into(),
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            role: ActorRole::Admin,
            id: id.into(),
        }
    }

    pub(crate) fn system() -> Self {
        Self {
            role: ActorRole::System,
            id: "system".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Student-provided claim. The requested amount is derived from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub student_id: String,
    pub category_id: CategoryId,
    pub payload: ClaimPayload,
}

/// One reviewer's recorded verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerDecision {
    pub reviewer_id: String,
    pub decision: Decision,
    /// Amount granted (admin) or suggested as the admin's upper bound (committee).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    pub decided_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// A claim instance bound to one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: String,
    pub category_id: CategoryId,
    pub requested_amount: Amount,
    pub approved_amount: Option<Amount>,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub ceiling: Ceiling,
    pub committee: Option<ReviewerDecision>,
    pub admin: Option<ReviewerDecision>,
    pub payload: ClaimPayload,
}

impl Application {
    /// Upper bound for the admin decision: the committee's suggestion when one exists.
    pub fn admin_cap(&self) -> Amount {
        match self.committee.as_ref().and_then(|decision| decision.amount) {
            Some(suggested) => suggested.min(self.ceiling.max_amount),
            None => self.ceiling.max_amount,
        }
    }

    pub fn has_reviewer_decision(&self) -> bool {
        self.committee.is_some() || self.admin.is_some()
    }

    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        actor.role == ActorRole::Student && actor.id == self.student_id
    }
}

/// Immutable record of one accepted status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub application_id: ApplicationId,
    /// `None` only for the entry that records the submission itself.
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub actor_role: ActorRole,
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}
