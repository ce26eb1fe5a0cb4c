//! Transition table for the review workflow.
//!
//! Everything here is pure: the service consults these functions before it writes anything, so
//! an illegal request never produces an audit entry.

use super::domain::{Actor, ActorRole, Application, ApplicationStatus, Decision};
use crate::categories::Ceiling;

/// One status hop together with the actor it is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hop {
    pub(crate) from: Option<ApplicationStatus>,
    pub(crate) to: ApplicationStatus,
    pub(crate) actor: Actor,
    pub(crate) remarks: Option<String>,
}

impl Hop {
    fn system(from: ApplicationStatus, to: ApplicationStatus) -> Self {
        Self {
            from: Some(from),
            to,
            actor: Actor::system(),
            remarks: None,
        }
    }
}

/// Status a reviewer decision leads to, or `None` when `role` cannot decide from `status`.
pub(crate) fn decision_target(
    status: ApplicationStatus,
    role: ActorRole,
    decision: Decision,
) -> Option<ApplicationStatus> {
    use crate::review::domain::ApplicationStatus::*;

    match (status, role, decision) {
        (CommitteePending, ActorRole::Committee, Decision::Approve) => Some(CommitteeApproved),
        (CommitteePending, ActorRole::Committee, Decision::Reject) => Some(CommitteeRejected),
        (AdminPending, ActorRole::Admin, Decision::Approve) => Some(Approved),
        (AdminPending, ActorRole::Admin, Decision::Reject) => Some(AdminRejected),
        _ => None,
    }
}

/// Automatic follow-up the system performs after an application lands on `status`.
fn routing_target(status: ApplicationStatus, ceiling: &Ceiling) -> Option<ApplicationStatus> {
    use crate::review::domain::ApplicationStatus::*;

    match status {
        Submitted => Some(UnderReview),
        UnderReview if ceiling.requires_committee_approval => Some(CommitteePending),
        UnderReview => Some(AdminPending),
        CommitteeApproved => Some(AdminPending),
        _ => None,
    }
}

/// Append the system routing hops that follow `first` until a resting status is reached.
pub(crate) fn with_routing(first: Hop, ceiling: &Ceiling) -> Vec<Hop> {
    let mut current = first.to;
    let mut hops = vec![first];
    while let Some(next) = routing_target(current, ceiling) {
        hops.push(Hop::system(current, next));
        current = next;
    }
    hops
}

/// Hops recorded for a fresh submission: the student's entry followed by routing.
pub(crate) fn submission_hops(student: Actor, ceiling: &Ceiling) -> Vec<Hop> {
    with_routing(
        Hop {
            from: None,
            to: ApplicationStatus::Submitted,
            actor: student,
            remarks: None,
        },
        ceiling,
    )
}

/// Cancellation is the owning student's call, and only before any reviewer has spoken.
pub(crate) fn can_cancel(application: &Application, actor: &Actor) -> bool {
    application.is_owned_by(actor)
        && application.status.is_cancellable()
        && !application.has_reviewer_decision()
}

/// The student, or an admin acting on their behalf, reports an uploaded receipt.
pub(crate) fn can_mark_receipt(application: &Application, actor: &Actor) -> bool {
    application.status == ApplicationStatus::Approved
        && (application.is_owned_by(actor) || actor.role == ActorRole::Admin)
}

pub(crate) fn can_confirm_receipt(application: &Application, actor: &Actor) -> bool {
    application.status == ApplicationStatus::NeedReceipt && actor.role == ActorRole::Admin
}
