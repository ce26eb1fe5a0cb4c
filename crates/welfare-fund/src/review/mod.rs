//! Welfare application review workflow.
//!
//! Applications move from submission through an optional committee stage to an admin decision.
//! An admin approval disburses from the fund ledger in the same atomic step, and every accepted
//! transition leaves an audit entry behind.

mod collaborators;
pub mod domain;
mod machine;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use collaborators::{
    DocumentConfirmation, NoopNotifier, NotifyError, ReceiptRegistry, RecordingNotifier,
    TransitionEvent, TransitionNotifier,
};
pub use domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, ApplicationSubmission,
    AuditEntry, Decision, ReviewerDecision,
};
pub use router::{
    review_router, ActorRequest, ApplicationsQuery, DecisionRequest, HistoryQuery,
    PostingRequest, ReverseRequest,
};
pub use service::{ReviewError, ReviewService};
