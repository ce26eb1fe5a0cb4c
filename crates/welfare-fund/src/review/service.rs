use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::collaborators::{DocumentConfirmation, TransitionEvent, TransitionNotifier};
use super::domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, ApplicationSubmission,
    AuditEntry, Decision, ReviewerDecision,
};
use super::machine::{self, Hop};
use crate::categories::{CategoryError, CategoryId, CategoryProvider, ClaimKind};
use crate::ledger::{Ledger, LedgerError, Posting};
use crate::money::Amount;
use crate::repository::{FundRepository, RepositoryError, TransitionCommit};

/// The only writer of application status and audit entries, and the only internal producer
/// of disbursement outflows.
pub struct ReviewService<R, N> {
    ledger: Arc<Ledger<R>>,
    categories: Arc<dyn CategoryProvider>,
    notifier: Arc<N>,
    documents: Arc<dyn DocumentConfirmation>,
}

impl<R, N> ReviewService<R, N>
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    pub fn new(
        ledger: Arc<Ledger<R>>,
        categories: Arc<dyn CategoryProvider>,
        notifier: Arc<N>,
        documents: Arc<dyn DocumentConfirmation>,
    ) -> Self {
        Self {
            ledger,
            categories,
            notifier,
            documents,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger<R>> {
        &self.ledger
    }

    fn repository(&self) -> &R {
        self.ledger.repository().as_ref()
    }

    fn now(&self) -> DateTime<Utc> {
        self.ledger.clock().now()
    }

    /// Validate a claim against its category, record it, and route it to the first reviewer.
    pub fn submit(&self, submission: ApplicationSubmission) -> Result<Application, ReviewError> {
        let ApplicationSubmission {
            student_id,
            category_id,
            payload,
        } = submission;

        let category = self
            .categories
            .category(&category_id)?
            .ok_or_else(|| ReviewError::UnknownCategory(category_id.clone()))?;
        if !category.active {
            return Err(ReviewError::CategoryInactive(category_id));
        }
        if payload.kind() != category.claim_kind {
            return Err(ReviewError::PayloadMismatch {
                expected: category.claim_kind,
                found: payload.kind(),
            });
        }

        let requested_amount = payload
            .requested_amount()
            .filter(|amount| !amount.is_zero())
            .ok_or_else(|| {
                ReviewError::InvalidAmount("requested amount must be greater than zero".to_string())
            })?;
        let ceiling = category.ceiling();
        if requested_amount > ceiling.max_amount {
            return Err(ReviewError::AmountExceedsLimit {
                amount: requested_amount,
                limit: ceiling.max_amount,
            });
        }

        let id = self.repository().next_application_id()?;
        let now = self.now();
        let hops = machine::submission_hops(Actor::student(student_id.clone()), &ceiling);
        let application = Application {
            id,
            student_id,
            category_id,
            requested_amount,
            approved_amount: None,
            status: resting_status(&hops, ApplicationStatus::Submitted),
            submitted_at: now,
            ceiling,
            committee: None,
            admin: None,
            payload,
        };
        let audit = audit_entries(&application.id, &hops, now);

        self.repository()
            .insert_application(application.clone(), audit.clone())?;

        info!(
            application_id = %application.id,
            category = %application.category_id,
            requested = %application.requested_amount,
            status = %application.status,
            "application submitted"
        );
        self.emit(&audit);
        Ok(application)
    }

    /// Record a committee or admin verdict. An admin approval disburses from the fund in the
    /// same atomic step; if the ledger refuses the outflow nothing is written.
    pub fn decide(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        decision: Decision,
        amount: Option<Amount>,
        remarks: Option<String>,
    ) -> Result<Application, ReviewError> {
        let current = self.load(id)?;
        let target = machine::decision_target(current.status, actor.role, decision)
            .ok_or_else(|| ReviewError::invalid_transition(&current, actor, "decide"))?;

        let granted = match decision {
            Decision::Approve => Some(approvable_amount(&current, actor.role, amount)?),
            Decision::Reject => None,
        };

        let now = self.now();
        let verdict = ReviewerDecision {
            reviewer_id: actor.id.clone(),
            decision,
            amount: granted,
            decided_at: now,
            remarks: remarks.clone(),
        };

        let mut updated = current.clone();
        match actor.role {
            ActorRole::Committee => updated.committee = Some(verdict),
            _ => updated.admin = Some(verdict),
        }

        let hops = machine::with_routing(
            Hop {
                from: Some(current.status),
                to: target,
                actor: actor.clone(),
                remarks,
            },
            &current.ceiling,
        );
        updated.status = resting_status(&hops, target);
        let audit = audit_entries(&updated.id, &hops, now);

        let disbursement = match (actor.role, granted) {
            (ActorRole::Admin, Some(amount)) => Some(amount),
            _ => None,
        };

        match disbursement {
            Some(amount) => {
                updated.approved_amount = Some(amount);
                let commit = TransitionCommit {
                    expected_status: current.status,
                    application: updated.clone(),
                    audit: audit.clone(),
                    transaction: None,
                };
                let posting = Posting::outflow(amount, current.category_id.clone())
                    .linked_to(current.id.clone())
                    .with_remarks(format!("disbursement for {}", current.id));

                let transaction = self
                    .ledger
                    .post_with(posting, None, |transaction| {
                        self.repository().commit_transition(TransitionCommit {
                            transaction: Some(transaction),
                            ..commit.clone()
                        })
                    })
                    .map_err(|err| {
                        warn!(
                            application_id = %current.id,
                            %err,
                            "approval rolled back"
                        );
                        ReviewError::from_ledger(&current, actor, err)
                    })?;

                info!(
                    application_id = %updated.id,
                    approved = %amount,
                    transaction = %transaction.id,
                    "application approved and disbursed"
                );
            }
            None => {
                self.repository()
                    .commit_transition(TransitionCommit {
                        expected_status: current.status,
                        application: updated.clone(),
                        audit: audit.clone(),
                        transaction: None,
                    })
                    .map_err(|err| ReviewError::from_commit(&current, actor, "decide", err))?;

                info!(
                    application_id = %updated.id,
                    reviewer = actor.role.label(),
                    status = %updated.status,
                    "review decision recorded"
                );
            }
        }

        self.emit(&audit);
        Ok(updated)
    }

    /// The student withdraws an application no reviewer has decided on yet.
    pub fn cancel(&self, id: &ApplicationId, actor: &Actor) -> Result<Application, ReviewError> {
        let current = self.load(id)?;
        if !machine::can_cancel(&current, actor) {
            return Err(ReviewError::invalid_transition(&current, actor, "cancel"));
        }

        let hops = vec![Hop {
            from: Some(current.status),
            to: ApplicationStatus::Cancelled,
            actor: actor.clone(),
            remarks: None,
        }];
        self.commit_hops(&current, current.clone(), actor, "cancel", hops)
    }

    /// Report a proof-of-spend upload for a disbursed application. When the document store
    /// already holds the receipt the application completes immediately.
    pub fn mark_receipt_uploaded(
        &self,
        id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, ReviewError> {
        let current = self.load(id)?;
        if !machine::can_mark_receipt(&current, actor) {
            return Err(ReviewError::invalid_transition(
                &current,
                actor,
                "mark receipt uploaded",
            ));
        }

        let mut hops = vec![Hop {
            from: Some(current.status),
            to: ApplicationStatus::NeedReceipt,
            actor: actor.clone(),
            remarks: None,
        }];
        if self.documents.receipt_attached(id) {
            hops.push(Hop {
                from: Some(ApplicationStatus::NeedReceipt),
                to: ApplicationStatus::Completed,
                actor: Actor::system(),
                remarks: Some("receipt confirmed by document store".to_string()),
            });
        }
        self.commit_hops(&current, current.clone(), actor, "mark receipt uploaded", hops)
    }

    /// Operator confirmation that the receipt is on file.
    pub fn confirm_receipt(
        &self,
        id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, ReviewError> {
        let current = self.load(id)?;
        if !machine::can_confirm_receipt(&current, actor) {
            return Err(ReviewError::invalid_transition(
                &current,
                actor,
                "confirm receipt",
            ));
        }
        if !self.documents.receipt_attached(id) {
            return Err(ReviewError::ReceiptNotConfirmed(id.clone()));
        }

        let hops = vec![Hop {
            from: Some(current.status),
            to: ApplicationStatus::Completed,
            actor: actor.clone(),
            remarks: None,
        }];
        self.commit_hops(&current, current.clone(), actor, "confirm receipt", hops)
    }

    pub fn application(&self, id: &ApplicationId) -> Result<Application, ReviewError> {
        self.load(id)
    }

    pub fn applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, ReviewError> {
        Ok(self.repository().applications(status)?)
    }

    pub fn audit_trail(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, ReviewError> {
        self.load(id)?;
        Ok(self.repository().audit_trail(id)?)
    }

    fn load(&self, id: &ApplicationId) -> Result<Application, ReviewError> {
        self.repository()
            .fetch_application(id)?
            .ok_or_else(|| ReviewError::NotFound(id.clone()))
    }

    fn commit_hops(
        &self,
        current: &Application,
        mut updated: Application,
        actor: &Actor,
        action: &'static str,
        hops: Vec<Hop>,
    ) -> Result<Application, ReviewError> {
        let now = self.now();
        updated.status = resting_status(&hops, current.status);
        let audit = audit_entries(&updated.id, &hops, now);

        self.repository()
            .commit_transition(TransitionCommit {
                expected_status: current.status,
                application: updated.clone(),
                audit: audit.clone(),
                transaction: None,
            })
            .map_err(|err| ReviewError::from_commit(current, actor, action, err))?;

        info!(
            application_id = %updated.id,
            from = %current.status,
            to = %updated.status,
            actor = actor.role.label(),
            "application transition recorded"
        );
        self.emit(&audit);
        Ok(updated)
    }

    fn emit(&self, audit: &[AuditEntry]) {
        for entry in audit {
            if let Err(err) = self.notifier.notify(TransitionEvent::from(entry)) {
                warn!(
                    application_id = %entry.application_id,
                    to = %entry.to_status,
                    %err,
                    "transition notification failed"
                );
            }
        }
    }
}

fn resting_status(hops: &[Hop], fallback: ApplicationStatus) -> ApplicationStatus {
    hops.last().map(|hop| hop.to).unwrap_or(fallback)
}

fn audit_entries(id: &ApplicationId, hops: &[Hop], timestamp: DateTime<Utc>) -> Vec<AuditEntry> {
    hops.iter()
        .map(|hop| AuditEntry {
            application_id: id.clone(),
            from_status: hop.from,
            to_status: hop.to,
            actor_role: hop.actor.role,
            actor_id: hop.actor.id.clone(),
            timestamp,
            remarks: hop.remarks.clone(),
        })
        .collect()
}

/// Amount a reviewer may approve: what was asked for unless stated, never above the request
/// or the cap in force for that reviewer.
fn approvable_amount(
    application: &Application,
    role: ActorRole,
    amount: Option<Amount>,
) -> Result<Amount, ReviewError> {
    let amount = amount.unwrap_or(application.requested_amount);
    if amount.is_zero() {
        return Err(ReviewError::InvalidAmount(
            "approved amount must be greater than zero".to_string(),
        ));
    }

    let cap = match role {
        ActorRole::Committee => application.ceiling.max_amount,
        _ => application.admin_cap(),
    };
    let limit = cap.min(application.requested_amount);
    if amount > limit {
        return Err(ReviewError::AmountExceedsLimit { amount, limit });
    }
    Ok(amount)
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("{action} is not permitted for {role} while application {application_id} is {status}")]
    InvalidTransition {
        application_id: ApplicationId,
        status: ApplicationStatus,
        role: ActorRole,
        action: &'static str,
    },
    #[error("amount {amount} exceeds the applicable limit of {limit}")]
    AmountExceedsLimit { amount: Amount, limit: Amount },
    #[error("fund balance {balance} cannot cover {requested}")]
    InsufficientFunds { balance: Amount, requested: Amount },
    #[error("category {0} is not accepting applications")]
    CategoryInactive(CategoryId),
    #[error("category {0} does not exist")]
    UnknownCategory(CategoryId),
    #[error("category expects a {} claim but received {}", .expected.label(), .found.label())]
    PayloadMismatch { expected: ClaimKind, found: ClaimKind },
    #[error("{0}")]
    InvalidAmount(String),
    #[error("no receipt is on file for application {0}")]
    ReceiptNotConfirmed(ApplicationId),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(LedgerError),
}

impl ReviewError {
    fn invalid_transition(application: &Application, actor: &Actor, action: &'static str) -> Self {
        ReviewError::InvalidTransition {
            application_id: application.id.clone(),
            status: application.status,
            role: actor.role,
            action,
        }
    }

    /// A concurrent writer moved the application on first; the caller's view is stale.
    /// A ledger that kept moving past every retry is a store failure, not an illegal move.
    fn from_commit(
        application: &Application,
        actor: &Actor,
        action: &'static str,
        err: RepositoryError,
    ) -> Self {
        match err {
            RepositoryError::Conflict => Self::invalid_transition(application, actor, action),
            RepositoryError::NotFound => ReviewError::NotFound(application.id.clone()),
            other => ReviewError::Repository(other),
        }
    }

    fn from_ledger(application: &Application, actor: &Actor, err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { balance, requested } => {
                ReviewError::InsufficientFunds { balance, requested }
            }
            LedgerError::Repository(err) => Self::from_commit(application, actor, "decide", err),
            other => ReviewError::Ledger(other),
        }
    }

    /// Stable machine-readable code for API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            ReviewError::NotFound(_) => "not_found",
            ReviewError::InvalidTransition { .. } => "invalid_transition",
            ReviewError::AmountExceedsLimit { .. } => "amount_exceeds_limit",
            ReviewError::InsufficientFunds { .. } => "insufficient_funds",
            ReviewError::CategoryInactive(_) => "category_inactive",
            ReviewError::UnknownCategory(_) => "unknown_category",
            ReviewError::PayloadMismatch { .. } => "payload_mismatch",
            ReviewError::InvalidAmount(_) => "invalid_amount",
            ReviewError::ReceiptNotConfirmed(_) => "receipt_not_confirmed",
            ReviewError::Category(_) => "category_provider",
            ReviewError::Repository(_) => "repository",
            ReviewError::Ledger(err) => err.kind(),
        }
    }
}
