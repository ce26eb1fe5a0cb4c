//! Storage boundary for applications, their audit trail, and the fund ledger.
//!
//! A single trait covers all three so that an implementation can apply a status change, its
//! audit entries, and a disbursement in one transaction.

mod memory;

pub use memory::InMemoryFundRepository;

use crate::ledger::{LedgerTransaction, TransactionId};
use crate::review::{Application, ApplicationId, ApplicationStatus, AuditEntry};

/// Everything one accepted transition writes.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    /// Status the caller observed before deciding. The commit fails with
    /// [`RepositoryError::Conflict`] if the stored record has moved on since, and with
    /// [`RepositoryError::SequenceConflict`] if another writer extended the ledger first.
    pub expected_status: ApplicationStatus,
    pub application: Application,
    pub audit: Vec<AuditEntry>,
    pub transaction: Option<LedgerTransaction>,
}

/// Transactional store behind the review service and the ledger.
///
/// Implementations must apply `insert_application` and `commit_transition` atomically, and
/// must refuse a ledger transaction whose `sequence` does not directly follow the last one.
/// Several processes may share one store, so identifiers are allocated here as well.
pub trait FundRepository: Send + Sync {
    /// Reserve an application id no other writer of this store will be handed.
    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError>;

    fn insert_application(
        &self,
        application: Application,
        audit: Vec<AuditEntry>,
    ) -> Result<(), RepositoryError>;

    fn commit_transition(&self, commit: TransitionCommit) -> Result<(), RepositoryError>;

    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;

    /// Applications in submission order, optionally restricted to one status.
    fn applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, RepositoryError>;

    fn audit_trail(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, RepositoryError>;

    fn append_transaction(&self, transaction: LedgerTransaction) -> Result<(), RepositoryError>;

    fn last_transaction(&self) -> Result<Option<LedgerTransaction>, RepositoryError>;

    /// Up to `limit` transactions with `sequence > after`, in posting order.
    fn transactions_after(
        &self,
        after: u64,
        limit: usize,
    ) -> Result<Vec<LedgerTransaction>, RepositoryError>;

    fn transaction(&self, id: &TransactionId) -> Result<Option<LedgerTransaction>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("ledger moved on: expected to append sequence {expected}, next free is {next}")]
    SequenceConflict { expected: u64, next: u64 },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
