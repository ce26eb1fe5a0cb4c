use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{FundRepository, RepositoryError, TransitionCommit};
use crate::ledger::{LedgerTransaction, TransactionId};
use crate::review::{Application, ApplicationId, ApplicationStatus, AuditEntry};

#[derive(Debug, Default)]
struct Tables {
    applications: HashMap<ApplicationId, Application>,
    submission_order: Vec<ApplicationId>,
    audit: HashMap<ApplicationId, Vec<AuditEntry>>,
    transactions: Vec<LedgerTransaction>,
    issued_applications: u64,
}

impl Tables {
    fn check_next_sequence(&self, transaction: &LedgerTransaction) -> Result<(), RepositoryError> {
        let last = self
            .transactions
            .last()
            .map(|existing| existing.sequence)
            .unwrap_or(0);
        if transaction.sequence != last + 1 {
            return Err(RepositoryError::SequenceConflict {
                expected: transaction.sequence,
                next: last + 1,
            });
        }
        Ok(())
    }
}

/// Process-local store. All tables sit behind one mutex so every commit is atomic.
#[derive(Debug, Default)]
pub struct InMemoryFundRepository {
    tables: Mutex<Tables>,
}

impl InMemoryFundRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl FundRepository for InMemoryFundRepository {
    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        let mut tables = self.lock()?;
        tables.issued_applications += 1;
        Ok(ApplicationId(format!("app-{:06}", tables.issued_applications)))
    }

    fn insert_application(
        &self,
        application: Application,
        audit: Vec<AuditEntry>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }

        let id = application.id.clone();
        tables.submission_order.push(id.clone());
        tables.audit.insert(id.clone(), audit);
        tables.applications.insert(id, application);
        Ok(())
    }

    fn commit_transition(&self, commit: TransitionCommit) -> Result<(), RepositoryError> {
        let TransitionCommit {
            expected_status,
            application,
            audit,
            transaction,
        } = commit;

        let mut tables = self.lock()?;
        let stored = tables
            .applications
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected_status {
            return Err(RepositoryError::Conflict);
        }
        if let Some(transaction) = &transaction {
            tables.check_next_sequence(transaction)?;
        }

        if let Some(transaction) = transaction {
            tables.transactions.push(transaction);
        }
        tables
            .audit
            .entry(application.id.clone())
            .or_default()
            .extend(audit);
        tables
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.applications.get(id).cloned())
    }

    fn applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .submission_order
            .iter()
            .filter_map(|id| tables.applications.get(id))
            .filter(|application| status.map_or(true, |status| application.status == status))
            .cloned()
            .collect())
    }

    fn audit_trail(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.audit.get(id).cloned().unwrap_or_default())
    }

    fn append_transaction(&self, transaction: LedgerTransaction) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.check_next_sequence(&transaction)?;
        tables.transactions.push(transaction);
        Ok(())
    }

    fn last_transaction(&self) -> Result<Option<LedgerTransaction>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.transactions.last().cloned())
    }

    fn transactions_after(
        &self,
        after: u64,
        limit: usize,
    ) -> Result<Vec<LedgerTransaction>, RepositoryError> {
        let tables = self.lock()?;
        // Sequences are dense and start at 1, so `after` is also the slice offset.
        let start = usize::try_from(after)
            .unwrap_or(usize::MAX)
            .min(tables.transactions.len());
        Ok(tables.transactions[start..]
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    fn transaction(&self, id: &TransactionId) -> Result<Option<LedgerTransaction>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .transactions
            .iter()
            .find(|transaction| &transaction.id == id)
            .cloned())
    }
}
