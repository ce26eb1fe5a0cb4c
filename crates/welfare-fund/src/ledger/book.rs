use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use super::domain::{LedgerTransaction, Posting, TransactionId, TransactionKind};
use super::history::History;
use super::{HistoryFilter, LedgerError};
use crate::clock::Clock;
use crate::money::Amount;
use crate::repository::{FundRepository, RepositoryError};

/// Attempts at appending before a post gives up on a ledger other writers keep extending.
pub const POST_ATTEMPTS: usize = 5;

/// Append-only record of the welfare fund's balance.
///
/// Every post runs "read last balance, compute next, append" under one ordering lock, so
/// posts through one `Ledger` are strictly serialized and each `balance_after` derives from its
/// immediate predecessor. Writers in other processes are caught by the store's sequence check;
/// the post is then recomputed from the new tail, up to [`POST_ATTEMPTS`] times.
pub struct Ledger<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    ordering: Mutex<()>,
}

impl<R> Ledger<R>
where
    R: FundRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            ordering: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Balance after the most recent posting, or zero for an empty ledger.
    pub fn current_balance(&self) -> Result<Amount, LedgerError> {
        Ok(self
            .repository
            .last_transaction()?
            .map(|transaction| transaction.balance_after)
            .unwrap_or(Amount::ZERO))
    }

    /// Post a standalone transaction, e.g. a grant or donation received by the fund.
    pub fn post(&self, posting: Posting) -> Result<LedgerTransaction, LedgerError> {
        self.post_with(posting, None, |transaction| {
            self.repository.append_transaction(transaction)
        })
    }

    /// Post a compensating entry that undoes `id`. The original row is never modified.
    pub fn reverse(
        &self,
        id: &TransactionId,
        remarks: Option<String>,
    ) -> Result<LedgerTransaction, LedgerError> {
        let original = self
            .repository
            .transaction(id)?
            .ok_or_else(|| LedgerError::UnknownTransaction(id.clone()))?;

        if self.reversal_of(&original.id)?.is_some() {
            return Err(LedgerError::AlreadyReversed(id.clone()));
        }

        let posting = Posting {
            kind: original.kind.opposite(),
            amount: original.amount,
            category: original.category.clone(),
            linked_application_id: original.linked_application_id.clone(),
            remarks: Some(remarks.unwrap_or_else(|| format!("reversal of {}", original.id))),
        };

        self.post_with(posting, Some(original.id.clone()), |transaction| {
            // Re-check under the ordering lock; a concurrent reversal may have landed.
            match self.reversal_of(&original.id) {
                Ok(None) => self.repository.append_transaction(transaction),
                Ok(Some(_)) => Err(RepositoryError::Conflict),
                Err(LedgerError::Repository(err)) => Err(err),
                Err(other) => Err(RepositoryError::Unavailable(other.to_string())),
            }
        })
        .map_err(|err| match err {
            LedgerError::Repository(RepositoryError::Conflict) => {
                LedgerError::AlreadyReversed(id.clone())
            }
            other => other,
        })
    }

    /// The entry that compensates `id`, if one has been posted.
    pub fn reversal_of(
        &self,
        id: &TransactionId,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        for transaction in self.history(HistoryFilter::default()).iter() {
            let transaction = transaction?;
            if transaction.reverses.as_ref() == Some(id) {
                return Ok(Some(transaction));
            }
        }
        Ok(None)
    }

    /// Compute the next transaction under the ordering lock and hand it to `commit`, which
    /// must persist it (alone or together with other records) or fail without writing.
    ///
    /// `commit` runs again with a recomputed transaction whenever the store reports that the
    /// ledger tail moved, so the balance check always sees the latest row.
    pub(crate) fn post_with<F>(
        &self,
        posting: Posting,
        reverses: Option<TransactionId>,
        mut commit: F,
    ) -> Result<LedgerTransaction, LedgerError>
    where
        F: FnMut(LedgerTransaction) -> Result<(), RepositoryError>,
    {
        if posting.amount.is_zero() {
            return Err(LedgerError::InvalidAmount(posting.amount));
        }

        let _ordering = self.ordering.lock().unwrap_or_else(PoisonError::into_inner);

        let mut attempt = 1;
        loop {
            let transaction = self.next_transaction(&posting, reverses.clone())?;
            match commit(transaction.clone()) {
                Ok(()) => {
                    info!(
                        id = %transaction.id,
                        kind = transaction.kind.label(),
                        amount = %transaction.amount,
                        balance_after = %transaction.balance_after,
                        "ledger transaction posted"
                    );
                    return Ok(transaction);
                }
                Err(err @ RepositoryError::SequenceConflict { .. }) if attempt < POST_ATTEMPTS => {
                    warn!(%err, attempt, "ledger tail moved, recomputing posting");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn next_transaction(
        &self,
        posting: &Posting,
        reverses: Option<TransactionId>,
    ) -> Result<LedgerTransaction, LedgerError> {
        let last = self.repository.last_transaction()?;
        let (balance, sequence) = match &last {
            Some(transaction) => (transaction.balance_after, transaction.sequence + 1),
            None => (Amount::ZERO, 1),
        };

        let balance_after = match posting.kind {
            TransactionKind::Inflow => balance
                .checked_add(posting.amount)
                .ok_or(LedgerError::InvalidAmount(posting.amount))?,
            TransactionKind::Outflow => match balance.checked_sub(posting.amount) {
                Some(next) => next,
                None => {
                    warn!(
                        %balance,
                        requested = %posting.amount,
                        category = %posting.category,
                        "outflow rejected: insufficient funds"
                    );
                    return Err(LedgerError::InsufficientFunds {
                        balance,
                        requested: posting.amount,
                    });
                }
            },
        };

        // Keep posted_at ordered with sequence even if the clock is set back.
        let now = self.clock.now();
        let posted_at = match &last {
            Some(transaction) if transaction.posted_at > now => transaction.posted_at,
            _ => now,
        };

        Ok(LedgerTransaction {
            id: TransactionId::for_sequence(sequence),
            sequence,
            kind: posting.kind,
            amount: posting.amount,
            category: posting.category.clone(),
            linked_application_id: posting.linked_application_id.clone(),
            reverses,
            balance_after,
            posted_at,
            remarks: posting.remarks.clone(),
        })
    }

    /// Lazy, restartable view over posted transactions in posting order.
    pub fn history(&self, filter: HistoryFilter) -> History<R> {
        History::new(self.repository.clone(), filter)
    }

    /// Walk the whole ledger and check that every `balance_after` follows from its predecessor.
    ///
    /// Returns the number of transactions checked.
    pub fn verify_chain(&self) -> Result<usize, LedgerError> {
        let mut balance = Amount::ZERO;
        let mut expected_sequence = 1;
        let mut checked = 0;

        for transaction in self.history(HistoryFilter::default()).iter() {
            let transaction = transaction?;
            let next = match transaction.kind {
                TransactionKind::Inflow => balance.checked_add(transaction.amount),
                TransactionKind::Outflow => balance.checked_sub(transaction.amount),
            };
            if transaction.sequence != expected_sequence || next != Some(transaction.balance_after)
            {
                return Err(LedgerError::ChainBroken {
                    sequence: transaction.sequence,
                });
            }

            balance = transaction.balance_after;
            expected_sequence += 1;
            checked += 1;
        }

        Ok(checked)
    }
}
