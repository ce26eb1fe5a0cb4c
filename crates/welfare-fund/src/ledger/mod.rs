//! Welfare fund ledger: a strictly ordered, append-only sequence of inflows and outflows.
//!
//! The current balance is never stored on its own; it is the `balance_after` of the latest row.

mod book;
mod domain;
mod history;
mod statement;

pub use book::{Ledger, POST_ATTEMPTS};
pub use domain::{HistoryFilter, LedgerTransaction, Posting, TransactionId, TransactionKind};
pub use history::{History, HistoryIter};
pub use statement::{write_statement, StatementError};

use crate::money::Amount;
use crate::repository::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger amounts must be positive (found {0})")]
    InvalidAmount(Amount),
    #[error("fund balance {balance} cannot cover an outflow of {requested}")]
    InsufficientFunds { balance: Amount, requested: Amount },
    #[error("ledger transaction {0} does not exist")]
    UnknownTransaction(TransactionId),
    #[error("ledger transaction {0} has already been reversed")]
    AlreadyReversed(TransactionId),
    #[error("ledger running balance breaks at sequence {sequence}")]
    ChainBroken { sequence: u64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LedgerError {
    /// Stable machine-readable code for API consumers.
    pub const fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::UnknownTransaction(_) => "not_found",
            LedgerError::AlreadyReversed(_) => "already_reversed",
            LedgerError::ChainBroken { .. } => "chain_broken",
            LedgerError::Repository(_) => "repository",
        }
    }
}
