use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categories::CategoryId;
use crate::money::Amount;
use crate::review::ApplicationId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub(crate) fn for_sequence(sequence: u64) -> Self {
        Self(format!("txn-{sequence:08}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Inflow,
    Outflow,
}

impl TransactionKind {
    pub const fn label(self) -> &'static str {
        match self {
            TransactionKind::Inflow => "inflow",
            TransactionKind::Outflow => "outflow",
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            TransactionKind::Inflow => TransactionKind::Outflow,
            TransactionKind::Outflow => TransactionKind::Inflow,
        }
    }
}

/// Posted ledger row. `balance_after` snapshots the fund balance once this row applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    /// Position in the global posting order, starting at 1.
    pub sequence: u64,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub category: CategoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_application_id: Option<ApplicationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverses: Option<TransactionId>,
    pub balance_after: Amount,
    pub posted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Request to move money in or out of the fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub kind: TransactionKind,
    pub amount: Amount,
    pub category: CategoryId,
    #[serde(default)]
    pub linked_application_id: Option<ApplicationId>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl Posting {
    pub fn inflow(amount: Amount, category: CategoryId) -> Self {
        Self {
            kind: TransactionKind::Inflow,
            amount,
            category,
            linked_application_id: None,
            remarks: None,
        }
    }

    pub fn outflow(amount: Amount, category: CategoryId) -> Self {
        Self {
            kind: TransactionKind::Outflow,
            amount,
            category,
            linked_application_id: None,
            remarks: None,
        }
    }

    pub fn linked_to(mut self, application_id: ApplicationId) -> Self {
        self.linked_application_id = Some(application_id);
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// Reporting filter for ledger history. `from` is inclusive, `to` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilter {
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub application: Option<ApplicationId>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn matches(&self, transaction: &LedgerTransaction) -> bool {
        if self.kind.is_some_and(|kind| kind != transaction.kind) {
            return false;
        }
        if let Some(category) = &self.category {
            if category != &transaction.category {
                return false;
            }
        }
        if let Some(application) = &self.application {
            if transaction.linked_application_id.as_ref() != Some(application) {
                return false;
            }
        }
        if self.from.is_some_and(|from| transaction.posted_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| transaction.posted_at >= to) {
            return false;
        }
        true
    }
}
