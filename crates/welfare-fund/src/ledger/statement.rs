use std::io::Write;

use serde::Serialize;

use super::domain::LedgerTransaction;
use super::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("failed to write ledger statement: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush ledger statement: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Serialize)]
struct StatementRow<'a> {
    sequence: u64,
    id: &'a str,
    posted_at: String,
    kind: &'static str,
    category: &'a str,
    application: &'a str,
    reverses: &'a str,
    amount: String,
    balance_after: String,
    remarks: &'a str,
}

/// Write transactions as CSV for the reporting collaborators. Returns the number of rows.
pub fn write_statement<W, I>(transactions: I, writer: W) -> Result<usize, StatementError>
where
    W: Write,
    I: IntoIterator<Item = Result<LedgerTransaction, LedgerError>>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for transaction in transactions {
        let transaction = transaction?;
        csv_writer.serialize(StatementRow {
            sequence: transaction.sequence,
            id: transaction.id.as_str(),
            posted_at: transaction.posted_at.to_rfc3339(),
            kind: transaction.kind.label(),
            category: transaction.category.as_str(),
            application: transaction
                .linked_application_id
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or(""),
            reverses: transaction
                .reverses
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or(""),
            amount: transaction.amount.to_string(),
            balance_after: transaction.balance_after.to_string(),
            remarks: transaction.remarks.as_deref().unwrap_or(""),
        })?;
        rows += 1;
    }

    csv_writer.flush()?;
    Ok(rows)
}
