use std::collections::VecDeque;
use std::sync::Arc;

use super::domain::{HistoryFilter, LedgerTransaction};
use super::LedgerError;
use crate::repository::FundRepository;

const DEFAULT_PAGE_SIZE: usize = 256;

/// Filtered view over the ledger. Each call to [`History::iter`] starts again from the first
/// transaction; nothing is read until the iterator is polled.
pub struct History<R> {
    repository: Arc<R>,
    filter: HistoryFilter,
    page_size: usize,
}

impl<R> Clone for History<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            filter: self.filter.clone(),
            page_size: self.page_size,
        }
    }
}

impl<R: FundRepository> History<R> {
    pub(crate) fn new(repository: Arc<R>, filter: HistoryFilter) -> Self {
        Self {
            repository,
            filter,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn filter(&self) -> &HistoryFilter {
        &self.filter
    }

    pub fn iter(&self) -> HistoryIter<R> {
        HistoryIter {
            repository: self.repository.clone(),
            filter: self.filter.clone(),
            page_size: self.page_size,
            cursor: 0,
            upper_bound: None,
            buffer: VecDeque::new(),
            finished: false,
        }
    }
}

impl<R: FundRepository> IntoIterator for &History<R> {
    type Item = Result<LedgerTransaction, LedgerError>;
    type IntoIter = HistoryIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pages through the repository. The upper bound is fixed at the last sequence that existed
/// when the first item was requested, so iteration ends even while new posts arrive.
pub struct HistoryIter<R> {
    repository: Arc<R>,
    filter: HistoryFilter,
    page_size: usize,
    cursor: u64,
    upper_bound: Option<u64>,
    buffer: VecDeque<LedgerTransaction>,
    finished: bool,
}

impl<R: FundRepository> HistoryIter<R> {
    fn fill(&mut self) -> Result<(), LedgerError> {
        let upper_bound = match self.upper_bound {
            Some(bound) => bound,
            None => {
                let bound = self
                    .repository
                    .last_transaction()?
                    .map(|transaction| transaction.sequence)
                    .unwrap_or(0);
                self.upper_bound = Some(bound);
                bound
            }
        };

        while self.buffer.is_empty() && self.cursor < upper_bound {
            let page = self
                .repository
                .transactions_after(self.cursor, self.page_size)?;
            if page.is_empty() {
                self.cursor = upper_bound;
                break;
            }

            for transaction in page {
                self.cursor = transaction.sequence;
                if transaction.sequence > upper_bound {
                    self.cursor = upper_bound;
                    break;
                }
                if self.filter.matches(&transaction) {
                    self.buffer.push_back(transaction);
                }
            }
        }

        Ok(())
    }
}

impl<R: FundRepository> Iterator for HistoryIter<R> {
    type Item = Result<LedgerTransaction, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.buffer.is_empty() {
            if let Err(err) = self.fill() {
                self.finished = true;
                return Some(Err(err));
            }
        }

        match self.buffer.pop_front() {
            Some(transaction) => Some(Ok(transaction)),
            None => {
                self.finished = true;
                None
            }
        }
    }
}
