use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use welfare_fund::categories::{CategoryCatalog, CategoryId};
use welfare_fund::clock::SystemClock;
use welfare_fund::config::FundConfig;
use welfare_fund::error::AppError;
use welfare_fund::ledger::{Ledger, LedgerError, Posting};
use welfare_fund::money::Amount;
use welfare_fund::repository::{FundRepository, InMemoryFundRepository};
use welfare_fund::review::{
    NotifyError, ReceiptRegistry, ReviewService, TransitionEvent, TransitionNotifier,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) receipts: Arc<ReceiptRegistry>,
}

/// Hands transition events to the log until a mail/inbox notifier is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogNotifier;

impl TransitionNotifier for LogNotifier {
    fn notify(&self, event: TransitionEvent) -> Result<(), NotifyError> {
        info!(
            application_id = %event.application_id,
            from = event.from_status.map(|status| status.label()).unwrap_or("-"),
            to = %event.to_status,
            actor = %event.actor_role,
            "transition notification"
        );
        Ok(())
    }
}

pub(crate) type FundService = ReviewService<InMemoryFundRepository, LogNotifier>;

pub(crate) struct FundStack {
    pub(crate) service: Arc<FundService>,
    pub(crate) receipts: Arc<ReceiptRegistry>,
}

/// Wire the review service over a fresh in-memory store.
pub(crate) fn build_fund(config: &FundConfig) -> Result<FundStack, AppError> {
    let catalog = load_catalog(config.category_file.as_deref())?;
    let ledger = Arc::new(Ledger::new(
        Arc::new(InMemoryFundRepository::default()),
        Arc::new(SystemClock::default()),
    ));
    if let Some(opening_balance) = config.opening_balance {
        seed_opening_balance(&ledger, opening_balance)?;
    }

    let receipts = Arc::new(ReceiptRegistry::default());
    let service = Arc::new(ReviewService::new(
        ledger,
        Arc::new(catalog),
        Arc::new(LogNotifier),
        receipts.clone(),
    ));

    Ok(FundStack { service, receipts })
}

pub(crate) fn load_catalog(path: Option<&Path>) -> Result<CategoryCatalog, AppError> {
    match path {
        Some(path) => {
            let catalog = CategoryCatalog::from_path(path)?;
            info!(path = %path.display(), "category catalogue loaded");
            Ok(catalog)
        }
        None => Ok(CategoryCatalog::standard()),
    }
}

/// Post the opening balance, but only into an empty ledger.
pub(crate) fn seed_opening_balance(
    ledger: &Ledger<InMemoryFundRepository>,
    amount: Amount,
) -> Result<(), AppError> {
    let existing = ledger
        .repository()
        .last_transaction()
        .map_err(LedgerError::from)?;
    if amount.is_zero() || existing.is_some() {
        return Ok(());
    }

    ledger.post(
        Posting::inflow(amount, CategoryId::new("OPENING-BALANCE")).with_remarks("opening balance"),
    )?;
    Ok(())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_amount(raw: &str) -> Result<Amount, String> {
    raw.trim()
        .parse::<Amount>()
        .map_err(|err| format!("failed to parse '{raw}' as a ringgit amount ({err})"))
}
