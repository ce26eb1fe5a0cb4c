use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::categories::{
    CategoryCatalog, CategoryId, ClaimPayload, DisasterClaim, EmergencyClaim, InpatientClaim,
    OutpatientClaim,
};
use crate::clock::ManualClock;
use crate::ledger::{Ledger, LedgerTransaction, Posting, TransactionId};
use crate::money::Amount;
use crate::repository::{
    FundRepository, InMemoryFundRepository, RepositoryError, TransitionCommit,
};
use crate::review::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, AuditEntry, NotifyError,
    ReceiptRegistry, RecordingNotifier, ReviewService, TransitionEvent, TransitionNotifier,
};

pub(super) const STUDENT: &str = "A21EC0001";

pub(super) fn ringgit(raw: &str) -> Amount {
    raw.parse().expect("valid amount")
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn outpatient(amount: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: STUDENT.to_string(),
        category_id: CategoryId::new("CAT-ILLNESS-OUTPATIENT"),
        payload: ClaimPayload::Outpatient(OutpatientClaim {
            clinic_name: "Pusat Kesihatan Universiti".to_string(),
            visit_date: date(2026, 3, 4),
            total_amount: ringgit(amount),
        }),
    }
}

pub(super) fn disaster(amount: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: STUDENT.to_string(),
        category_id: CategoryId::new("CAT-DISASTER"),
        payload: ClaimPayload::Disaster(DisasterClaim {
            disaster_type: "flood".to_string(),
            occurred_on: date(2026, 1, 12),
            location: "Kota Tinggi".to_string(),
            estimated_loss: ringgit(amount),
        }),
    }
}

pub(super) fn chronic(ward: &str, treatment: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: STUDENT.to_string(),
        category_id: CategoryId::new("CAT-ILLNESS-CHRONIC"),
        payload: ClaimPayload::Inpatient(InpatientClaim {
            hospital_name: "Hospital Sultanah Aminah".to_string(),
            admitted_on: date(2026, 2, 1),
            discharged_on: Some(date(2026, 2, 9)),
            ward_charges: ringgit(ward),
            treatment_charges: ringgit(treatment),
        }),
    }
}

pub(super) fn emergency(amount: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: STUDENT.to_string(),
        category_id: CategoryId::new("CAT-EMERGENCY-OTHERS"),
        payload: ClaimPayload::Emergency(EmergencyClaim {
            description: "laptop stolen from hostel".to_string(),
            amount: ringgit(amount),
        }),
    }
}

pub(super) type TestService = ReviewService<InMemoryFundRepository, RecordingNotifier>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) repository: Arc<InMemoryFundRepository>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) receipts: Arc<ReceiptRegistry>,
    pub(super) catalog: Arc<CategoryCatalog>,
}

impl Harness {
    pub(super) fn ledger(&self) -> &Ledger<InMemoryFundRepository> {
        self.service.ledger()
    }

    /// Seed the fund with a grant so that approvals can disburse.
    pub(super) fn fund(&self, amount: &str) -> LedgerTransaction {
        self.ledger()
            .post(Posting::inflow(ringgit(amount), CategoryId::new("GRANT")))
            .expect("seed fund")
    }

    pub(super) fn status(&self, id: &ApplicationId) -> ApplicationStatus {
        self.service.application(id).expect("application exists").status
    }

    pub(super) fn trail(
        &self,
        id: &ApplicationId,
    ) -> Vec<(Option<ApplicationStatus>, ApplicationStatus)> {
        self.service
            .audit_trail(id)
            .expect("audit trail")
            .into_iter()
            .map(|entry| (entry.from_status, entry.to_status))
            .collect()
    }

    pub(super) fn transaction_count(&self) -> usize {
        self.ledger().history(Default::default()).iter().count()
    }
}

pub(super) fn harness() -> Harness {
    let repository = Arc::new(InMemoryFundRepository::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let ledger = Arc::new(Ledger::new(repository.clone(), clock));
    let catalog = Arc::new(CategoryCatalog::standard());
    let notifier = Arc::new(RecordingNotifier::default());
    let receipts = Arc::new(ReceiptRegistry::default());
    let service = Arc::new(ReviewService::new(
        ledger,
        catalog.clone(),
        notifier.clone(),
        receipts.clone(),
    ));

    Harness {
        service,
        repository,
        notifier,
        receipts,
        catalog,
    }
}

/// Notifier whose transport is always down.
#[derive(Debug, Default)]
pub(super) struct FailingNotifier;

impl TransitionNotifier for FailingNotifier {
    fn notify(&self, _event: TransitionEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay refused connection".to_string()))
    }
}

/// Store whose backend is offline for every call.
pub(super) struct UnavailableRepository;

impl FundRepository for UnavailableRepository {
    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_application(
        &self,
        _application: Application,
        _audit: Vec<AuditEntry>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit_transition(&self, _commit: TransitionCommit) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications(
        &self,
        _status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn audit_trail(&self, _id: &ApplicationId) -> Result<Vec<AuditEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn append_transaction(&self, _transaction: LedgerTransaction) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn last_transaction(&self) -> Result<Option<LedgerTransaction>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transactions_after(
        &self,
        _after: u64,
        _limit: usize,
    ) -> Result<Vec<LedgerTransaction>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transaction(
        &self,
        _id: &TransactionId,
    ) -> Result<Option<LedgerTransaction>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
