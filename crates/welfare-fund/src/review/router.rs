use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::collaborators::TransitionNotifier;
use super::domain::{
    Actor, ActorRole, ApplicationId, ApplicationStatus, ApplicationSubmission, Decision,
};
use super::service::{ReviewError, ReviewService};
use crate::categories::CategoryId;
use crate::ledger::{
    HistoryFilter, LedgerError, LedgerTransaction, Posting, TransactionId, TransactionKind,
};
use crate::money::Amount;
use crate::repository::{FundRepository, RepositoryError};

/// Router exposing the review workflow and the fund ledger over HTTP.
pub fn review_router<R, N>(service: Arc<ReviewService<R, N>>) -> Router
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(submit_handler::<R, N>).get(list_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/audit",
            get(audit_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/decisions",
            post(decision_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/receipt",
            post(receipt_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/receipt/confirm",
            post(confirm_receipt_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/cancel",
            post(cancel_handler::<R, N>),
        )
        .route("/api/v1/ledger/balance", get(balance_handler::<R, N>))
        .route(
            "/api/v1/ledger/transactions",
            get(history_handler::<R, N>).post(posting_handler::<R, N>),
        )
        .route(
            "/api/v1/ledger/transactions/:transaction_id/reverse",
            post(reverse_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub actor: Actor,
    pub decision: Decision,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub struct PostingRequest {
    pub actor: Actor,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub category: CategoryId,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    pub actor: Actor,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationsQuery {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl From<HistoryQuery> for HistoryFilter {
    fn from(query: HistoryQuery) -> Self {
        HistoryFilter {
            kind: query.kind,
            category: query.category.map(CategoryId),
            application: query.application.map(ApplicationId),
            from: query.from,
            to: query.to,
        }
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Json(submission): Json<ApplicationSubmission>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.submit(submission) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Query(query): Query<ApplicationsQuery>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.applications(query.status) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn application_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.application(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn audit_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.audit_trail(&ApplicationId(application_id)) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn decision_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(application_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let DecisionRequest {
        actor,
        decision,
        amount,
        remarks,
    } = request;

    match service.decide(
        &ApplicationId(application_id),
        &actor,
        decision,
        amount,
        remarks,
    ) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn receipt_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(application_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.mark_receipt_uploaded(&ApplicationId(application_id), &request.actor) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn confirm_receipt_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(application_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.confirm_receipt(&ApplicationId(application_id), &request.actor) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn cancel_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(application_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.cancel(&ApplicationId(application_id), &request.actor) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn balance_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    match service.ledger().current_balance() {
        Ok(balance) => (StatusCode::OK, Json(json!({ "balance": balance }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let history = service.ledger().history(HistoryFilter::from(query));
    match history.iter().collect::<Result<Vec<LedgerTransaction>, _>>() {
        Ok(transactions) => (StatusCode::OK, Json(transactions)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn posting_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Json(request): Json<PostingRequest>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    if request.actor.role != ActorRole::Admin {
        return forbidden("only administrators may post fund transactions");
    }

    let posting = Posting {
        kind: request.kind,
        amount: request.amount,
        category: request.category,
        linked_application_id: None,
        remarks: request.remarks,
    };
    match service.ledger().post(posting) {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn reverse_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(transaction_id): Path<String>,
    Json(request): Json<ReverseRequest>,
) -> Response
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    if request.actor.role != ActorRole::Admin {
        return forbidden("only administrators may reverse fund transactions");
    }

    match service
        .ledger()
        .reverse(&TransactionId(transaction_id), request.remarks)
    {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn forbidden(message: &str) -> Response {
    let payload = json!({
        "error": message,
        "kind": "forbidden",
    });
    (StatusCode::FORBIDDEN, Json(payload)).into_response()
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict | RepositoryError::SequenceConflict { .. } => {
            StatusCode::CONFLICT
        }
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let status = match &self {
            ReviewError::NotFound(_) => StatusCode::NOT_FOUND,
            ReviewError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ReviewError::AmountExceedsLimit { .. }
            | ReviewError::InsufficientFunds { .. }
            | ReviewError::CategoryInactive(_)
            | ReviewError::UnknownCategory(_)
            | ReviewError::PayloadMismatch { .. }
            | ReviewError::InvalidAmount(_)
            | ReviewError::ReceiptNotConfirmed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ReviewError::Repository(err) => repository_status(err),
            ReviewError::Category(_) | ReviewError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(payload)).into_response()
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::InvalidAmount(_) | LedgerError::InsufficientFunds { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            LedgerError::UnknownTransaction(_) => StatusCode::NOT_FOUND,
            LedgerError::AlreadyReversed(_) => StatusCode::CONFLICT,
            LedgerError::ChainBroken { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::Repository(err) => repository_status(err),
        };

        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(payload)).into_response()
    }
}
