use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use welfare_fund::repository::FundRepository;
use welfare_fund::review::{review_router, ApplicationId, ReviewService, TransitionNotifier};

pub(crate) fn with_fund_routes<R, N>(service: Arc<ReviewService<R, N>>) -> axum::Router
where
    R: FundRepository + 'static,
    N: TransitionNotifier + 'static,
{
    review_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/documents/:application_id/receipt",
            axum::routing::put(receipt_document_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Stand-in for the document store: records that a receipt file now exists for the application.
pub(crate) async fn receipt_document_endpoint(
    Extension(state): Extension<AppState>,
    Path(application_id): Path<String>,
) -> impl IntoResponse {
    let id = ApplicationId(application_id);
    state.receipts.attach(id.clone());
    (
        StatusCode::ACCEPTED,
        Json(json!({ "application_id": id, "receipt": "attached" })),
    )
}
