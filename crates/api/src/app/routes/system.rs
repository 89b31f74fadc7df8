use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use ledger_infra::Ledger;

pub async fn health(Extension(ledger): Extension<Arc<Ledger>>) -> impl IntoResponse {
    if ledger.is_healthy() {
        (StatusCode::OK, "Healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Unhealthy")
    }
}

pub async fn metrics(Extension(ledger): Extension<Arc<Ledger>>) -> impl IntoResponse {
    Json(ledger.processor_stats())
}
