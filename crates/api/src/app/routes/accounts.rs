use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use ledger_core::AccountId;
use ledger_infra::Ledger;
use ledger_transfers::Account;

use crate::app::errors;

pub async fn open_account(
    Extension(ledger): Extension<Arc<Ledger>>,
    Json(account): Json<Account>,
) -> axum::response::Response {
    match ledger.open_account(account) {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_account(
    Extension(ledger): Extension<Arc<Ledger>>,
    Path(account_id): Path<String>,
) -> axum::response::Response {
    match ledger.find_account(&AccountId::new(account_id)) {
        Some(account) => (StatusCode::OK, Json(account)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
    }
}

pub async fn close_account(
    Extension(ledger): Extension<Arc<Ledger>>,
    Path(account_id): Path<String>,
) -> axum::response::Response {
    match ledger.close_account(&AccountId::new(account_id)) {
        Some(account) => (StatusCode::OK, Json(account)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
