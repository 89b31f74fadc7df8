use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use ledger_core::TransferId;
use ledger_infra::Ledger;
use ledger_transfers::LedgerEvent;

use crate::app::{dto, errors};

pub async fn submit_transfer(
    Extension(ledger): Extension<Arc<Ledger>>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    match ledger.submit_transfer(body.into_command()) {
        Ok(transfer_id) => {
            (StatusCode::ACCEPTED, Json(dto::TransferAccepted { transfer_id })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to publish transfer");
            errors::ledger_error_to_response(e)
        }
    }
}

pub async fn transfer_status(
    Extension(ledger): Extension<Arc<Ledger>>,
    Path(transfer_id): Path<String>,
) -> axum::response::Response {
    let Some(outcome) = ledger.find_transfer_outcome(&TransferId::new(transfer_id)) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let status = match &outcome {
        LedgerEvent::MoneyTransferred(_) => StatusCode::OK,
        LedgerEvent::MoneyTransferFailed(_) => StatusCode::PRECONDITION_FAILED,
        LedgerEvent::AccountCredited(_) | LedgerEvent::AccountDebited(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(outcome)).into_response()
}
