use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ledger_infra::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::AlreadyExists(id) => json_error(
            StatusCode::CONFLICT,
            "already_exists",
            format!("account {id} already exists"),
        ),
        LedgerError::Bus(e) => json_error(StatusCode::BAD_GATEWAY, "publish_error", e.to_string()),
        LedgerError::Store(e) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_error", e.to_string())
        }
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            other.to_string(),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
