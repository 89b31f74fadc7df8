use axum::{
    Router,
    routing::{get, post},
};

pub mod accounts;
pub mod system;
pub mod transfers;

/// Router for the account and transfer endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/account", post(accounts::open_account))
        .route(
            "/account/:account_id",
            get(accounts::get_account).delete(accounts::close_account),
        )
        .route("/transfer", post(transfers::submit_transfer))
        .route("/transfer/:transfer_id", get(transfers::transfer_status))
}
