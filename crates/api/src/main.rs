use std::sync::Arc;

use anyhow::Context;

use ledger_api::server::{self, HTTP_PORT_VAR};
use ledger_infra::{Ledger, LedgerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledger_observability::init();

    let config = LedgerConfig::from_env().context("invalid ledger configuration")?;
    let port = server::resolve_port(std::env::args().nth(1), std::env::var(HTTP_PORT_VAR).ok())?;

    let ledger = Arc::new(Ledger::start(config).context("failed to start ledger")?);
    let app = ledger_api::app::build_app(ledger.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind 0.0.0.0:{port}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .context("http server failed")?;

    ledger.stop();
    Ok(())
}
