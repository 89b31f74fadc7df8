//! Process-level settings for the HTTP server.

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8181;
pub const HTTP_PORT_VAR: &str = "LEDGER_HTTP_PORT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid port {value:?} from {source_name}")]
pub struct InvalidPort {
    pub value: String,
    pub source_name: &'static str,
}

/// Port to listen on: the first CLI argument, else `LEDGER_HTTP_PORT`, else 8181.
pub fn resolve_port(arg: Option<String>, env: Option<String>) -> Result<u16, InvalidPort> {
    let (raw, source_name) = match (arg, env) {
        (Some(arg), _) => (arg, "command line"),
        (None, Some(env)) => (env, HTTP_PORT_VAR),
        (None, None) => return Ok(DEFAULT_PORT),
    };

    raw.trim().parse().map_err(|_| InvalidPort {
        value: raw,
        source_name,
    })
}

/// Resolves when the process receives Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
