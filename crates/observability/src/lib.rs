//! Tracing and logging setup shared by the ledger binaries.

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init(logging::LogFormat::from_env());
}

/// Log output configuration.
pub mod logging;
