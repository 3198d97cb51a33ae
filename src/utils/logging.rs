// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Directive used when `RUST_LOG` is unset: this crate at `level`,
/// dependencies (reqwest, hyper) at warn.
fn default_directive(level: &str) -> String {
    format!("warn,promob_extractor={}", level)
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `level`.
/// stdout is left to the JSON output.
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Logging setup complete.");
}
