use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level;
/// an unrecognized level falls back to `warn`. Output goes to stderr so that
/// `--json` stdout stays clean.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.trim().to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // A second init (e.g. from tests) is a no-op.
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
