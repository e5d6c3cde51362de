use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging, filtered by `RUST_LOG` (defaults to info).
///
/// actix's access logger emits through the `log` facade; the subscriber's
/// log bridge picks those records up as well.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trace_auth=info,actix_web=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
