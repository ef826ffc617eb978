use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber. `RUST_LOG` overrides the default level.
pub fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().with_target(false))
        .with(log_filter(verbose, rust_log.as_deref()))
        .init();
}

/// Filter for `RUST_LOG` when it parses, otherwise the crate at `info`
/// (`debug` when verbose) and dependencies at `warn`.
pub fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if let Some(filter) = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return filter;
    }

    let level = if verbose { "debug" } else { "info" };
    EnvFilter::new(format!("warn,ratekeeper={level}"))
}
