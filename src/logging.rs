use std::io::{self, IsTerminal};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs the global tracing subscriber and the `log` bridge.
///
/// `RUST_LOG` overrides the verbosity-derived filter when set. Call this
/// once, early; repeated calls panic because the global subscriber is
/// already installed.
pub fn init_logging(verbosity: u8) {
    tracing_log::LogTracer::init().expect("Failed to set log tracer");

    let filter = match verbosity {
        0 => "info",
        1 => "info,libcourseforge=debug",
        2 => "info,libcourseforge=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(layer).init();
}
