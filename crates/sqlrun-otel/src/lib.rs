use once_cell::sync::OnceCell;
use sqlrun_core::util::{env_bool, env_string};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target carrying structured client log entries.
pub const TELEMETRY_TARGET: &str = "sqlrun.telemetry";

static TELEMETRY_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

pub fn init() {
    init_with_default("info");
}

/// Install the global subscriber. `RUST_LOG` overrides `default_directive`.
///
/// Console output goes to stderr so it never interleaves with rendered
/// results on stdout. With `SQLRUN_TELEMETRY_ROLL=1`, telemetry entries are
/// additionally written as JSON lines to a rolling file.
pub fn init_with_default(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(fmt_layer.with_filter(filter));

    if env_bool("SQLRUN_TELEMETRY_ROLL") == Some(true) {
        let dir = env_string("SQLRUN_TELEMETRY_DIR").unwrap_or_else(|| "logs".to_string());
        let prefix =
            env_string("SQLRUN_TELEMETRY_PREFIX").unwrap_or_else(|| "telemetry".to_string());
        let rotation =
            env_string("SQLRUN_TELEMETRY_ROTATION").unwrap_or_else(|| "daily".to_string());
        if std::fs::create_dir_all(&dir).is_err() {
            tracing::warn!(directory = %dir, "failed to create telemetry log directory");
        }
        let writer = match rotation.to_lowercase().as_str() {
            "hourly" => tracing_appender::rolling::hourly(&dir, &prefix),
            "minutely" => tracing_appender::rolling::minutely(&dir, &prefix),
            _ => tracing_appender::rolling::daily(&dir, &prefix),
        };
        let (nb, guard) = tracing_appender::non_blocking(writer);
        let _ = TELEMETRY_GUARD.set(guard);
        let targets = Targets::new().with_target(TELEMETRY_TARGET, tracing::Level::DEBUG);
        let telemetry_layer = fmt::layer()
            .json()
            .with_ansi(false)
            .with_current_span(false)
            .with_writer(nb)
            .with_filter(targets);
        let _ = registry.with(telemetry_layer).try_init();
    } else {
        let _ = registry.try_init();
    }
}
