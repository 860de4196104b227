//! Structured logging for the Runewire client.
//!
//! Console output with uptime timestamps and targets, plus a JSON log file in
//! debug builds. `RUST_LOG` wins over the configured level.

use std::fs::File;
use std::path::Path;

use runewire_config::Config;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the JSON log written in debug builds.
pub const LOG_FILE: &str = "runewire.log";

const DEFAULT_FILTER: &str = "info";

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - whether to add the file layer
/// * `config` - source of `debug.log_level`
///
/// ```no_run
/// use runewire_config::Config;
/// use runewire_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = config
        .map(|config| config.debug.log_level.as_str())
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = File::create(log_dir.join(LOG_FILE))
    {
        subscriber.with(json_file_layer(log_file)).init();
        return;
    }

    subscriber.init();
}

/// JSON lines layer writing to `file`, without ANSI escapes.
pub fn json_file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_timer(fmt::time::uptime())
        .json()
}

/// `EnvFilter` with the default level, for tests and tools.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
