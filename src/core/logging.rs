//! Process-wide logging setup

use tracing_subscriber::EnvFilter;

/// HTTP-stack targets that are far too chatty at debug level
const NOISY_TARGETS: &[&str] = &["hyper_util", "reqwest"];

/// Build the filter for the given verbosity
///
/// Debug lowers the floor to `debug` and verbose to `info`; otherwise only
/// warnings and errors are shown. The noisy targets stay at `warn` either way.
pub fn log_filter(debug: bool, verbose: bool) -> EnvFilter {
    EnvFilter::new(filter_directives(debug, verbose))
}

fn filter_directives(debug: bool, verbose: bool) -> String {
    let floor = match (debug, verbose) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    std::iter::once(floor.to_string())
        .chain(NOISY_TARGETS.iter().map(|target| format!("{target}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the stderr subscriber
///
/// Lines read `LEVEL target: message`. Calling this more than once keeps
/// the first subscriber.
pub fn setup_logging(debug: bool, verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(debug, verbose))
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .try_init();
}
