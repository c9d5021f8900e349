use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOG_ENV_VARS: [&str; 2] = ["STRESS_TEST_LOG", "RUST_LOG"];

fn filter_from(directives: Option<&str>, verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    directives
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

/// Installs the global subscriber. Logs go to stderr; stdout carries the report.
pub fn init_logging(verbose: bool) {
    let directives = LOG_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter_from(directives.as_deref(), verbose))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        tracing::debug!("Logging already initialised: {}", err);
    }
}
