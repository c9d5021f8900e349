use std::process::ExitCode;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::Parser;
use stress_test::{logger, runner, Config, ConfigError};

const USAGE: &str = "Usage: stress-test --url=URL --requests=N --concurrency=M";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target URL
    #[arg(long)]
    url: String,

    /// Total number of requests to send
    #[arg(long)]
    requests: usize,

    /// Number of concurrent workers
    #[arg(long)]
    concurrency: usize,

    /// Timeout for each request in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<Config, ConfigError> {
        let config = Config::new(self.url, self.requests, self.concurrency)?;
        Ok(match self.timeout {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        })
    }
}

fn usage() -> ExitCode {
    println!("{}", USAGE);
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => return usage(),
    };

    logger::init_logging(args.verbose);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::debug!("Invalid configuration: {}", err);
            return usage();
        }
    };

    tracing::info!(
        "Running {} requests @ {} with {} concurrent workers",
        config.requests(),
        config.url(),
        config.concurrency().min(config.requests())
    );

    let report = runner::run(&config).await;
    print!("{}", report);

    ExitCode::SUCCESS
}
