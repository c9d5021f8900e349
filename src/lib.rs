pub mod config;
pub mod logger;
pub mod runner;
pub mod stats;
pub mod worker;

pub use config::{Config, ConfigError};
pub use runner::{partition, run, run_with};
pub use stats::{Report, RequestResult};
pub use worker::{Executor, HttpExecutor, RequestError};
