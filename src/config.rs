use std::time::Duration;

use thiserror::Error;

/// Largest request count a result channel can be sized for.
pub const MAX_REQUESTS: usize = usize::MAX >> 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target URL must not be empty")]
    EmptyUrl,
    #[error("request count must be greater than zero")]
    ZeroRequests,
    #[error("request count must not exceed {MAX_REQUESTS}")]
    TooManyRequests,
    #[error("concurrency must be greater than zero")]
    ZeroConcurrency,
}

/// Validated settings for a single load-test run.
#[derive(Debug, Clone)]
pub struct Config {
    url: String,
    requests: usize,
    concurrency: usize,
    timeout: Option<Duration>,
}

impl Config {
    pub fn new(
        url: impl Into<String>,
        requests: usize,
        concurrency: usize,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        if url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if requests == 0 {
            return Err(ConfigError::ZeroRequests);
        }
        if requests > MAX_REQUESTS {
            return Err(ConfigError::TooManyRequests);
        }
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        Ok(Config {
            url,
            requests,
            concurrency,
            timeout: None,
        })
    }

    /// Bounds every request; without it a request waits as long as the
    /// transport does.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
