use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::worker::RequestError;

const STATUS_OK: u16 = 200;

/// Outcome of one request. `status` is 0 whenever `error` is set.
#[derive(Debug)]
pub struct RequestResult {
    pub status: u16,
    pub duration: Duration,
    pub error: Option<RequestError>,
}

impl RequestResult {
    pub fn success(status: u16, duration: Duration) -> Self {
        RequestResult {
            status,
            duration,
            error: None,
        }
    }

    pub fn failure(error: RequestError, duration: Duration) -> Self {
        RequestResult {
            status: 0,
            duration,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub total_time: Duration,
    pub total_requests: u64,
    pub status_codes: HashMap<u16, u64>,
    pub errors: u64,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    pub fn record(&mut self, result: &RequestResult) {
        self.total_requests += 1;
        if result.is_error() {
            self.errors += 1;
        } else {
            *self.status_codes.entry(result.status).or_insert(0) += 1;
        }
    }

    pub fn success_count(&self) -> u64 {
        self.status_codes.get(&STATUS_OK).copied().unwrap_or(0)
    }

    /// Non-200 codes in ascending order.
    pub fn other_status_codes(&self) -> Vec<(u16, u64)> {
        let mut codes: Vec<(u16, u64)> = self
            .status_codes
            .iter()
            .filter(|(code, _)| **code != STATUS_OK)
            .map(|(code, count)| (*code, *count))
            .collect();
        codes.sort_unstable_by_key(|(code, _)| *code);
        codes
    }

    pub fn is_consistent(&self) -> bool {
        self.status_codes.values().sum::<u64>() + self.errors == self.total_requests
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n--- Load Test Report ---")?;
        writeln!(f, "Total time: {:.2?}", self.total_time)?;
        writeln!(f, "Total requests: {}", self.total_requests)?;
        writeln!(f, "Requests with status 200: {}", self.success_count())?;
        writeln!(f, "Status code distribution:")?;
        for (code, count) in self.other_status_codes() {
            writeln!(f, "  {}: {}", code, count)?;
        }
        if self.errors > 0 {
            writeln!(f, "Failed requests: {}", self.errors)?;
        }
        Ok(())
    }
}
