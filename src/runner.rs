use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::mpsc;

use crate::config::{Config, MAX_REQUESTS};
use crate::stats::{Report, RequestResult};
use crate::worker::{run_worker, Executor, HttpExecutor};

/// Splits `requests` over `min(concurrency, requests)` workers. The first
/// `requests % workers` workers take one extra request each.
pub fn partition(requests: usize, concurrency: usize) -> Vec<usize> {
    let workers = concurrency.min(requests);
    if workers == 0 {
        return Vec::new();
    }

    let base = requests / workers;
    let remainder = requests % workers;
    (0..workers)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

pub async fn run(config: &Config) -> Report {
    let executor = Arc::new(HttpExecutor::new(config.timeout()));
    run_with(config, executor).await
}

pub async fn run_with<E>(config: &Config, executor: Arc<E>) -> Report
where
    E: Executor + 'static,
{
    let start = Instant::now();
    let quotas = partition(config.requests(), config.concurrency());
    tracing::info!(
        url = config.url(),
        requests = config.requests(),
        workers = quotas.len(),
        "starting load test"
    );

    // Room for every result, so workers never wait on the drain loop.
    let capacity = config.requests().clamp(1, MAX_REQUESTS);
    let (tx, mut rx) = mpsc::channel::<RequestResult>(capacity);
    let target: Arc<str> = Arc::from(config.url());

    let mut handles = Vec::with_capacity(quotas.len());
    for (id, quota) in quotas.into_iter().enumerate() {
        let handle = tokio::spawn(run_worker(
            id,
            executor.clone(),
            target.clone(),
            quota,
            tx.clone(),
        ));
        handles.push(handle);
    }

    // The watcher holds the last sender; the channel closes once it returns.
    let watcher = tokio::spawn(async move {
        for (id, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                tracing::warn!(worker = id, "worker task failed: {}", e);
            }
        }
        drop(tx);
    });

    let mut report = Report::new();
    while let Some(result) = rx.recv().await {
        report.record(&result);
    }

    if let Err(e) = watcher.await {
        tracing::warn!("completion watcher failed: {}", e);
    }

    report.total_time = start.elapsed();
    tracing::info!(
        total_requests = report.total_requests,
        errors = report.errors,
        elapsed_ms = u64::try_from(report.total_time.as_millis()).unwrap_or(u64::MAX),
        "load test finished"
    );
    report
}
