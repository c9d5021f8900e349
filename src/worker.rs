use std::pin::{pin, Pin};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, Uri};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time;

use crate::stats::RequestResult;

type Client = HyperClient<HttpsConnector<HttpConnector>, Empty<Bytes>>;

/// Bodies larger than this are dropped instead of drained; the connection
/// is closed rather than pooled.
const DRAIN_LIMIT_BYTES: usize = 256 * 1024;
/// Drain window when no per-request timeout is configured.
const DRAIN_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid target URI: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),
    #[error("failed to build request: {0}")]
    Build(#[from] http::Error),
    #[error("request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Issues a single request and reports how it went. Failures come back as
/// data inside the result, never as a panic or an `Err`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, target: &str) -> RequestResult;
}

#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        let https = HttpsConnector::new_with_connector(http);
        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(https);

        HttpExecutor { client, timeout }
    }

    async fn send(&self, target: &str) -> Result<Response<Incoming>, RequestError> {
        let uri = target.parse::<Uri>()?;
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Empty::<Bytes>::new())?;

        let response = match self.timeout {
            Some(limit) => time::timeout(limit, self.client.request(req))
                .await
                .map_err(|_| RequestError::Timeout(limit))??,
            None => self.client.request(req).await?,
        };
        Ok(response)
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, target: &str) -> RequestResult {
        let start = Instant::now();
        let outcome = self.send(target).await;
        let duration = start.elapsed();

        match outcome {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let window = match self.timeout {
                    Some(limit) => limit.saturating_sub(duration),
                    None => DRAIN_WINDOW,
                };
                let body = pin!(resp.into_body());
                match time::timeout(window, drain_body(body)).await {
                    Ok(Ok(true)) => {}
                    Ok(Ok(false)) => tracing::debug!("Response body over drain limit, dropped"),
                    Ok(Err(e)) => tracing::debug!("Failed to drain response body: {}", e),
                    Err(_) => {
                        tracing::debug!("Response body not finished within {:?}, dropped", window)
                    }
                }
                RequestResult::success(status, duration)
            }
            Err(e) => {
                tracing::debug!("Request error: {}", e);
                RequestResult::failure(e, duration)
            }
        }
    }
}

/// Reads and discards body frames. Returns `false` once the limit is
/// passed. Reading to the end hands the connection back to the pool.
async fn drain_body(mut body: Pin<&mut Incoming>) -> Result<bool, hyper::Error> {
    let mut read = 0usize;
    while let Some(frame) = body.frame().await {
        if let Some(data) = frame?.data_ref() {
            read += data.len();
            if read > DRAIN_LIMIT_BYTES {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Runs `quota` requests back to back and forwards every result.
pub async fn run_worker<E>(
    id: usize,
    executor: Arc<E>,
    target: Arc<str>,
    quota: usize,
    results: mpsc::Sender<RequestResult>,
) where
    E: Executor + ?Sized,
{
    for _ in 0..quota {
        let result = executor.execute(&target).await;
        if results.send(result).await.is_err() {
            tracing::warn!(worker = id, "result channel closed, stopping early");
            return;
        }
    }
    tracing::debug!(worker = id, quota, "worker finished");
}
