#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const PATH_OK: &str = "/ok";
/// Every fifth request on this path answers 500.
pub const PATH_FLAKY: &str = "/flaky";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    connections_total: Arc<AtomicU64>,
    requests_total: Arc<AtomicU64>,
}

impl TestServerStats {
    pub fn connections_total(&self) -> u64 {
        self.connections_total.load(Ordering::Relaxed)
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }
}

pub struct TestServer {
    addr: SocketAddr,
    stats: TestServerStats,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let stats = TestServerStats::default();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_stats = stats.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        server_stats.connections_total.fetch_add(1, Ordering::Relaxed);

                        let stats = server_stats.clone();
                        tokio::spawn(async move {
                            let service = service_fn(move |req: Request<Incoming>| {
                                let n = stats.requests_total.fetch_add(1, Ordering::Relaxed);
                                async move { Ok::<_, Infallible>(respond(&req, n)) }
                            });
                            let _ = http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await;
                        });
                    }
                }
            }
        });

        Ok(TestServer {
            addr,
            stats,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

fn respond(req: &Request<Incoming>, n: u64) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    let status = if let Some(code) = path.strip_prefix("/status/") {
        code.parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::BAD_REQUEST)
    } else if path == PATH_FLAKY && n % 5 == 4 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    let mut response = Response::new(Full::new(Bytes::from_static(b"ok")));
    *response.status_mut() = status;
    response
}

/// An address with nothing listening on it.
pub async fn unreachable_url() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}/", addr))
}

/// What a [`StallServer`] sends before it goes quiet.
#[derive(Debug, Clone, Copy)]
pub enum Stall {
    /// Accepts and reads the request, never answers.
    BeforeHeaders,
    /// Sends headers that promise 1000 bytes, then only a few of them.
    InBody,
}

/// Raw TCP server that holds every connection open without finishing a
/// response.
pub struct StallServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StallServer {
    pub async fn start(stall: Stall) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;
                    if let Stall::InBody = stall {
                        let _ = stream
                            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
                            .await;
                    }
                    // Hold the socket until the client gives up.
                    while let Ok(n) = stream.read(&mut buf).await {
                        if n == 0 {
                            break;
                        }
                    }
                });
            }
        });

        Ok(StallServer { addr, handle })
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl Drop for StallServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
