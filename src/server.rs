//! HTTP server and graceful shutdown.
//!
//! On **SIGTERM** or Ctrl-C the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.
//!
//! The server is also where pipeline faults end up: an `Err` coming out of
//! [`Pipeline::handle`] is logged and answered with `500`.
//!
//! Request bodies are buffered up to [`DEFAULT_BODY_LIMIT`] bytes (see
//! [`Server::body_limit`]); anything larger is answered with `413` before
//! the pipeline runs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, info_span, warn, Instrument};

use crate::error::Error;
use crate::method::Method;
use crate::middleware::Pipeline;
use crate::request::{Parts, Request};
use crate::response::Response;
use crate::status::Status;

/// Largest request body buffered by default: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// ```rust,no_run
    /// use strata::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self::from_addr(addr)
    }

    pub fn from_addr(addr: SocketAddr) -> Self {
        Self { addr, body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Caps the number of body bytes buffered per request. Larger bodies
    /// are answered with `413 Content Too Large`.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Starts accepting connections and driving each request through
    /// `pipeline`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, pipeline: Pipeline) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let pipeline = Arc::new(pipeline);

        let body_limit = self.body_limit;

        info!(addr = %self.addr, body_limit, layers = ?pipeline.names(), "strata listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once,
                // even if more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let pipeline = Arc::clone(&pipeline);
                            async move { dispatch(pipeline, req, remote_addr, body_limit).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("strata stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one hyper request, drives it through the pipeline, and converts
/// the outcome back. Never fails towards hyper.
async fn dispatch(
    pipeline: Arc<Pipeline>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
    body_limit: usize,
) -> Result<http::Response<http_body_util::Full<Bytes>>, std::convert::Infallible> {
    let span = info_span!("request", method = %req.method(), path = req.uri().path(), peer = %remote_addr);

    let response = async move {
        let Ok(method) = Method::try_from(req.method()) else {
            return Response::status(Status::MethodNotAllowed);
        };

        let request = match into_request(method, req, body_limit).await {
            Ok(r) => r,
            Err(status) => return Response::status(status),
        };

        match pipeline.handle(request).await {
            Ok(res) => {
                info!(status = res.status_code(), "request completed");
                res
            }
            Err(e) => {
                error!(error = %e, "unhandled fault");
                Response::status(Status::InternalServerError)
            }
        }
    }
    .instrument(span)
    .await;

    Ok(response.into_inner())
}

async fn into_request<B>(method: Method, req: hyper::Request<B>, limit: usize) -> Result<Request, Status>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (head, body) = req.into_parts();
    let body = read_body(body, limit).await?;

    let parts = Parts {
        method,
        path: head.uri.path().to_owned(),
        headers: head.headers,
        params: HashMap::new(),
        metadata: HashMap::new(),
    };
    Ok(Request::from_parts(parts, body))
}

/// Buffers at most `limit` bytes of `body`. An oversized body maps to `413`,
/// a broken one to `400`.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Status>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(limit, "request body exceeds limit");
            Err(Status::ContentTooLarge)
        }
        Err(e) => {
            error!(error = %e, "failed to read request body");
            Err(Status::BadRequest)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives: SIGTERM or
/// SIGINT on Unix, Ctrl-C elsewhere.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
