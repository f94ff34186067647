//! Built-in middleware.

use tracing::info;
use uuid::Uuid;

use super::{keys, EnvMiddleware, Environment, Flow, Middleware};
use crate::error::Error;
use crate::request::{Parts, Request};
use crate::response::Response;

/// Logs the start and end of its scope around everything inside it.
pub struct ScopeLogger {
    label: String,
}

impl ScopeLogger {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl Middleware for ScopeLogger {
    fn name(&self) -> &str {
        &self.label
    }

    fn before(&self, req: &mut Request) -> Result<Flow, Error> {
        info!(scope = %self.label, method = %req.method(), path = req.path(), "begin middleware handling");
        Ok(Flow::Continue)
    }

    fn after(&self, _req: &Parts, res: &mut Response) -> Result<(), Error> {
        info!(scope = %self.label, status = res.status_code(), "end middleware handling");
        Ok(())
    }
}

/// Logs the names of the incoming request headers, read through the
/// environment projection.
pub struct HeaderLogger;

impl EnvMiddleware for HeaderLogger {
    fn name(&self) -> &str {
        "header-logger"
    }

    fn before(&self, env: &mut Environment) -> Result<Flow, Error> {
        let names = env.headers(keys::REQUEST_HEADERS)
            .map(|h| h.keys().map(String::as_str).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        info!(key = keys::REQUEST_HEADERS, header_names = %names, "request headers");
        Ok(Flow::Continue)
    }
}

/// Tags every request with an id and echoes it on the response.
///
/// The id comes from the incoming `x-request-id` header when present,
/// otherwise a fresh UUID. It is stored as request metadata under
/// [`RequestId::KEY`].
pub struct RequestId;

impl RequestId {
    pub const KEY: &'static str = "requestId";
    const HEADER: &'static str = "x-request-id";
}

impl Middleware for RequestId {
    fn name(&self) -> &str {
        "request-id"
    }

    fn before(&self, req: &mut Request) -> Result<Flow, Error> {
        let id = match req.header(Self::HEADER) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => Uuid::new_v4().to_string(),
        };
        req.set_metadata(Self::KEY, id);
        Ok(Flow::Continue)
    }

    fn after(&self, req: &Parts, res: &mut Response) -> Result<(), Error> {
        if let Some(id) = req.metadata(Self::KEY) {
            res.set_header(Self::HEADER, id);
        }
        Ok(())
    }
}
