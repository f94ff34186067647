//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, request-id injection, and
//! header inspection.
//!
//! # Two flavors, one ordering contract
//!
//! - [`Middleware`] units see the typed [`Request`] and [`Response`].
//! - [`EnvMiddleware`] units see a string-keyed [`Environment`], the shape
//!   adapter-style pipelines from other frameworks expect.
//!
//! Both are stored as [`Layer`]s in one arena, addressed by position, and may
//! be interleaved freely. For a pipeline `[A, B, C]` wrapping router `T`:
//!
//! ```text
//! A.before → B.before → C.before → T → C.after → B.after → A.after
//! ```
//!
//! # Short-circuit and faults
//!
//! A `before` that returns [`Flow::Respond`] stops the forward walk: later
//! layers and the router never run. The responding layer's own `after` runs
//! with that response, then the outer layers' `after`s in reverse.
//!
//! An `Err` from any phase, or from the handler, is a fault. It is returned
//! as-is and no further `after` runs. Nothing in the pipeline catches or
//! retries.

mod builtin;
mod env;

pub use builtin::{HeaderLogger, RequestId, ScopeLogger};
pub use env::{keys, EnvMiddleware, Environment, Headers, Value};

use tracing::{debug, trace};

use crate::error::Error;
use crate::request::{Parts, Request};
use crate::response::Response;
use crate::router::Router;

/// What a `before` phase decided.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next layer, or to the router after the last.
    Continue,
    /// Stop here and unwind with this response.
    Respond(Response),
}

/// A typed middleware unit.
///
/// Both phases default to no-ops, so a unit implements only what it needs.
///
/// ```rust
/// use strata::{Error, Parts, Response, middleware::Middleware};
///
/// struct PoweredBy;
///
/// impl Middleware for PoweredBy {
///     fn name(&self) -> &str { "powered-by" }
///
///     fn after(&self, _req: &Parts, res: &mut Response) -> Result<(), Error> {
///         res.set_header("x-powered-by", "strata");
///         Ok(())
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Tag used in trace events.
    fn name(&self) -> &str;

    fn before(&self, _req: &mut Request) -> Result<Flow, Error> {
        Ok(Flow::Continue)
    }

    fn after(&self, _req: &Parts, _res: &mut Response) -> Result<(), Error> {
        Ok(())
    }
}

enum Unit {
    Typed(Box<dyn Middleware>),
    Env(Box<dyn EnvMiddleware>),
}

/// One position in a [`Pipeline`], holding either middleware flavor.
pub struct Layer {
    unit: Unit,
}

impl Layer {
    pub fn typed(m: impl Middleware) -> Self {
        Self { unit: Unit::Typed(Box::new(m)) }
    }

    pub fn adapter(m: impl EnvMiddleware) -> Self {
        Self { unit: Unit::Env(Box::new(m)) }
    }

    pub fn name(&self) -> &str {
        match &self.unit {
            Unit::Typed(m) => m.name(),
            Unit::Env(m) => m.name(),
        }
    }

    fn before(&self, req: &mut Request) -> Result<Flow, Error> {
        match &self.unit {
            Unit::Typed(m) => m.before(req),
            Unit::Env(m) => {
                let mut env = Environment::for_request(&req.parts);
                let flow = m.before(&mut env)?;
                env.commit_request(&mut req.parts)?;
                Ok(flow)
            }
        }
    }

    fn after(&self, req: &Parts, res: &mut Response) -> Result<(), Error> {
        match &self.unit {
            Unit::Typed(m) => m.after(req, res),
            Unit::Env(m) => {
                let mut env = Environment::for_response(req, res);
                m.after(&mut env)?;
                env.commit_response(res)
            }
        }
    }
}

/// An ordered chain of [`Layer`]s around a [`Router`].
///
/// Built once at startup, then shared read-only (behind `Arc`) by every
/// request. The first registered layer is the outermost.
///
/// ```rust
/// use strata::{Pipeline, Router, middleware::{HeaderLogger, ScopeLogger}};
///
/// let pipeline = Pipeline::new(Router::new())
///     .layer(ScopeLogger::new("core"))
///     .adapter(HeaderLogger);
/// assert_eq!(pipeline.names(), ["core", "header-logger"]);
/// ```
pub struct Pipeline {
    layers: Vec<Layer>,
    endpoint: Router,
}

impl Pipeline {
    pub fn new(endpoint: Router) -> Self {
        Self { layers: Vec::new(), endpoint }
    }

    /// Appends `layer` inside every layer registered so far.
    pub fn register(mut self, layer: Layer) -> Self {
        debug!(unit = layer.name(), position = self.layers.len(), "instancing middleware");
        self.layers.push(layer);
        self
    }

    /// Appends a typed unit.
    pub fn layer(self, m: impl Middleware) -> Self {
        self.register(Layer::typed(m))
    }

    /// Appends an environment-flavor unit.
    pub fn adapter(self, m: impl EnvMiddleware) -> Self {
        self.register(Layer::adapter(m))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layer names, outermost first.
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(Layer::name).collect()
    }

    /// Drives one request through every layer and the router.
    pub async fn handle(&self, mut req: Request) -> Result<Response, Error> {
        if self.layers.is_empty() {
            return self.endpoint.dispatch(req).await;
        }

        let mut entered = 0;
        let mut early = None;
        for (position, layer) in self.layers.iter().enumerate() {
            entered = position + 1;
            trace!(unit = layer.name(), position, "begin before");
            let flow = layer.before(&mut req)?;
            trace!(unit = layer.name(), position, "end before");

            if let Flow::Respond(res) = flow {
                debug!(unit = layer.name(), position, status = res.status_code(), "short-circuit");
                early = Some(res);
                break;
            }
        }

        let (head, mut res) = match early {
            Some(res) => (req.parts, res),
            None => {
                let head = req.parts.clone();
                (head, self.endpoint.dispatch(req).await?)
            }
        };

        for (position, layer) in self.layers[..entered].iter().enumerate().rev() {
            trace!(unit = layer.name(), position, "begin after");
            layer.after(&head, &mut res)?;
            trace!(unit = layer.name(), position, "end after");
        }

        Ok(res)
    }
}
