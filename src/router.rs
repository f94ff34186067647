//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router is the
//! terminal handler of a [`Pipeline`](crate::Pipeline): middleware wraps it,
//! it never wraps middleware.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use tracing::trace;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup and hand it to [`Pipeline::new`](crate::Pipeline::new).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with a route already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Routes `req` and runs the matching handler.
    ///
    /// Unknown paths answer `404`; a path registered only under other
    /// methods answers `405`. Neither is an error.
    ///
    /// `HEAD` without its own route runs the `GET` handler and drops the body.
    pub(crate) async fn dispatch(&self, mut req: Request) -> Result<Response, Error> {
        let head_as_get = req.method() == Method::Head
            && self.lookup(Method::Head, req.path()).is_none()
            && self.lookup(Method::Get, req.path()).is_some();
        let method = if head_as_get { Method::Get } else { req.method() };

        let Some((handler, params)) = self.lookup(method, req.path()) else {
            let status = if self.allows_other_method(req.method(), req.path()) {
                Status::MethodNotAllowed
            } else {
                Status::NotFound
            };
            trace!(method = %req.method(), path = req.path(), status = status.as_u16(), "no route");
            return Ok(Response::status(status));
        };

        req.parts.params = params;
        let mut res = handler.call(req).await?;
        if head_as_get {
            res.body.clear();
        }
        Ok(res)
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn allows_other_method(&self, method: Method, path: &str) -> bool {
        Method::ALL.iter()
            .filter(|&&m| m != method)
            .filter_map(|m| self.routes.get(m))
            .any(|tree| tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn echo_id(req: Request) -> Result<String, Error> {
        Ok(req.param("id").unwrap_or_default().to_owned())
    }

    #[tokio::test]
    async fn fills_path_params() {
        let router = Router::new().on(Method::Get, "/items/{id}", echo_id);
        let res = router.dispatch(Request::new(Method::Get, "/items/7")).await.unwrap();
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"7");
    }

    #[tokio::test]
    async fn distinguishes_not_found_from_method_not_allowed() {
        let router = Router::new().on(Method::Get, "/items/{id}", echo_id);

        let res = router.dispatch(Request::new(Method::Delete, "/items/7")).await.unwrap();
        assert_eq!(res.status_code(), 405);

        let res = router.dispatch(Request::new(Method::Get, "/nowhere")).await.unwrap();
        assert_eq!(res.status_code(), 404);
    }

    #[tokio::test]
    async fn head_runs_the_get_handler_without_a_body() {
        let router = Router::new().on(Method::Get, "/items/{id}", echo_id);

        let res = router.dispatch(Request::new(Method::Head, "/items/7")).await.unwrap();
        assert_eq!(res.status_code(), 200);
        assert!(res.body().is_empty());
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));

        let res = router.dispatch(Request::new(Method::Head, "/nowhere")).await.unwrap();
        assert_eq!(res.status_code(), 404);
    }

    #[tokio::test]
    async fn explicit_head_routes_win_over_get() {
        let router = Router::new()
            .on(Method::Get, "/items/{id}", echo_id)
            .on(Method::Head, "/items/{id}", |_req: Request| async {
                Ok::<_, Error>(Status::NoContent)
            });

        let res = router.dispatch(Request::new(Method::Head, "/items/7")).await.unwrap();
        assert_eq!(res.status_code(), 204);
    }
}
