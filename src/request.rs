//! Incoming HTTP request type.
//!
//! A [`Request`] is the typed context every middleware unit and handler sees.
//! Its head ([`Parts`]) is split from the body so post-phases can inspect the
//! request after the body has been handed to the terminal handler.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::method::Method;

/// Everything about a request except its body.
#[derive(Clone, Debug)]
pub struct Parts {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) params: HashMap<String, String>,
    pub(crate) metadata: HashMap<String, String>,
}

impl Parts {
    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Header lookup. Names are case-insensitive; values that are not
    /// visible ASCII are reported as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/api/todo/{id}`, `param("id")` on `/api/todo/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Free-form string metadata attached by middleware.
    ///
    /// Both middleware flavors share it: typed units through this accessor,
    /// environment units through any non-reserved environment key.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// An incoming HTTP request.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Bytes,
}

impl Request {
    /// A bodiless request with no headers. Mostly useful to drive a
    /// [`Pipeline`](crate::Pipeline) without a socket:
    ///
    /// ```rust
    /// use strata::{Method, Request};
    ///
    /// let req = Request::new(Method::Post, "/api/todo")
    ///     .with_header("content-type", "application/json")
    ///     .with_body(r#"{"name":"Buy milk"}"#);
    /// assert_eq!(req.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self::from_parts(
            Parts {
                method,
                path: path.into(),
                headers: HeaderMap::new(),
                params: HashMap::new(),
                metadata: HashMap::new(),
            },
            Bytes::new(),
        )
    }

    pub(crate) fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self { parts, body }
    }

    /// Appends a header.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `value` is not a valid header token.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(name.as_bytes())
            .unwrap_or_else(|e| panic!("invalid header name `{name}`: {e}"));
        let value = HeaderValue::from_str(value)
            .unwrap_or_else(|e| panic!("invalid header value `{value}`: {e}"));
        self.parts.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn parts(&self) -> &Parts { &self.parts }
    pub fn method(&self) -> Method { self.parts.method }
    pub fn path(&self) -> &str { &self.parts.path }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.header(name)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parts.param(key)
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.parts.metadata(key)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parts.metadata.insert(key.into(), value.into());
    }
}
