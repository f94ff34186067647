//! Environment-flavor middleware.
//!
//! Adapter-style pipelines hand every unit a single string-keyed dictionary
//! instead of typed request and response objects. [`Environment`] is that
//! dictionary, projected from the same request state the typed units see and
//! committed back once the unit returns.
//!
//! | Key | Value | Writable in |
//! |---|---|---|
//! | [`keys::REQUEST_METHOD`] | `Text` | read-only |
//! | [`keys::REQUEST_PATH`] | `Text` | read-only |
//! | [`keys::REQUEST_HEADERS`] | `Headers` | `before` |
//! | [`keys::RESPONSE_STATUS`] | `Status` | `after` |
//! | [`keys::RESPONSE_HEADERS`] | `Headers` | `after` |
//! | anything else | `Text` | `before` (request metadata) |
//!
//! Headers untouched by a unit keep their original bytes and flags; only a
//! changed `requestHeaders` entry rebuilds the request header map.

use std::collections::{BTreeMap, HashMap};

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

use super::Flow;
use crate::error::Error;
use crate::request::Parts;
use crate::response::Response;

/// Well-known environment keys.
pub mod keys {
    pub const REQUEST_METHOD: &str = "requestMethod";
    pub const REQUEST_PATH: &str = "requestPath";
    pub const REQUEST_HEADERS: &str = "requestHeaders";
    pub const RESPONSE_STATUS: &str = "responseStatusCode";
    pub const RESPONSE_HEADERS: &str = "responseHeaders";

    pub(super) const RESERVED: [&str; 5] =
        [REQUEST_METHOD, REQUEST_PATH, REQUEST_HEADERS, RESPONSE_STATUS, RESPONSE_HEADERS];
}

/// Header name (lowercase) to every value sent under it.
pub type Headers = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Text(String),
    Status(u16),
    Headers(Headers),
}

/// String-keyed view of one request (and, in `after`, its response).
#[derive(Clone, Debug, Default)]
pub struct Environment {
    entries: HashMap<String, Value>,
}

impl Environment {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn headers(&self, key: &str) -> Option<&Headers> {
        match self.entries.get(key) {
            Some(Value::Headers(h)) => Some(h),
            _ => None,
        }
    }

    pub fn headers_mut(&mut self, key: &str) -> Option<&mut Headers> {
        match self.entries.get_mut(key) {
            Some(Value::Headers(h)) => Some(h),
            _ => None,
        }
    }

    /// The response status, present only in `after`.
    pub fn status(&self) -> Option<u16> {
        match self.entries.get(keys::RESPONSE_STATUS) {
            Some(Value::Status(code)) => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn for_request(parts: &Parts) -> Self {
        let mut entries: HashMap<String, Value> = parts.metadata.iter()
            .map(|(k, v)| (k.clone(), Value::Text(v.clone())))
            .collect();
        entries.insert(keys::REQUEST_METHOD.to_owned(), Value::Text(parts.method.as_str().to_owned()));
        entries.insert(keys::REQUEST_PATH.to_owned(), Value::Text(parts.path.clone()));
        entries.insert(keys::REQUEST_HEADERS.to_owned(), Value::Headers(project_header_map(&parts.headers)));
        Self { entries }
    }

    pub(crate) fn for_response(parts: &Parts, res: &Response) -> Self {
        let mut env = Self::for_request(parts);
        let mut headers = Headers::new();
        for (name, value) in &res.headers {
            headers.entry(name.to_ascii_lowercase()).or_default().push(value.clone());
        }
        env.insert(keys::RESPONSE_STATUS, Value::Status(res.status));
        env.insert(keys::RESPONSE_HEADERS, Value::Headers(headers));
        env
    }

    /// Writes request headers and metadata back into `parts`.
    ///
    /// Method and path are read-only. A reserved key holding the wrong kind
    /// of value is left uncommitted. Headers the unit left as projected keep
    /// their original `HeaderValue`s, raw bytes and sensitivity included.
    pub(crate) fn commit_request(mut self, parts: &mut Parts) -> Result<(), Error> {
        if let Some(Value::Headers(headers)) = self.entries.remove(keys::REQUEST_HEADERS) {
            let original = project_header_map(&parts.headers);
            if headers != original {
                let mut map = HeaderMap::new();
                for (name, values) in &headers {
                    let n = header_name(name)?;
                    if original.get(name) == Some(values) {
                        for v in parts.headers.get_all(&n) {
                            map.append(n.clone(), v.clone());
                        }
                        continue;
                    }
                    for value in values {
                        let (n, v) = header_pair(name, value)?;
                        map.append(n, v);
                    }
                }
                parts.headers = map;
            }
        }

        parts.metadata = self.entries.into_iter()
            .filter(|(k, _)| !keys::RESERVED.contains(&k.as_str()))
            .filter_map(|(k, v)| match v {
                Value::Text(s) => Some((k, s)),
                _ => None,
            })
            .collect();
        Ok(())
    }

    /// Writes the response status and headers back into `res`.
    pub(crate) fn commit_response(mut self, res: &mut Response) -> Result<(), Error> {
        if let Some(Value::Status(code)) = self.entries.remove(keys::RESPONSE_STATUS) {
            if StatusCode::from_u16(code).is_err() {
                return Err(Error::fault("environment", format!("invalid status code {code}")));
            }
            res.status = code;
        }

        if let Some(Value::Headers(headers)) = self.entries.remove(keys::RESPONSE_HEADERS) {
            let mut flat = Vec::with_capacity(headers.len());
            for (name, values) in headers {
                for value in values {
                    header_pair(&name, &value)?;
                    flat.push((name.clone(), value));
                }
            }
            res.headers = flat;
        }
        Ok(())
    }
}

/// An adapter-style middleware unit.
///
/// ```rust
/// use strata::{Error, middleware::{keys, EnvMiddleware, Environment, Flow}};
///
/// struct Tag;
///
/// impl EnvMiddleware for Tag {
///     fn name(&self) -> &str { "tag" }
///
///     fn before(&self, env: &mut Environment) -> Result<Flow, Error> {
///         if let Some(headers) = env.headers_mut(keys::REQUEST_HEADERS) {
///             headers.insert("x-tagged".into(), vec!["1".into()]);
///         }
///         Ok(Flow::Continue)
///     }
/// }
/// ```
pub trait EnvMiddleware: Send + Sync + 'static {
    /// Tag used in trace events.
    fn name(&self) -> &str;

    fn before(&self, _env: &mut Environment) -> Result<Flow, Error> {
        Ok(Flow::Continue)
    }

    fn after(&self, _env: &mut Environment) -> Result<(), Error> {
        Ok(())
    }
}

fn project_header_map(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for name in map.keys() {
        let values = map.get_all(name).iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        headers.insert(name.as_str().to_owned(), values);
    }
    headers
}

fn header_name(name: &str) -> Result<HeaderName, Error> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader { name: name.to_owned() })
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let n = header_name(name)?;
    let v = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader { name: name.to_owned() })?;
    Ok((n, v))
}
