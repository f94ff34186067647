//! Unified error type.

/// The error type returned by strata's fallible operations.
///
/// Application-level outcomes (400, 404, 405) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures and faults raised inside the pipeline. A fault is
/// never caught by the pipeline: it unwinds through every entered unit and
/// reaches the server, which logs it and answers `500`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A header name or value written through an environment projection is
    /// not valid on the wire.
    #[error("invalid header `{name}`")]
    InvalidHeader { name: String },

    /// A middleware unit or handler gave up on the request.
    #[error("fault in `{unit}`: {message}")]
    Fault { unit: String, message: String },

    /// The rolling log file could not be opened.
    #[error("log sink: {0}")]
    LogSink(#[from] tracing_appender::rolling::InitError),

    #[error("config: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl Error {
    pub fn fault(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault { unit: unit.into(), message: message.into() }
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}
