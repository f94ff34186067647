//! # strata
//!
//! A minimal HTTP framework built around one idea: an ordered, immutable
//! pipeline of middleware wrapped around a router.
//!
//! ## The contract
//!
//! Every request walks the pipeline outermost-first, reaches the router, and
//! walks back innermost-first:
//!
//! ```text
//! A.before → B.before → router → B.after → A.after
//! ```
//!
//! Two middleware flavors share that contract and mix freely in one chain:
//! typed units ([`middleware::Middleware`]) and adapter units that see a
//! string-keyed environment ([`middleware::EnvMiddleware`]). A unit may
//! short-circuit the walk with its own response. Faults are plain `Err`s
//! and are never caught on the way out.
//!
//! The crate ships a todo CRUD API ([`todo`]) as the terminal handler.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use strata::middleware::{HeaderLogger, ScopeLogger};
//! use strata::todo::{self, MemoryRepository};
//! use strata::{Pipeline, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let repo = Arc::new(MemoryRepository::new());
//!
//!     let app = Pipeline::new(todo::routes(repo))
//!         .layer(ScopeLogger::new("core"))
//!         .adapter(HeaderLogger);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod config;
pub mod logging;
pub mod middleware;
pub mod todo;

pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use middleware::Pipeline;
pub use request::{Parts, Request};
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, DEFAULT_BODY_LIMIT};
pub use status::Status;
