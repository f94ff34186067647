//! strata server entry point.
//!
//! Composition root: loads configuration, owns the repository, and builds
//! the middleware pipeline around the todo API.
//!
//! Try:
//!   curl http://localhost:3000/api/todo
//!   curl -X POST http://localhost:3000/api/todo \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"Buy milk","isComplete":false}'

use std::sync::Arc;

use strata::middleware::{HeaderLogger, RequestId, ScopeLogger};
use strata::todo::{self, MemoryRepository, TodoRepository};
use strata::{logging, Config, Error, Pipeline, Server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;
    let _log_guard = logging::init(&config)?;

    info!(
        bind_addr = %config.bind_addr,
        seed = config.seed,
        log_dir = %config.log_dir.display(),
        max_body_bytes = config.max_body_bytes,
        "configuration loaded"
    );

    let repo: Arc<dyn TodoRepository> = if config.seed {
        Arc::new(MemoryRepository::new())
    } else {
        Arc::new(MemoryRepository::empty())
    };

    // Order matters: RequestId > core > header-logger > router > header-logger > core > RequestId
    let app = Pipeline::new(todo::routes(repo))
        .layer(RequestId)
        .layer(ScopeLogger::new("core"))
        .adapter(HeaderLogger);

    Server::from_addr(config.bind_addr)
        .body_limit(config.max_body_bytes)
        .serve(app)
        .await
}
