//! HTTP handlers for `/api/todo`.
//!
//! | Method | Path | Success | Failure |
//! |---|---|---|---|
//! | GET | `/api/todo` | 200 + array | none |
//! | GET | `/api/todo/{id}` | 200 + item | 404 |
//! | POST | `/api/todo` | 201 + item + `location` | 400 |
//! | PUT | `/api/todo/{id}` | 204 | 400, 404 |
//! | DELETE | `/api/todo/{id}` | 204 | none |
//!
//! `HEAD` on either GET path answers like `GET` with the body dropped; the
//! router does that for every GET route.

use std::sync::Arc;

use tracing::debug;

use super::{TodoItem, TodoRepository};
use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::router::Router;
use crate::status::Status;

type Repo = Arc<dyn TodoRepository>;

/// Builds the todo router over `repo`.
pub fn routes(repo: Repo) -> Router {
    let (r1, r2, r3, r4, r5) =
        (Arc::clone(&repo), Arc::clone(&repo), Arc::clone(&repo), Arc::clone(&repo), repo);

    Router::new()
        .on(Method::Get,    "/api/todo",      move |req: Request| list(Arc::clone(&r1), req))
        .on(Method::Get,    "/api/todo/{id}", move |req: Request| get_by_id(Arc::clone(&r2), req))
        .on(Method::Post,   "/api/todo",      move |req: Request| create(Arc::clone(&r3), req))
        .on(Method::Put,    "/api/todo/{id}", move |req: Request| update(Arc::clone(&r4), req))
        .on(Method::Delete, "/api/todo/{id}", move |req: Request| delete(Arc::clone(&r5), req))
}

// GET /api/todo
async fn list(repo: Repo, _req: Request) -> Result<Json<Vec<TodoItem>>, Error> {
    Ok(Json(repo.all()))
}

// GET /api/todo/{id}
async fn get_by_id(repo: Repo, req: Request) -> Result<Response, Error> {
    let id = req.param("id").unwrap_or_default();
    Ok(match repo.find(id) {
        Some(item) => Json(item).into_response(),
        None => Response::status(Status::NotFound),
    })
}

// POST /api/todo
async fn create(repo: Repo, req: Request) -> Result<Response, Error> {
    let Some(mut item) = read_item(&req) else {
        return Ok(Response::status(Status::BadRequest));
    };

    repo.add(&mut item);
    debug!(key = %item.key, "todo created");

    Ok(Response::builder()
        .status(Status::Created)
        .header("location", &format!("/api/todo/{}", item.key))
        .json(serde_json::to_vec(&item)?))
}

// PUT /api/todo/{id}
async fn update(repo: Repo, req: Request) -> Result<Status, Error> {
    let id = req.param("id").unwrap_or_default();
    let Some(item) = read_item(&req).filter(|item| item.key == id) else {
        return Ok(Status::BadRequest);
    };

    if repo.find(id).is_none() {
        return Ok(Status::NotFound);
    }

    repo.update(item);
    Ok(Status::NoContent)
}

// DELETE /api/todo/{id}
//
// Absent ids are not reported: deleting twice answers 204 both times.
async fn delete(repo: Repo, req: Request) -> Result<Status, Error> {
    let id = req.param("id").unwrap_or_default();
    if repo.remove(id).is_none() {
        debug!(key = id, "delete of unknown todo");
    }
    Ok(Status::NoContent)
}

/// Parses the body as a todo item. Empty, `null` and malformed bodies all
/// read as `None`.
fn read_item(req: &Request) -> Option<TodoItem> {
    if req.body().is_empty() {
        return None;
    }
    serde_json::from_slice::<Option<TodoItem>>(req.body()).ok().flatten()
}
