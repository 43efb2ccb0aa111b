//! Route handlers.

use super::response::{HttpResponse, CONTENT_TYPE_METRICS};
use super::router::Route;
use super::HttpRequest;
use crate::metrics::Metrics;
use crate::tasks::{TaskFilter, TaskIn, TaskRepository};
use crate::LifeError;
use serde_json::json;

/// Handler failure, rendered as `{"detail": ...}`
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    Unprocessable(String),
    #[error("storage error: {0}")]
    Storage(#[from] LifeError),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl HandlerError {
    pub fn into_response(self, request_id: &str) -> HttpResponse {
        match self {
            HandlerError::NotFound(detail) => HttpResponse::error(404, detail, request_id),
            HandlerError::MethodNotAllowed => {
                HttpResponse::error(405, "Method Not Allowed", request_id)
            }
            HandlerError::Unprocessable(detail) => HttpResponse::error(422, &detail, request_id),
            error @ (HandlerError::Storage(_) | HandlerError::Metrics(_)) => {
                tracing::error!(request_id, error = %error, "request failed");
                HttpResponse::error(500, "Internal Server Error", request_id)
            }
        }
    }
}

type HandlerResult = Result<HttpResponse, HandlerError>;

const TASK_NOT_FOUND: &str = "Task not found";

/// Run the handler for `route`
pub fn dispatch(
    repo: &dyn TaskRepository,
    metrics: &Metrics,
    req: &HttpRequest,
    route: &Route,
) -> HandlerResult {
    if !route.allows(&req.method) {
        return Err(HandlerError::MethodNotAllowed);
    }

    match (route, req.method.as_str()) {
        (Route::Health, _) => Ok(HttpResponse::json(200, &json!({ "status": "ok" }))),
        (Route::Metrics, _) => Ok(HttpResponse {
            status: 200,
            headers: vec![CONTENT_TYPE_METRICS],
            body: metrics.render()?,
        }),
        (Route::Tasks, "POST") => create_task(repo, req),
        (Route::Tasks, _) => list_tasks(repo, req),
        (Route::Task(id), "GET") => get_task(repo, parse_id(id)?),
        (Route::Task(id), "PUT") => update_task(repo, parse_id(id)?, req),
        (Route::Task(id), _) => delete_task(repo, parse_id(id)?),
        (Route::CompleteTask(id), _) => complete_task(repo, parse_id(id)?),
    }
}

fn parse_id(raw: &str) -> Result<i32, HandlerError> {
    raw.parse().map_err(|_| {
        HandlerError::Unprocessable(format!("task_id: {raw:?} is not a valid integer"))
    })
}

fn parse_body(req: &HttpRequest) -> Result<TaskIn, HandlerError> {
    let input: TaskIn = serde_json::from_slice(&req.body)
        .map_err(|e| HandlerError::Unprocessable(format!("body: {e}")))?;
    input
        .validate()
        .map_err(|e| HandlerError::Unprocessable(e.to_string()))?;
    Ok(input)
}

fn create_task(repo: &dyn TaskRepository, req: &HttpRequest) -> HandlerResult {
    let input = parse_body(req)?;
    let task = repo.create(&input)?;
    tracing::debug!(task_id = task.id, "task created");
    Ok(HttpResponse::json(201, &task))
}

fn list_tasks(repo: &dyn TaskRepository, req: &HttpRequest) -> HandlerResult {
    let filter = TaskFilter::from_query(&req.query)
        .map_err(|e| HandlerError::Unprocessable(e.to_string()))?;
    let tasks = repo.list(&filter)?;
    Ok(HttpResponse::json(200, &tasks))
}

fn get_task(repo: &dyn TaskRepository, id: i32) -> HandlerResult {
    let task = repo.get(id)?.ok_or(HandlerError::NotFound(TASK_NOT_FOUND))?;
    Ok(HttpResponse::json(200, &task))
}

fn update_task(repo: &dyn TaskRepository, id: i32, req: &HttpRequest) -> HandlerResult {
    let input = parse_body(req)?;
    let task = repo
        .update(id, &input)?
        .ok_or(HandlerError::NotFound(TASK_NOT_FOUND))?;
    Ok(HttpResponse::json(200, &task))
}

fn complete_task(repo: &dyn TaskRepository, id: i32) -> HandlerResult {
    let task = repo
        .complete(id)?
        .ok_or(HandlerError::NotFound(TASK_NOT_FOUND))?;
    Ok(HttpResponse::json(200, &task))
}

fn delete_task(repo: &dyn TaskRepository, id: i32) -> HandlerResult {
    if repo.delete(id)? {
        Ok(HttpResponse::empty(204))
    } else {
        Err(HandlerError::NotFound(TASK_NOT_FOUND))
    }
}
