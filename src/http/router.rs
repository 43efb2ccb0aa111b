//! Path routing.

/// A matched route
///
/// Ids are kept as raw path segments; handlers reject ones that are not integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    Metrics,
    Tasks,
    Task(String),
    CompleteTask(String),
}

impl Route {
    /// Match a request path; a trailing slash is optional
    pub fn resolve(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let mut segments = trimmed.split('/').skip(1);
        let route = match (segments.next(), segments.next(), segments.next()) {
            (Some("health"), None, None) => Route::Health,
            (Some("metrics"), None, None) => Route::Metrics,
            (Some("tasks"), None, None) => Route::Tasks,
            (Some("tasks"), Some(id), None) if !id.is_empty() => Route::Task(id.to_string()),
            (Some("tasks"), Some(id), Some("complete")) if !id.is_empty() => {
                Route::CompleteTask(id.to_string())
            }
            _ => return None,
        };
        if segments.next().is_some() {
            return None;
        }
        Some(route)
    }

    /// Route template, used as the metrics `handler` label
    pub fn template(&self) -> &'static str {
        match self {
            Route::Health => "/health",
            Route::Metrics => "/metrics",
            Route::Tasks => "/tasks/",
            Route::Task(_) => "/tasks/{task_id}",
            Route::CompleteTask(_) => "/tasks/{task_id}/complete",
        }
    }

    pub fn allows(&self, method: &str) -> bool {
        match self {
            Route::Health | Route::Metrics => method == "GET",
            Route::Tasks => matches!(method, "GET" | "POST"),
            Route::Task(_) => matches!(method, "GET" | "PUT" | "DELETE"),
            Route::CompleteTask(_) => method == "PATCH",
        }
    }
}
