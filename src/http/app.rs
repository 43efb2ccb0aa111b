//! The request pipeline.

use super::handlers::{self, HandlerError};
use super::middleware::{
    body_limit, client_key, request_id, BodyCheck, CorsPolicy, FixedWindowLimiter, RateDecision,
    SECURITY_HEADERS,
};
use super::router::Route;
use super::{HttpRequest, HttpResponse};
use crate::config::AppConfig;
use crate::metrics::{HttpMetrics, Metrics};
use crate::tasks::TaskRepository;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metrics label for paths that match no route.
const UNMATCHED_HANDLER: &str = "none";

/// Everything a request needs, shared by all connections
pub struct App {
    repo: Arc<dyn TaskRepository>,
    metrics: Arc<Metrics>,
    cors: CorsPolicy,
    limiter: FixedWindowLimiter,
    max_body_bytes: usize,
    retry_after: &'static str,
}

impl App {
    pub fn new(repo: Arc<dyn TaskRepository>, metrics: Arc<Metrics>, config: &AppConfig) -> Self {
        let limits = &config.limits;
        let limiter = FixedWindowLimiter::new(
            Duration::from_secs(limits.rate_limit_window_seconds),
            limits.rate_limit_max_requests,
            limits.rate_limit_max_clients,
        );
        let retry_after: &'static str =
            Box::leak(format!("Retry-After: {}", limiter.window_secs()).into_boxed_str());

        Self {
            repo,
            metrics,
            cors: CorsPolicy::new(&config.cors.origins()),
            limiter,
            max_body_bytes: limits.max_body_bytes,
            retry_after,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Run `req` through the middleware chain and its handler
    pub fn handle(&self, req: HttpRequest) -> HttpResponse {
        // Handlers can yield on database I/O, so the id goes on each event
        // rather than into an entered span.
        let request_id = request_id::resolve(req.header("x-request-id"));

        let start = Instant::now();
        let route = Route::resolve(&req.path);
        let handler = route.as_ref().map_or(UNMATCHED_HANDLER, Route::template);
        let in_flight = HttpMetrics::is_instrumented(handler)
            .then(|| self.metrics.http.start(&req.method, handler));

        let mut resp = self.guarded(&req, route.as_ref(), &request_id);
        resp.headers.push(SECURITY_HEADERS);

        let elapsed = start.elapsed();
        if let Some(in_flight) = in_flight {
            in_flight.finish(resp.status, elapsed);
        }
        tracing::info!(
            request_id = %request_id,
            method = %req.method,
            path = %req.path,
            status_code = resp.status,
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            "request completed"
        );
        resp
    }

    /// CORS, body limit and rate limit around the handler
    fn guarded(&self, req: &HttpRequest, route: Option<&Route>, request_id: &str) -> HttpResponse {
        if let Some(preflight) = self.cors.preflight(req, request_id) {
            return preflight;
        }

        let mut resp = self.limited(req, route, request_id);
        self.cors.decorate(req, &mut resp);
        resp
    }

    fn limited(&self, req: &HttpRequest, route: Option<&Route>, request_id: &str) -> HttpResponse {
        match body_limit::check(req, self.max_body_bytes) {
            BodyCheck::Ok => {}
            BodyCheck::TooLarge => {
                return HttpResponse::error(413, "Request too large", request_id);
            }
            BodyCheck::InvalidLength(raw) => {
                return HttpResponse::error(
                    400,
                    &format!("Invalid Content-Length: {raw:?}"),
                    request_id,
                );
            }
        }

        let key = client_key(req);
        if self.limiter.check(&key) == RateDecision::Limited {
            tracing::warn!(request_id, client = %key, "rate limit exceeded");
            return HttpResponse::error(429, "Too Many Requests", request_id)
                .with_header(self.retry_after);
        }

        let result = match route {
            Some(route) => handlers::dispatch(self.repo.as_ref(), &self.metrics, req, route),
            None => Err(HandlerError::NotFound("Not Found")),
        };
        result.unwrap_or_else(|e| e.into_response(request_id))
    }
}
