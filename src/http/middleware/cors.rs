//! CORS.

use crate::http::{HttpRequest, HttpResponse};

const ALLOW_METHODS: &str = "Access-Control-Allow-Methods: GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers: *";
const MAX_AGE: &str = "Access-Control-Max-Age: 600";
const VARY_ORIGIN: &str = "Vary: Origin";
const ALLOW_ANY_ORIGIN: &str = "Access-Control-Allow-Origin: *";

/// Allowed origins and their precomputed response lines
///
/// Header lines must be `'static`; each configured origin's line is leaked
/// once at startup, so the cost is bounded by the configuration.
pub struct CorsPolicy {
    origins: Vec<(String, &'static str)>,
    allow_any: bool,
}

impl CorsPolicy {
    pub fn new(origins: &[String]) -> Self {
        let allow_any = origins.iter().any(|o| o == "*");
        let origins = origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .map(|origin| {
                let line: &'static str =
                    Box::leak(format!("Access-Control-Allow-Origin: {origin}").into_boxed_str());
                (origin.clone(), line)
            })
            .collect();
        Self { origins, allow_any }
    }

    /// Whether CORS handling is on at all
    pub fn is_enabled(&self) -> bool {
        self.allow_any || !self.origins.is_empty()
    }

    fn allow_line(&self, origin: &str) -> Option<&'static str> {
        if self.allow_any {
            return Some(ALLOW_ANY_ORIGIN);
        }
        self.origins
            .iter()
            .find(|(o, _)| o == origin)
            .map(|(_, line)| *line)
    }

    /// Answer a preflight request, or `None` if `req` is not one
    pub fn preflight(&self, req: &HttpRequest, request_id: &str) -> Option<HttpResponse> {
        if !self.is_enabled()
            || req.method != "OPTIONS"
            || req.header("access-control-request-method").is_none()
        {
            return None;
        }
        let origin = req.header("origin")?;

        Some(match self.allow_line(origin) {
            Some(line) => HttpResponse::empty(200)
                .with_header(line)
                .with_header(ALLOW_METHODS)
                .with_header(ALLOW_HEADERS)
                .with_header(MAX_AGE)
                .with_header(VARY_ORIGIN),
            None => HttpResponse::error(400, "Disallowed CORS origin", request_id),
        })
    }

    /// Add the allow-origin headers to a normal response
    pub fn decorate(&self, req: &HttpRequest, resp: &mut HttpResponse) {
        if !self.is_enabled() {
            return;
        }
        if let Some(line) = req.header("origin").and_then(|o| self.allow_line(o)) {
            resp.headers.push(line);
            if !self.allow_any {
                resp.headers.push(VARY_ORIGIN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(&["https://app.example".to_string()])
    }

    fn preflight_from(origin: &str) -> HttpRequest {
        HttpRequest::new("OPTIONS", "/tasks/")
            .with_header("Origin", origin)
            .with_header("Access-Control-Request-Method", "POST")
    }

    #[test]
    fn test_allowed_preflight() {
        let resp = policy()
            .preflight(&preflight_from("https://app.example"), "rid")
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.header("access-control-allow-origin"),
            Some("https://app.example")
        );
        assert_eq!(resp.header("access-control-max-age"), Some("600"));
    }

    #[test]
    fn test_disallowed_preflight() {
        let resp = policy()
            .preflight(&preflight_from("https://evil.example"), "rid")
            .unwrap();
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn test_plain_options_is_not_a_preflight() {
        let req =
            HttpRequest::new("OPTIONS", "/tasks/").with_header("Origin", "https://app.example");
        assert!(policy().preflight(&req, "rid").is_none());
    }

    #[test]
    fn test_disabled_policy_does_nothing() {
        let policy = CorsPolicy::new(&[]);
        assert!(policy.preflight(&preflight_from("https://app.example"), "rid").is_none());
        let mut resp = HttpResponse::empty(200);
        policy.decorate(&preflight_from("https://app.example"), &mut resp);
        assert!(resp.headers.is_empty());
    }

    #[test]
    fn test_decorate_only_matching_origin() {
        let policy = policy();
        let mut resp = HttpResponse::empty(200);
        policy.decorate(
            &HttpRequest::new("GET", "/tasks/").with_header("Origin", "https://app.example"),
            &mut resp,
        );
        assert_eq!(resp.header("vary"), Some("Origin"));

        let mut other = HttpResponse::empty(200);
        policy.decorate(
            &HttpRequest::new("GET", "/tasks/").with_header("Origin", "https://evil.example"),
            &mut other,
        );
        assert!(other.headers.is_empty());
    }
}
