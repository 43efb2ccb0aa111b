//! Transport-independent response.

use serde::Serialize;

pub const CONTENT_TYPE_JSON: &str = "Content-Type: application/json";
pub const CONTENT_TYPE_METRICS: &str = "Content-Type: text/plain; version=0.0.4; charset=utf-8";

/// A response ready to be written out
///
/// `may_minihttp` only accepts `'static` header lines, so headers are kept as
/// full `Name: value` lines. One entry may hold several lines joined by CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<&'static str>,
    pub body: Vec<u8>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
    request_id: &'a str,
}

impl HttpResponse {
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// JSON body; falls back to a bare 500 if `value` cannot be serialised
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                headers: vec![CONTENT_TYPE_JSON],
                body,
            },
            Err(e) => {
                tracing::error!("failed to serialise response body: {e}");
                Self::empty(500)
            }
        }
    }

    /// `{"detail": ..., "request_id": ...}`
    pub fn error(status: u16, detail: &str, request_id: &str) -> Self {
        Self::json(status, &ErrorBody { detail, request_id })
    }

    #[must_use]
    pub fn with_header(mut self, line: &'static str) -> Self {
        self.headers.push(line);
        self
    }

    /// Every header line, with joined entries split apart
    pub fn header_lines(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.headers.iter().copied().flat_map(|h| h.split("\r\n"))
    }

    /// Value of header `name` (case-insensitive), if present
    pub fn header(&self, name: &str) -> Option<&'static str> {
        self.header_lines().find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    /// Reason phrase for the status line
    pub fn reason(&self) -> &'static str {
        reason_phrase(self.status)
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body() {
        let resp = HttpResponse::error(404, "Task not found", "req-1");
        assert_eq!(resp.status, 404);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["detail"], "Task not found");
        assert_eq!(body["request_id"], "req-1");
    }

    #[test]
    fn test_joined_header_lines() {
        let resp = HttpResponse::empty(204).with_header("A: 1\r\nB: 2");
        assert_eq!(resp.header("b"), Some("2"));
        assert_eq!(resp.header_lines().count(), 2);
    }
}
