//! Transport-independent request.

/// A fully read request
///
/// Header names are stored lower-cased. The body is capped at the configured
/// limit while reading; `body_exceeded_limit` records whether more was sent.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub body_exceeded_limit: bool,
}

impl HttpRequest {
    /// Build a request from a method and a request target (`/path?query`)
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            query: query.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `Content-Length` as sent by the client
    ///
    /// `Err` carries the raw value when it is not a non-negative integer.
    /// A decimal value too wide for `usize` saturates to `usize::MAX`.
    pub fn content_length(&self) -> Result<Option<usize>, String> {
        let Some(raw) = self.header("content-length") else {
            return Ok(None);
        };
        let digits = raw.trim();
        match digits.parse() {
            Ok(length) => Ok(Some(length)),
            Err(_) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(Some(usize::MAX))
            }
            Err(_) => Err(raw.to_string()),
        }
    }
}
