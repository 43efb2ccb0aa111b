//! Request body size limit.

use crate::http::HttpRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyCheck {
    Ok,
    TooLarge,
    /// `Content-Length` is not a number
    InvalidLength(String),
}

/// Reject bodies above `max_bytes`, by declared length or by what was read
pub fn check(req: &HttpRequest, max_bytes: usize) -> BodyCheck {
    match req.content_length() {
        Err(raw) => BodyCheck::InvalidLength(raw),
        Ok(Some(declared)) if declared > max_bytes => BodyCheck::TooLarge,
        Ok(_) if req.body_exceeded_limit || req.body.len() > max_bytes => BodyCheck::TooLarge,
        Ok(_) => BodyCheck::Ok,
    }
}
