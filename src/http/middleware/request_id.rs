//! Request ids.

use uuid::Uuid;

pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Use the client's `X-Request-Id` if it is sane, otherwise mint a UUID v4
///
/// Accepted ids are 1 to 128 visible ASCII characters, so they can go into
/// log lines and JSON bodies unchanged.
pub fn resolve(header: Option<&str>) -> String {
    match header.map(str::trim) {
        Some(id) if is_valid(id) => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

fn is_valid(id: &str) -> bool {
    (1..=MAX_REQUEST_ID_LEN).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_graphic())
}
