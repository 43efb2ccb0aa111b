//! Security headers added to every response.

/// All security headers as one CRLF-joined block
pub const SECURITY_HEADERS: &str = concat!(
    "X-Content-Type-Options: nosniff\r\n",
    "X-Frame-Options: DENY\r\n",
    "Referrer-Policy: no-referrer\r\n",
    "Permissions-Policy: geolocation=(), microphone=(), camera=()\r\n",
    "Strict-Transport-Security: max-age=63072000; includeSubDomains; preload\r\n",
    "Cross-Origin-Opener-Policy: same-origin\r\n",
    "Cross-Origin-Resource-Policy: same-site\r\n",
    "Cross-Origin-Embedder-Policy: require-corp\r\n",
    "Content-Security-Policy: default-src 'none'; connect-src 'self'; img-src 'self' data:; ",
    "script-src 'self'; style-src 'self' 'unsafe-inline'"
);
