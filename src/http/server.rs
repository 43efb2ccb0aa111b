//! `may_minihttp` transport.

use super::{App, HttpRequest, HttpResponse};
use may_minihttp::{HttpServer, HttpService, Request, Response};
use std::io::{self, Read};
use std::sync::Arc;

/// One clone per connection, all sharing the same [`App`]
#[derive(Clone)]
pub struct TaskService {
    app: Arc<App>,
}

impl TaskService {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }
}

impl HttpService for TaskService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = read_request(req, self.app.max_body_bytes())?;
        let response = self.app.handle(request);
        write_response(&response, res);
        Ok(())
    }
}

/// Copy a request off the connection buffer
///
/// At most `max_body_bytes + 1` body bytes are read; anything beyond marks the
/// request as oversized instead of being buffered.
fn read_request(req: Request, max_body_bytes: usize) -> io::Result<HttpRequest> {
    let mut request = HttpRequest::new(req.method(), req.path());
    for header in req.headers() {
        request = request.with_header(header.name, &String::from_utf8_lossy(header.value));
    }

    let limit = u64::try_from(max_body_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut body = Vec::new();
    req.body().take(limit).read_to_end(&mut body)?;
    if body.len() > max_body_bytes {
        body.truncate(max_body_bytes);
        request.body_exceeded_limit = true;
    }
    request.body = body;
    Ok(request)
}

fn write_response(response: &HttpResponse, res: &mut Response) {
    res.status_code(usize::from(response.status), response.reason());
    for line in response.header_lines() {
        res.header(line);
    }
    res.body_mut().extend_from_slice(&response.body);
}

/// Start serving on `addr` and return the server thread handle
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub fn serve(app: Arc<App>, addr: &str) -> io::Result<may::coroutine::JoinHandle<()>> {
    let handle = HttpServer(TaskService::new(app)).start(addr)?;
    tracing::info!("listening on http://{addr}");
    Ok(handle)
}
