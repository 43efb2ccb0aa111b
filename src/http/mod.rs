//! HTTP API
//!
//! Transport-independent request handling lives in [`App`]; [`server`] adapts
//! it to `may_minihttp`.

pub mod app;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use app::App;
pub use handlers::HandlerError;
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use router::Route;
pub use server::{serve, TaskService};
