//! Tasks: the service's one resource.

#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repository;

#[cfg(any(test, feature = "mock"))]
pub use memory::InMemoryTaskRepository;
pub use model::{Task, TaskFilter, TaskIn, ValidationError};
pub use postgres::PgTaskRepository;
pub use repository::TaskRepository;
