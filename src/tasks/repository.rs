//! Task storage seam.

use super::model::{Task, TaskFilter, TaskIn};
use crate::LifeError;

/// Storage for tasks
///
/// The HTTP handlers only see this trait; the Postgres implementation backs
/// the service and an in-memory one backs handler tests.
pub trait TaskRepository: Send + Sync {
    /// Insert a new, not completed task
    fn create(&self, input: &TaskIn) -> Result<Task, LifeError>;

    /// Tasks matching `filter`, ordered by id
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, LifeError>;

    fn get(&self, id: i32) -> Result<Option<Task>, LifeError>;

    /// Replace title, description and tag; `completed` is left alone
    fn update(&self, id: i32, input: &TaskIn) -> Result<Option<Task>, LifeError>;

    /// Mark a task completed
    fn complete(&self, id: i32) -> Result<Option<Task>, LifeError>;

    /// `true` if a task was deleted
    fn delete(&self, id: i32) -> Result<bool, LifeError>;
}
