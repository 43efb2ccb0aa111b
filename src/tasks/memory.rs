//! In-memory task repository for tests.

use super::model::{Task, TaskFilter, TaskIn};
use super::repository::TaskRepository;
use crate::LifeError;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// `TaskRepository` over a `BTreeMap`, with the same filtering semantics as SQL
#[derive(Default)]
pub struct InMemoryTaskRepository {
    state: Mutex<State>,
    failing: bool,
}

#[derive(Default)]
struct State {
    next_id: i32,
    tasks: BTreeMap<i32, Task>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every call fails, for exercising error paths
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, LifeError> {
        if self.failing {
            return Err(LifeError::Other("storage unavailable".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| LifeError::Other("task store lock poisoned".to_string()))
    }
}

fn matches(task: &Task, filter: &TaskFilter) -> bool {
    if let Some(term) = filter.search_term() {
        let term = term.to_lowercase();
        let in_title = task.title.to_lowercase().contains(&term);
        let in_description = task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&term));
        if !in_title && !in_description {
            return false;
        }
    }
    if filter.tag.is_some() && task.tag != filter.tag {
        return false;
    }
    filter.completed.map_or(true, |c| task.completed == c)
}

impl TaskRepository for InMemoryTaskRepository {
    fn create(&self, input: &TaskIn) -> Result<Task, LifeError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let task = Task {
            id: state.next_id,
            title: input.title.clone(),
            description: input.description.clone(),
            tag: input.tag.clone(),
            completed: false,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, LifeError> {
        let state = self.lock()?;
        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        Ok(state
            .tasks
            .values()
            .filter(|task| matches(task, filter))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get(&self, id: i32) -> Result<Option<Task>, LifeError> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    fn update(&self, id: i32, input: &TaskIn) -> Result<Option<Task>, LifeError> {
        let mut state = self.lock()?;
        Ok(state.tasks.get_mut(&id).map(|task| {
            task.title = input.title.clone();
            task.description = input.description.clone();
            task.tag = input.tag.clone();
            task.clone()
        }))
    }

    fn complete(&self, id: i32) -> Result<Option<Task>, LifeError> {
        let mut state = self.lock()?;
        Ok(state.tasks.get_mut(&id).map(|task| {
            task.completed = true;
            task.clone()
        }))
    }

    fn delete(&self, id: i32) -> Result<bool, LifeError> {
        Ok(self.lock()?.tasks.remove(&id).is_some())
    }
}
