//! Revision: add task indexes
//! Revision ID: 3aa1b4305414
//! Revises: d2fd140158f0
//! Description: Ensures the filter indexes exist, including (completed, tag)

use crate::migration::{Revision, SchemaManager};
use crate::LifeError;

pub struct AddTaskIndexes;

const INDEXES: &[(&str, &[&str])] = &[
    ("ix_task_completed", &["completed"]),
    ("ix_task_tag", &["tag"]),
    ("ix_task_completed_tag", &["completed", "tag"]),
];

impl Revision for AddTaskIndexes {
    fn id(&self) -> &str {
        "3aa1b4305414"
    }

    fn down_revision(&self) -> Option<&str> {
        Some("d2fd140158f0")
    }

    fn description(&self) -> &str {
        "add task indexes"
    }

    /// Safe to run over a schema that already has some or all of the indexes.
    fn upgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
        for (name, columns) in INDEXES {
            if manager.create_index_if_missing("task", name, columns)? {
                log::info!("created index {name}");
            }
        }
        Ok(())
    }

    fn downgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
        for (name, _) in INDEXES.iter().rev() {
            manager.drop_index_if_exists(name)?;
        }
        Ok(())
    }
}
