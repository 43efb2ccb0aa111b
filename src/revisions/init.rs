//! Revision: init
//! Revision ID: d2fd140158f0
//! Revises: <base>
//! Description: Creates the task table with single-column indexes

use crate::migration::{Revision, SchemaManager};
use crate::LifeError;
use sea_query::{ColumnDef, Index, Table};

pub struct Init;

/// Single-column indexes created with the table.
const INDEXES: &[(&str, &str)] = &[
    ("ix_task_completed", "completed"),
    ("ix_task_tag", "tag"),
    ("ix_task_title", "title"),
];

impl Revision for Init {
    fn id(&self) -> &str {
        "d2fd140158f0"
    }

    fn down_revision(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> &str {
        "init"
    }

    fn upgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
        // Assumes an empty schema; an existing `task` table fails the revision.
        let table = Table::create()
            .table("task")
            .col(
                ColumnDef::new("id")
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new("title").string_len(200).not_null())
            .col(ColumnDef::new("description").string_len(2000).null())
            .col(ColumnDef::new("tag").string_len(50).null())
            .col(ColumnDef::new("completed").boolean().not_null())
            .to_owned();
        manager.create_table(table)?;

        for (name, column) in INDEXES {
            let index = Index::create()
                .name(*name)
                .table("task")
                .col(*column)
                .to_owned();
            manager.create_index(index)?;
        }
        Ok(())
    }

    fn downgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
        for (name, _) in INDEXES.iter().rev() {
            manager.drop_index_if_exists(name)?;
        }
        manager.drop_table(Table::drop().table("task").to_owned())
    }
}
