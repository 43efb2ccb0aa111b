//! Schema migrations
//!
//! Revisions form one linear chain, applied in order and recorded in the
//! `tasktrack_version` table. Concurrent starts are serialised with a
//! PostgreSQL advisory lock.
//!
//! # Example
//!
//! ```rust,no_run
//! use tasktrack::migration::{Revision, SchemaManager};
//! use tasktrack::LifeError;
//! use sea_query::{ColumnDef, Table};
//!
//! pub struct CreateLabels;
//!
//! impl Revision for CreateLabels {
//!     fn id(&self) -> &str {
//!         "5be0c2a1f7d3"
//!     }
//!
//!     fn down_revision(&self) -> Option<&str> {
//!         Some("3aa1b4305414")
//!     }
//!
//!     fn description(&self) -> &str {
//!         "create labels"
//!     }
//!
//!     fn upgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
//!         let table = Table::create()
//!             .table("label")
//!             .col(ColumnDef::new("id").integer().not_null().auto_increment().primary_key())
//!             .col(ColumnDef::new("name").string_len(50).not_null())
//!             .to_owned();
//!         manager.create_table(table)
//!     }
//!
//!     fn downgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError> {
//!         manager.drop_table(Table::drop().table("label").to_owned())
//!     }
//! }
//! ```

pub mod error;
pub mod lock;
pub mod migrator;
pub mod revision;
pub mod schema_manager;
pub mod startup;
pub mod state_table;
pub mod status;

pub use error::MigrationError;
pub use lock::{AdvisoryLock, MigrationLockGuard, PgAdvisoryLock, DEFAULT_LOCK_KEY};
pub use migrator::Migrator;
pub use revision::{Revision, RevisionChain, Target};
pub use schema_manager::SchemaManager;
pub use startup::{
    run_startup_migrations, startup_migrations, startup_migrations_with_lock, StartupError,
    StartupOutcome,
};
pub use state_table::{initialize_state_table, read_version, write_version, VERSION_TABLE};
pub use status::MigrationStatus;
