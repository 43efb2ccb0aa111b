//! # tasktrack
//!
//! Task tracking service on PostgreSQL, built on the `may` coroutine runtime.
//!
//! - [`migration`]: revision chain, version table and advisory-locked startup runs
//! - [`tasks`]: the task model and its storage
//! - [`http`]: routes and middleware served through `may_minihttp`
//! - [`pool`], [`executor`], [`transaction`]: database access over `may_postgres`

pub mod config;
pub mod connection;
pub mod executor;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod migration;
pub mod pool;
pub mod query;
pub mod revisions;
pub mod tasks;
pub mod transaction;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use config::AppConfig;
pub use connection::{connect, validate_connection_string, ConnectionError};
pub use executor::{LifeError, LifeExecutor, MayPostgresExecutor};
pub use pool::{DbPool, PoolError};
pub use transaction::{Transaction, TransactionError};
