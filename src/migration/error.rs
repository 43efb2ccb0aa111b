//! Migration-specific error types

use crate::transaction::TransactionError;
use crate::LifeError;

/// Migration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Database execution error outside of a revision script
    #[error("Database error: {0}")]
    Database(#[from] LifeError),
    /// The advisory lock was still held elsewhere when the timeout ran out
    #[error(
        "Migration lock timeout: lock {key} not acquired within {seconds} seconds. \
         Another instance may be running migrations."
    )]
    LockTimeout { key: i64, seconds: u64 },
    /// The advisory lock could not be taken or released
    #[error("Migration lock error: {0}")]
    Lock(String),
    /// A revision's upgrade or downgrade failed and was rolled back
    #[error("Revision {revision} failed: {source}")]
    ScriptFailed {
        revision: String,
        #[source]
        source: LifeError,
    },
    /// A revision id (from the version table or a target) is not in the chain
    #[error("Unknown revision: {0}")]
    UnknownRevision(String),
    /// The revision set does not form a single linear chain
    #[error("Invalid revision chain: {0}")]
    InvalidChain(String),
    /// Upgrade target is older than the applied version
    #[error("Cannot upgrade to {target}: database is already at {current}")]
    TargetBehind { current: String, target: String },
    /// Downgrade target is newer than the applied version
    #[error("Cannot downgrade to {target}: database is only at {current}")]
    TargetAhead { current: String, target: String },
}

impl From<TransactionError> for MigrationError {
    fn from(error: TransactionError) -> Self {
        MigrationError::Database(error.into())
    }
}
