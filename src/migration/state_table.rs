//! Applied-version table management
//!
//! `tasktrack_version` holds at most one row: the id of the most recently
//! applied revision. No row means nothing has been applied.

use crate::migration::MigrationError;
use crate::{LifeError, LifeExecutor};

/// Name of the version table
pub const VERSION_TABLE: &str = "tasktrack_version";

/// Create the version table if it does not exist yet
pub fn initialize_state_table(executor: &dyn LifeExecutor) -> Result<(), LifeError> {
    let sql = r#"
        CREATE TABLE IF NOT EXISTS tasktrack_version (
            version_num VARCHAR(32) NOT NULL,
            CONSTRAINT tasktrack_version_pkc PRIMARY KEY (version_num)
        )
    "#;
    executor.execute(sql, &[])?;
    Ok(())
}

/// Read the applied version
///
/// # Errors
///
/// Returns `MigrationError::Database` if the query fails or the table holds
/// more than one row.
pub fn read_version(executor: &dyn LifeExecutor) -> Result<Option<String>, MigrationError> {
    let rows = executor.query_all("SELECT version_num FROM tasktrack_version", &[])?;
    match rows.as_slice() {
        [] => Ok(None),
        [row] => Ok(Some(row.try_get::<_, String>(0).map_err(LifeError::from)?)),
        _ => Err(MigrationError::Database(LifeError::ParseError(format!(
            "{VERSION_TABLE} holds {} rows, expected at most one",
            rows.len()
        )))),
    }
}

/// Record `version` as applied, or clear the table when `version` is `None`
pub fn write_version(executor: &dyn LifeExecutor, version: Option<&str>) -> Result<(), LifeError> {
    match version {
        None => {
            executor.execute("DELETE FROM tasktrack_version", &[])?;
        }
        Some(version) => {
            let updated =
                executor.execute("UPDATE tasktrack_version SET version_num = $1", &[&version])?;
            if updated == 0 {
                executor.execute(
                    "INSERT INTO tasktrack_version (version_num) VALUES ($1)",
                    &[&version],
                )?;
            }
        }
    }
    Ok(())
}
