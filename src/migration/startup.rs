//! Startup-time migration run
//!
//! Called once from `main` before the HTTP server starts. With migrations
//! enabled, the process takes the advisory lock, brings the schema to head and
//! releases the lock; any failure is fatal and the server never starts.

use crate::config::{AppConfig, MigrationConfig};
use crate::connection::{connect, ConnectionError};
use crate::migration::{
    AdvisoryLock, MigrationError, MigrationLockGuard, Migrator, PgAdvisoryLock, Target,
};
use crate::revisions::task_revisions;
use crate::MayPostgresExecutor;
use std::time::Duration;

/// What the startup run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Migrations are disabled by configuration
    Skipped,
    /// The schema is at head; `applied` revisions were run by this process
    Migrated {
        applied: usize,
        version: Option<String>,
    },
}

/// Startup failures; all of them are fatal
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(&'static str),
    #[error("Could not connect to the database: {0}")]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Run migrations on application startup
///
/// # Example
///
/// ```rust,no_run
/// use tasktrack::config::AppConfig;
/// use tasktrack::migration::run_startup_migrations;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AppConfig::load()?;
///     run_startup_migrations(&config)?;
///     // Continue with application startup...
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Returns `StartupError::ConfigurationMissing` (before any connection is
/// attempted) when migrations are enabled but no database URL is configured,
/// and `Connection`/`Migration` errors from the run itself.
pub fn run_startup_migrations(config: &AppConfig) -> Result<StartupOutcome, StartupError> {
    if !config.migrations.run_on_startup {
        log::info!("migrations disabled; skipping");
        return Ok(StartupOutcome::Skipped);
    }

    let url = config
        .database_url()
        .ok_or(StartupError::ConfigurationMissing("database.url (DATABASE_URL)"))?;
    let migrator = Migrator::new(task_revisions()?);

    let executor = MayPostgresExecutor::new(connect(url)?);
    Ok(startup_migrations(&executor, &migrator, &config.migrations)?)
}

/// Lock, upgrade to head, unlock, over an existing connection
///
/// # Errors
///
/// Returns `MigrationError` if the lock cannot be taken or a revision fails.
/// The lock is released either way.
pub fn startup_migrations(
    executor: &MayPostgresExecutor,
    migrator: &Migrator,
    settings: &MigrationConfig,
) -> Result<StartupOutcome, MigrationError> {
    let lock = PgAdvisoryLock::new(executor);
    startup_migrations_with_lock(executor, migrator, &lock, settings)
}

/// [`startup_migrations`] with a caller-supplied lock implementation
///
/// # Errors
///
/// Same as [`startup_migrations`].
pub fn startup_migrations_with_lock(
    executor: &MayPostgresExecutor,
    migrator: &Migrator,
    lock: &dyn AdvisoryLock,
    settings: &MigrationConfig,
) -> Result<StartupOutcome, MigrationError> {
    log::info!("Running migrations…");
    let _guard = MigrationLockGuard::acquire(
        lock,
        settings.lock_key,
        Duration::from_secs(settings.lock_timeout_seconds),
    )?;

    let applied = migrator.upgrade_to(executor, &Target::Head)?;
    let version = migrator.current_version(executor)?;

    if applied > 0 {
        log::info!("Applied {applied} revision(s); schema is at {version:?}");
    } else {
        log::debug!("No pending revisions to apply");
    }
    log::info!("Migrations complete.");

    Ok(StartupOutcome::Migrated { applied, version })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_skips_without_database() {
        let mut config = AppConfig::default();
        config.migrations.run_on_startup = false;
        assert_eq!(
            run_startup_migrations(&config).unwrap(),
            StartupOutcome::Skipped
        );
    }

    #[test]
    fn test_missing_url_fails_before_connecting() {
        let config = AppConfig::default();
        assert!(matches!(
            run_startup_migrations(&config),
            Err(StartupError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn test_bad_url_is_a_connection_error() {
        let mut config = AppConfig::default();
        config.database.url = Some("sqlite:///./dev.db".to_string());
        assert!(matches!(
            run_startup_migrations(&config),
            Err(StartupError::Connection(ConnectionError::InvalidConnectionString(_)))
        ));
    }
}
