//! Migrator - applies and reverts revisions against a live connection

use crate::migration::{
    initialize_state_table, read_version, write_version, MigrationError, MigrationStatus,
    Revision, RevisionChain, SchemaManager, Target,
};
use crate::{LifeExecutor, MayPostgresExecutor};
use std::time::Instant;

/// Core migration execution engine
///
/// Each revision runs in its own transaction together with the version-row
/// update, so after any failure the version table names the last revision
/// that fully succeeded. The migrator does not lock; callers that may race
/// with other instances hold a [`MigrationLockGuard`](super::MigrationLockGuard)
/// around it.
pub struct Migrator {
    chain: RevisionChain,
}

impl Migrator {
    pub fn new(chain: RevisionChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &RevisionChain {
        &self.chain
    }

    /// Read the applied version, creating the version table if missing
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the table cannot be created or read.
    pub fn current_version(
        &self,
        executor: &dyn LifeExecutor,
    ) -> Result<Option<String>, MigrationError> {
        initialize_state_table(executor)?;
        read_version(executor)
    }

    /// Compare the applied version with the chain
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::UnknownRevision` if the database is at a
    /// revision this build does not know.
    pub fn status(&self, executor: &dyn LifeExecutor) -> Result<MigrationStatus, MigrationError> {
        let current = self.current_version(executor)?;
        let applied = self.chain.applied_count_at(current.as_deref())?;
        let pending = self.chain.revisions()[applied..]
            .iter()
            .map(|r| r.id().to_string())
            .collect();

        Ok(MigrationStatus {
            current,
            head: self.chain.head().map(str::to_string),
            pending,
        })
    }

    /// Apply every revision after the current version up to and including `target`
    ///
    /// Returns the number of revisions applied; 0 when already at `target`.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::TargetBehind` if `target` is older than the
    /// applied version, and `MigrationError::ScriptFailed` if a revision fails.
    /// Revisions applied before the failure stay applied.
    pub fn upgrade_to(
        &self,
        executor: &MayPostgresExecutor,
        target: &Target,
    ) -> Result<usize, MigrationError> {
        let current = self.current_version(executor)?;
        let from = self.chain.applied_count_at(current.as_deref())?;
        let to = self.chain.applied_count(target)?;

        if to < from {
            return Err(MigrationError::TargetBehind {
                current: current.unwrap_or_else(|| "base".to_string()),
                target: target.to_string(),
            });
        }
        if to == from {
            log::debug!("already at {}", current.as_deref().unwrap_or("base"));
            return Ok(0);
        }

        for revision in &self.chain.revisions()[from..to] {
            self.apply(executor, revision.as_ref())?;
        }

        Ok(to - from)
    }

    /// Revert every revision after `target`, newest first
    ///
    /// Returns the number of revisions reverted.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::TargetAhead` if `target` is newer than the
    /// applied version, and `MigrationError::ScriptFailed` if a downgrade fails.
    pub fn downgrade_to(
        &self,
        executor: &MayPostgresExecutor,
        target: &Target,
    ) -> Result<usize, MigrationError> {
        let current = self.current_version(executor)?;
        let from = self.chain.applied_count_at(current.as_deref())?;
        let to = self.chain.applied_count(target)?;

        if to > from {
            return Err(MigrationError::TargetAhead {
                current: current.unwrap_or_else(|| "base".to_string()),
                target: target.to_string(),
            });
        }

        for revision in self.chain.revisions()[to..from].iter().rev() {
            self.revert(executor, revision.as_ref())?;
        }

        Ok(from - to)
    }

    fn apply(
        &self,
        executor: &MayPostgresExecutor,
        revision: &dyn Revision,
    ) -> Result<(), MigrationError> {
        log::info!(
            "Running upgrade {} -> {}, {}",
            revision.down_revision().unwrap_or("<base>"),
            revision.id(),
            revision.description()
        );
        let start = Instant::now();

        let tx = executor.begin()?;
        revision
            .upgrade(&SchemaManager::new(&tx))
            .map_err(|source| MigrationError::ScriptFailed {
                revision: revision.id().to_string(),
                source,
            })?;
        write_version(&tx, Some(revision.id()))?;
        tx.commit()?;

        log::debug!("revision {} applied in {:?}", revision.id(), start.elapsed());
        Ok(())
    }

    fn revert(
        &self,
        executor: &MayPostgresExecutor,
        revision: &dyn Revision,
    ) -> Result<(), MigrationError> {
        log::info!(
            "Running downgrade {} -> {}, {}",
            revision.id(),
            revision.down_revision().unwrap_or("<base>"),
            revision.description()
        );

        let tx = executor.begin()?;
        revision
            .downgrade(&SchemaManager::new(&tx))
            .map_err(|source| MigrationError::ScriptFailed {
                revision: revision.id().to_string(),
                source,
            })?;
        write_version(&tx, revision.down_revision())?;
        tx.commit()?;
        Ok(())
    }
}
