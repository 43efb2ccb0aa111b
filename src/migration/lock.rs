//! PostgreSQL advisory locking for migration runs
//!
//! Every instance of the service takes the same session-level advisory lock
//! before touching the schema, so concurrent startups run their migrations
//! one after another. The server drops the lock by itself if the session dies.

use crate::migration::MigrationError;
use crate::LifeExecutor;
use std::time::{Duration, Instant};

/// Default key shared by every instance of the service.
pub const DEFAULT_LOCK_KEY: i64 = 777_777_777;

/// Interval between `pg_try_advisory_lock` attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Capability to take and release a cluster-wide exclusive lock
pub trait AdvisoryLock {
    /// Try once; `true` if the lock is now held by this session
    fn try_acquire(&self, key: i64) -> Result<bool, MigrationError>;

    /// Block until the lock is held
    fn acquire(&self, key: i64) -> Result<(), MigrationError>;

    /// Release a lock held by this session
    fn release(&self, key: i64) -> Result<(), MigrationError>;
}

/// `pg_advisory_lock` family over one connection
///
/// The lock belongs to the session, so this must wrap the same connection the
/// migrations run on.
pub struct PgAdvisoryLock<'a> {
    executor: &'a dyn LifeExecutor,
}

impl<'a> PgAdvisoryLock<'a> {
    pub fn new(executor: &'a dyn LifeExecutor) -> Self {
        Self { executor }
    }
}

impl AdvisoryLock for PgAdvisoryLock<'_> {
    fn try_acquire(&self, key: i64) -> Result<bool, MigrationError> {
        let row = self
            .executor
            .query_one("SELECT pg_try_advisory_lock($1)", &[&key])
            .map_err(|e| MigrationError::Lock(e.to_string()))?;
        row.try_get::<_, bool>(0)
            .map_err(|e| MigrationError::Lock(e.to_string()))
    }

    fn acquire(&self, key: i64) -> Result<(), MigrationError> {
        self.executor
            .execute("SELECT pg_advisory_lock($1)", &[&key])
            .map_err(|e| MigrationError::Lock(e.to_string()))?;
        Ok(())
    }

    fn release(&self, key: i64) -> Result<(), MigrationError> {
        let row = self
            .executor
            .query_one("SELECT pg_advisory_unlock($1)", &[&key])
            .map_err(|e| MigrationError::Lock(e.to_string()))?;
        let released: bool = row
            .try_get(0)
            .map_err(|e| MigrationError::Lock(e.to_string()))?;
        if !released {
            log::warn!("advisory lock {key} was not held by this session");
        }
        Ok(())
    }
}

/// Lock guard that releases the lock when dropped
///
/// Holds the lock for exactly as long as the guard lives, including when the
/// migration run fails and unwinds through `?`.
pub struct MigrationLockGuard<'a> {
    lock: &'a dyn AdvisoryLock,
    key: i64,
}

impl<'a> MigrationLockGuard<'a> {
    /// Acquire `key` and create a guard
    ///
    /// With a non-zero `timeout` the lock is polled every 100 ms until it is
    /// free or the timeout elapses. A zero timeout waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::LockTimeout` if the lock is still held elsewhere
    /// when the timeout runs out, or `MigrationError::Lock` if a lock query fails.
    pub fn acquire(
        lock: &'a dyn AdvisoryLock,
        key: i64,
        timeout: Duration,
    ) -> Result<Self, MigrationError> {
        let start = Instant::now();

        if timeout.is_zero() {
            lock.acquire(key)?;
        } else {
            loop {
                if lock.try_acquire(key)? {
                    break;
                }
                if start.elapsed() >= timeout {
                    return Err(MigrationError::LockTimeout {
                        key,
                        seconds: timeout.as_secs(),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }

        log::debug!("acquired migration lock {key} after {:?}", start.elapsed());
        Ok(Self { lock, key })
    }

    pub fn key(&self) -> i64 {
        self.key
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        match self.lock.release(self.key) {
            Ok(()) => log::debug!("released migration lock {}", self.key),
            Err(e) => log::warn!("failed to release migration lock {}: {e}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Lock that becomes free after `busy_for` attempts
    struct FakeLock {
        busy_for: Cell<u32>,
        attempts: Cell<u32>,
        blocking_calls: Cell<u32>,
        held: Cell<bool>,
        releases: Cell<u32>,
    }

    impl FakeLock {
        fn new(busy_for: u32) -> Self {
            Self {
                busy_for: Cell::new(busy_for),
                attempts: Cell::new(0),
                blocking_calls: Cell::new(0),
                held: Cell::new(false),
                releases: Cell::new(0),
            }
        }
    }

    impl AdvisoryLock for FakeLock {
        fn try_acquire(&self, _key: i64) -> Result<bool, MigrationError> {
            self.attempts.set(self.attempts.get() + 1);
            if self.busy_for.get() > 0 {
                self.busy_for.set(self.busy_for.get() - 1);
                return Ok(false);
            }
            self.held.set(true);
            Ok(true)
        }

        fn acquire(&self, _key: i64) -> Result<(), MigrationError> {
            self.blocking_calls.set(self.blocking_calls.get() + 1);
            self.held.set(true);
            Ok(())
        }

        fn release(&self, _key: i64) -> Result<(), MigrationError> {
            self.held.set(false);
            self.releases.set(self.releases.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = FakeLock::new(0);
        {
            let guard = MigrationLockGuard::acquire(&lock, 42, Duration::from_secs(1)).unwrap();
            assert_eq!(guard.key(), 42);
            assert!(lock.held.get());
        }
        assert!(!lock.held.get());
        assert_eq!(lock.releases.get(), 1);
    }

    #[test]
    fn test_polls_until_free() {
        let lock = FakeLock::new(2);
        let _guard = MigrationLockGuard::acquire(&lock, 1, Duration::from_secs(5)).unwrap();
        assert_eq!(lock.attempts.get(), 3);
        assert_eq!(lock.blocking_calls.get(), 0);
    }

    #[test]
    fn test_times_out_while_held_elsewhere() {
        let lock = FakeLock::new(u32::MAX);
        let result = MigrationLockGuard::acquire(&lock, 7, Duration::from_millis(250));
        assert!(matches!(
            result,
            Err(MigrationError::LockTimeout { key: 7, .. })
        ));
        assert_eq!(lock.releases.get(), 0);
    }

    #[test]
    fn test_zero_timeout_blocks() {
        let lock = FakeLock::new(u32::MAX);
        let _guard = MigrationLockGuard::acquire(&lock, 1, Duration::ZERO).unwrap();
        assert_eq!(lock.blocking_calls.get(), 1);
        assert_eq!(lock.attempts.get(), 0);
    }
}
