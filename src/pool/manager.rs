//! DbPool - a fixed set of `may_postgres` connections handed out round-robin
//!
//! `may_postgres` clients pipeline requests, so a connection can serve many
//! coroutines at once; the pool only spreads load across sessions.

use crate::connection::{connect, ConnectionError};
use crate::metrics::QueryMetrics;
use crate::{LifeError, MayPostgresExecutor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Pool size must be at least 1")]
    Empty,
    #[error("Failed to open pooled connection {index}: {source}")]
    Connect {
        index: usize,
        #[source]
        source: ConnectionError,
    },
}

enum LoadBalancingStrategy {
    RoundRobin(AtomicUsize),
}

pub struct DbPool {
    executors: Vec<Arc<MayPostgresExecutor>>,
    strategy: LoadBalancingStrategy,
}

impl DbPool {
    /// Open `size` connections to `url`
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Empty` for a zero size and `PoolError::Connect` for
    /// the first connection that fails.
    pub fn connect(
        url: &str,
        size: usize,
        metrics: Option<Arc<QueryMetrics>>,
    ) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::Empty);
        }

        let mut executors = Vec::with_capacity(size);
        for index in 0..size {
            let client = connect(url).map_err(|source| PoolError::Connect { index, source })?;
            let executor = match &metrics {
                Some(metrics) => MayPostgresExecutor::new(client).with_metrics(Arc::clone(metrics)),
                None => MayPostgresExecutor::new(client),
            };
            executors.push(Arc::new(executor));
        }

        log::info!("opened {size} database connection(s)");
        Ok(Self::from_executors(executors))
    }

    /// Build a pool over already-open executors
    pub fn from_executors(executors: Vec<Arc<MayPostgresExecutor>>) -> Self {
        Self {
            executors,
            strategy: LoadBalancingStrategy::RoundRobin(AtomicUsize::new(0)),
        }
    }

    /// Next executor in rotation
    ///
    /// # Errors
    ///
    /// Returns `LifeError::Other` if the pool holds no connections.
    pub fn get(&self) -> Result<Arc<MayPostgresExecutor>, LifeError> {
        if self.executors.is_empty() {
            return Err(LifeError::Other("connection pool is empty".to_string()));
        }
        let index = match &self.strategy {
            LoadBalancingStrategy::RoundRobin(counter) => {
                counter.fetch_add(1, Ordering::Relaxed) % self.executors.len()
            }
        };
        Ok(Arc::clone(&self.executors[index]))
    }

    pub fn size(&self) -> usize {
        self.executors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            DbPool::connect("postgresql://u:p@localhost/tasks", 0, None),
            Err(PoolError::Empty)
        ));
    }

    #[test]
    fn test_invalid_url_fails_on_first_connection() {
        assert!(matches!(
            DbPool::connect("not a url", 2, None),
            Err(PoolError::Connect { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty_pool_get_errors() {
        let pool = DbPool::from_executors(Vec::new());
        assert_eq!(pool.size(), 0);
        assert!(pool.get().is_err());
    }
}
