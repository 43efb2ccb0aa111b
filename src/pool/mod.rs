//! Connection pool shared by the HTTP handlers.

pub mod manager;

pub use manager::{DbPool, PoolError};
