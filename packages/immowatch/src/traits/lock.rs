//! Distributed work lock interface.
//!
//! Multiple orchestrator instances may run against the same store; an
//! external lock service prevents two nodes from double-processing a
//! city's urls. This crate only calls the lock at batch boundaries — it
//! never implements cluster-wide mutual exclusion itself.

use async_trait::async_trait;

use crate::error::Result;

/// Lease-style lock held for the duration of one batch's fetch + upsert
/// cycle.
#[async_trait]
pub trait WorkLock: Send + Sync {
    /// Try to acquire the lock for `key` with a TTL. Returns `false` when
    /// another holder has it; that is contention, not an error.
    async fn acquire(&self, key: &str, ttl_seconds: u64) -> Result<bool>;

    /// Release the lock for `key`.
    async fn release(&self, key: &str) -> Result<()>;
}
