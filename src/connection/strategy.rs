//! Selection of one live connection from a pool snapshot.
//!
//! Both strategies operate over an immutable, point-in-time snapshot of the
//! pool: a connection removed from the pool is never returned again once a
//! strategy is rebuilt over the new snapshot, and additions become visible
//! only on the next rebuild. Cursors advance with an atomic fetch-add modulo
//! the snapshot size; there is no read-then-write window to race on.
//! `next()` never blocks or retries: exhaustion reports
//! [`ClientError::NoAvailableConnections`] immediately and leaves retry
//! policy to the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{ClientError, ClientResult};

use super::PooledConnection;

/// Tuning for selection strategies.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Connections established per server address; the parallel round-robin
    /// strategy partitions the snapshot into chunks of this size.
    pub connections: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { connections: 1 }
    }
}

/// Thread-safe picker of one live connection. `next()` may be called
/// concurrently from any number of callers.
pub trait ConnectionSelectionStrategy: Send + Sync {
    fn next(&self) -> ClientResult<Arc<PooledConnection>>;
}

/// Classic round-robin over the whole snapshot: a single shared cursor,
/// advanced atomically on every call; dead entries are skipped without
/// consuming the caller's turn.
pub struct RoundRobinStrategy {
    connections: Vec<Arc<PooledConnection>>,
    cursor: AtomicUsize,
}

impl RoundRobinStrategy {
    pub fn new(connections: Vec<Arc<PooledConnection>>) -> Self {
        Self {
            connections,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl ConnectionSelectionStrategy for RoundRobinStrategy {
    fn next(&self) -> ClientResult<Arc<PooledConnection>> {
        if self.connections.is_empty() {
            return Err(ClientError::NoAvailableConnections);
        }

        let mut misses = 0;
        loop {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.connections.len();
            let connection = &self.connections[index];
            if connection.is_connected() {
                connection.mark_used();
                return Ok(Arc::clone(connection));
            }

            // A full lap of misses does not prove exhaustion under
            // concurrency; rescan the snapshot before giving up.
            misses += 1;
            if misses >= self.connections.len() {
                if self.connections.iter().any(|c| c.is_connected()) {
                    misses = 0;
                } else {
                    return Err(ClientError::NoAvailableConnections);
                }
            }
        }
    }
}

struct Shard {
    connections: Vec<Arc<PooledConnection>>,
    cursor: AtomicUsize,
}

/// Round-robin with per-shard cursors to bound contention.
///
/// The snapshot is partitioned up front into fixed-size disjoint shards
/// (shard size = `SelectionConfig::connections`); each shard owns an
/// independent cursor and a shared picker rotates across shards, so
/// concurrent callers mostly land on different cursors.
pub struct ParallelRoundRobinStrategy {
    shards: Vec<Shard>,
    shard_cursor: AtomicUsize,
    total: usize,
}

impl ParallelRoundRobinStrategy {
    pub fn new(config: &SelectionConfig, connections: Vec<Arc<PooledConnection>>) -> Self {
        let total = connections.len();
        let shard_size = config.connections.max(1);
        let mut shards = Vec::with_capacity(total.div_ceil(shard_size));

        let mut remaining = connections;
        while !remaining.is_empty() {
            let rest = remaining.split_off(shard_size.min(remaining.len()));
            shards.push(Shard {
                connections: remaining,
                cursor: AtomicUsize::new(0),
            });
            remaining = rest;
        }

        Self {
            shards,
            shard_cursor: AtomicUsize::new(0),
            total,
        }
    }

    fn any_connected(&self) -> bool {
        self.shards
            .iter()
            .flat_map(|shard| shard.connections.iter())
            .any(|c| c.is_connected())
    }
}

impl ConnectionSelectionStrategy for ParallelRoundRobinStrategy {
    fn next(&self) -> ClientResult<Arc<PooledConnection>> {
        if self.total == 0 {
            return Err(ClientError::NoAvailableConnections);
        }

        let mut misses = 0;
        loop {
            let shard = &self.shards[self.shard_cursor.fetch_add(1, Ordering::Relaxed) % self.shards.len()];
            let slot = shard.cursor.fetch_add(1, Ordering::Relaxed) % shard.connections.len();
            let connection = &shard.connections[slot];
            if connection.is_connected() {
                connection.mark_used();
                return Ok(Arc::clone(connection));
            }

            misses += 1;
            if misses >= self.total {
                if self.any_connected() {
                    misses = 0;
                } else {
                    return Err(ClientError::NoAvailableConnections);
                }
            }
        }
    }
}
