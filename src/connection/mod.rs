//! Connection pool entries and the RPC boundary they wrap.
//!
//! Transport framing, authentication and reconnection live outside this
//! crate; the driver sees a connection as an opaque remote-call surface plus
//! a liveness flag maintained by an external health monitor.

pub mod strategy;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rmpv::Value;

use crate::error::ClientResult;

/// Outcome of a remote procedure call: a successful result value or the
/// server-reported error payload, still undecoded.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResponse {
    Ok(Value),
    Error(Value),
}

/// The opaque remote-call surface of one established connection.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Invoke a stored procedure with positional arguments.
    async fn call(&self, procedure: &str, args: Vec<Value>) -> ClientResult<CallResponse>;
}

/// One pooled connection: the transport handle, a liveness flag and a
/// monotonic usage counter (diagnostic only).
///
/// The liveness flag may be flipped by a health-monitoring task concurrently
/// with selection reads; readers tolerate the race (best effort).
pub struct PooledConnection {
    address: String,
    remote: Arc<dyn RpcClient>,
    connected: AtomicBool,
    usage: AtomicU64,
}

impl PooledConnection {
    pub fn new(address: impl Into<String>, remote: Arc<dyn RpcClient>) -> Self {
        Self {
            address: address.into(),
            remote,
            connected: AtomicBool::new(true),
            usage: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// How many times a selection strategy has handed out this connection.
    pub fn usage(&self) -> u64 {
        self.usage.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_used(&self) {
        self.usage.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn call(&self, procedure: &str, args: Vec<Value>) -> ClientResult<CallResponse> {
        self.remote.call(procedure, args).await
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .field("usage", &self.usage())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    struct RefusingRpc;

    #[async_trait]
    impl RpcClient for RefusingRpc {
        async fn call(&self, _procedure: &str, _args: Vec<Value>) -> ClientResult<CallResponse> {
            Err(ClientError::Connection("connection refused".to_string()))
        }
    }

    #[test]
    fn test_liveness_and_usage() {
        let conn = PooledConnection::new("127.0.0.1:3301", Arc::new(RefusingRpc));

        assert!(conn.is_connected());
        assert_eq!(conn.usage(), 0);

        conn.mark_used();
        conn.mark_used();
        assert_eq!(conn.usage(), 2);

        conn.set_connected(false);
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_call_delegates_to_remote() {
        let conn = PooledConnection::new("127.0.0.1:3301", Arc::new(RefusingRpc));
        let result = tokio_test::block_on(conn.call("crud.insert", vec![]));
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }
}
