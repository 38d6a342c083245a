//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gridcache_client::core::{GridError, Result};
use gridcache_client::{
    CacheContext, Connection, ConnectionId, DurableQueueStatus, PoolRegistry, Transport,
};
use parking_lot::Mutex;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Routes pool logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn unique_name(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", prefix, std::process::id(), id)
}

/// A close call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedConnection {
    pub id: ConnectionId,
    pub endpoint: String,
    pub keep_alive: bool,
}

/// In-memory transport that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct MockTransport {
    opened: Mutex<Vec<String>>,
    closed: Mutex<Vec<ClosedConnection>>,
    refuse: Mutex<HashSet<String>>,
    fail_close: Mutex<HashSet<String>>,
    slow_close: Mutex<HashMap<String, Duration>>,
    queue_status: Mutex<Option<DurableQueueStatus>>,
    subscription_client_ids: Mutex<Vec<Option<String>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `establish_connection` fail for the endpoint.
    pub fn refuse(&self, endpoint: &str) {
        self.refuse.lock().insert(endpoint.to_string());
    }

    /// Makes `close_connection` fail for connections to the endpoint.
    pub fn fail_close(&self, endpoint: &str) {
        self.fail_close.lock().insert(endpoint.to_string());
    }

    /// Makes `close_connection` block for `delay` for the endpoint.
    pub fn slow_close(&self, endpoint: &str, delay: Duration) {
        self.slow_close.lock().insert(endpoint.to_string(), delay);
    }

    /// Sets the durable queue status reported by subscription handshakes.
    pub fn set_queue_status(&self, status: DurableQueueStatus) {
        *self.queue_status.lock() = Some(status);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    pub fn closed(&self) -> Vec<ClosedConnection> {
        self.closed.lock().clone()
    }

    pub fn closed_endpoints(&self) -> Vec<String> {
        self.closed.lock().iter().map(|c| c.endpoint.clone()).collect()
    }

    pub fn subscription_client_ids(&self) -> Vec<Option<String>> {
        self.subscription_client_ids.lock().clone()
    }
}

impl Transport for MockTransport {
    fn establish_connection(&self, endpoint: &str) -> Result<Connection> {
        if self.refuse.lock().contains(endpoint) {
            return Err(GridError::Connection(format!("{endpoint} refused")));
        }
        self.opened.lock().push(endpoint.to_string());
        Ok(Connection::new(endpoint))
    }

    fn establish_subscription_connection(
        &self,
        endpoint: &str,
        durable_client_id: Option<&str>,
    ) -> Result<Connection> {
        let conn = self.establish_connection(endpoint)?;
        self.subscription_client_ids
            .lock()
            .push(durable_client_id.map(str::to_string));
        Ok(match *self.queue_status.lock() {
            Some(status) => conn.with_queue_status(status),
            None => conn,
        })
    }

    fn close_connection(&self, connection: Connection, keep_alive: bool) -> Result<()> {
        let endpoint = connection.endpoint().to_string();
        let delay = self.slow_close.lock().get(&endpoint).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.fail_close.lock().contains(&endpoint) {
            return Err(GridError::Connection(format!("{endpoint} reset during close")));
        }
        self.closed.lock().push(ClosedConnection {
            id: connection.id(),
            endpoint,
            keep_alive,
        });
        Ok(())
    }
}

pub fn registry_with(transport: &Arc<MockTransport>, durable_client_id: Option<&str>) -> PoolRegistry {
    let context = CacheContext::new(transport.clone(), durable_client_id.map(str::to_string));
    PoolRegistry::new(Arc::new(context))
}
