//! A single server connection handed out by a pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generates a new unique connection ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// State of a durable client's server-side queue, reported by the
/// subscription handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurableQueueStatus {
    /// The server has never seen this durable client.
    FirstConnection,
    /// The durable timeout elapsed and the queue was dropped.
    Expired,
    /// The queue survived; this many events are waiting.
    Pending(u32),
}

impl DurableQueueStatus {
    /// Returns the pending event count in its signed wire form:
    /// `-2` first connection, `-1` expired, otherwise the count.
    pub fn as_count(&self) -> i32 {
        match self {
            Self::FirstConnection => -2,
            Self::Expired => -1,
            Self::Pending(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        }
    }
}

/// A connection to one server or locator endpoint.
///
/// The byte stream itself belongs to the [`Transport`](super::Transport);
/// the pool only tracks identity and handshake state.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    endpoint: String,
    created_at: Instant,
    queue_status: Option<DurableQueueStatus>,
}

impl Connection {
    /// Creates a connection record for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            endpoint: endpoint.into(),
            created_at: Instant::now(),
            queue_status: None,
        }
    }

    /// Attaches the durable queue status from a subscription handshake.
    pub fn with_queue_status(mut self, status: DurableQueueStatus) -> Self {
        self.queue_status = Some(status);
        self
    }

    /// Returns the connection's unique identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the endpoint this connection was opened against.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns when this connection was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns the durable queue status, for subscription connections.
    pub fn queue_status(&self) -> Option<DurableQueueStatus> {
        self.queue_status
    }
}
