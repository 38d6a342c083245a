//! The seam between pools and the network layer.

use gridcache_core::Result;

use super::Connection;

/// Opens and closes connections on behalf of a pool.
///
/// Socket I/O, handshakes and failover live behind this trait. Pools call it
/// from their own threads, including a helper thread during teardown.
pub trait Transport: Send + Sync + 'static {
    /// Opens an ordinary connection to the endpoint.
    fn establish_connection(&self, endpoint: &str) -> Result<Connection>;

    /// Opens a subscription connection to the endpoint.
    ///
    /// For a durable client the handshake reports the state of the server
    /// queue, which the returned connection carries.
    fn establish_subscription_connection(
        &self,
        endpoint: &str,
        durable_client_id: Option<&str>,
    ) -> Result<Connection> {
        let _ = durable_client_id;
        self.establish_connection(endpoint)
    }

    /// Closes a connection. With `keep_alive` the server keeps the durable
    /// queue for this client instead of dropping it.
    fn close_connection(&self, connection: Connection, keep_alive: bool) -> Result<()>;
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Transport")
    }
}
