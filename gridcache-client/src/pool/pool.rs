//! A single named connection pool.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use gridcache_core::{GridError, Result};
use parking_lot::{Condvar, Mutex};

use super::registry::RegistryInner;
use crate::cache::CacheContext;
use crate::config::PoolConfig;
use crate::connection::{Connection, LoadBalancer, RoundRobinLoadBalancer};
use crate::query::QueryService;

#[derive(Debug, Default)]
struct Slots {
    idle: Vec<Connection>,
    /// Connections owned by the pool, idle or checked out, excluding the
    /// subscription connection.
    open: usize,
}

/// A live pool of connections to one set of servers.
///
/// A pool is either active or destroyed. Once destroyed it rejects every
/// operational call, but its configuration can still be read.
pub struct Pool {
    name: String,
    config: Arc<PoolConfig>,
    context: Arc<CacheContext>,
    registry: Weak<RegistryInner>,
    balancer: RoundRobinLoadBalancer,
    destroyed: AtomicBool,
    attached_regions: AtomicUsize,
    slots: Mutex<Slots>,
    available: Condvar,
    thread_bound: Mutex<HashMap<ThreadId, Connection>>,
    subscription: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("destroyed", &self.is_destroyed())
            .field("attached_regions", &self.attached_region_count())
            .finish()
    }
}

impl Pool {
    /// Creates the pool and opens its initial connections.
    ///
    /// Connection failures are logged; the pool is returned regardless and
    /// opens connections on demand later.
    pub(crate) fn open(
        name: impl Into<String>,
        config: Arc<PoolConfig>,
        context: Arc<CacheContext>,
        registry: Weak<RegistryInner>,
    ) -> Arc<Self> {
        let pool = Arc::new(Self {
            name: name.into(),
            config,
            context,
            registry,
            balancer: RoundRobinLoadBalancer::new(),
            destroyed: AtomicBool::new(false),
            attached_regions: AtomicUsize::new(0),
            slots: Mutex::new(Slots::default()),
            available: Condvar::new(),
            thread_bound: Mutex::new(HashMap::new()),
            subscription: Mutex::new(None),
        });

        for _ in 0..pool.config.min_connections() {
            match pool.open_connection() {
                Ok(conn) => {
                    let mut slots = pool.slots.lock();
                    slots.idle.push(conn);
                    slots.open += 1;
                }
                Err(e) => {
                    tracing::warn!(pool = %pool.name, error = %e, "failed initial connection");
                }
            }
        }

        if pool.config.subscription_enabled() {
            match pool.open_subscription() {
                Ok(conn) => *pool.subscription.lock() = Some(conn),
                Err(e) => {
                    tracing::warn!(pool = %pool.name, error = %e, "failed subscription connection");
                }
            }
        }

        tracing::info!(
            pool = %pool.name,
            connections = pool.slots.lock().open,
            subscription = pool.subscription.lock().is_some(),
            "created pool"
        );
        pool
    }

    fn select_endpoint(&self) -> Result<&str> {
        self.balancer.select(self.config.endpoints()).ok_or_else(|| {
            GridError::Configuration(format!("pool '{}' has no locators or servers", self.name))
        })
    }

    fn open_connection(&self) -> Result<Connection> {
        let endpoint = self.select_endpoint()?;
        let conn = self.context.transport().establish_connection(endpoint)?;
        tracing::debug!(pool = %self.name, id = %conn.id(), endpoint = %endpoint, "opened connection");
        Ok(conn)
    }

    fn open_subscription(&self) -> Result<Connection> {
        let endpoint = self.select_endpoint()?;
        let conn = self
            .context
            .transport()
            .establish_subscription_connection(endpoint, self.context.durable_client_id())?;
        tracing::debug!(
            pool = %self.name,
            id = %conn.id(),
            queue_status = ?conn.queue_status(),
            "opened subscription connection"
        );
        Ok(conn)
    }

    fn ensure_active(&self, operation: &str) -> Result<()> {
        if self.is_destroyed() {
            return Err(GridError::IllegalState(format!(
                "pool '{}' has been destroyed; cannot {}",
                self.name, operation
            )));
        }
        Ok(())
    }

    /// Returns the pool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns true once the pool has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Returns the number of regions currently attached to this pool.
    pub fn attached_region_count(&self) -> usize {
        self.attached_regions.load(Ordering::Acquire)
    }

    /// Returns the number of connections owned by the pool, idle or in use.
    pub fn connection_count(&self) -> usize {
        self.slots.lock().open
    }

    /// Returns the number of idle connections.
    pub fn idle_connection_count(&self) -> usize {
        self.slots.lock().idle.len()
    }

    /// Returns the locator endpoints.
    pub fn locators(&self) -> &[String] {
        self.config.locators()
    }

    /// Returns the server endpoints.
    pub fn servers(&self) -> &[String] {
        self.config.servers()
    }

    /// Returns the time to wait for a free connection.
    pub fn free_connection_timeout(&self) -> Duration {
        self.config.free_connection_timeout()
    }

    /// Returns the load conditioning interval.
    pub fn load_conditioning_interval(&self) -> Duration {
        self.config.load_conditioning_interval()
    }

    /// Returns the socket buffer size in bytes.
    pub fn socket_buffer_size(&self) -> u32 {
        self.config.socket_buffer_size()
    }

    /// Returns the read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.config.read_timeout()
    }

    /// Returns the minimum number of connections.
    pub fn min_connections(&self) -> u32 {
        self.config.min_connections()
    }

    /// Returns the maximum number of connections; `None` is unlimited.
    pub fn max_connections(&self) -> Option<u32> {
        self.config.max_connections()
    }

    /// Returns the idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        self.config.idle_timeout()
    }

    /// Returns the retry attempts.
    pub fn retry_attempts(&self) -> i32 {
        self.config.retry_attempts()
    }

    /// Returns the ping interval.
    pub fn ping_interval(&self) -> Duration {
        self.config.ping_interval()
    }

    /// Returns the locator list update interval.
    pub fn update_locator_list_interval(&self) -> Duration {
        self.config.update_locator_list_interval()
    }

    /// Returns the statistic sampling interval.
    pub fn statistic_interval(&self) -> Option<Duration> {
        self.config.statistic_interval()
    }

    /// Returns the server group.
    pub fn server_group(&self) -> &str {
        self.config.server_group()
    }

    /// Returns whether subscriptions are enabled.
    pub fn subscription_enabled(&self) -> bool {
        self.config.subscription_enabled()
    }

    /// Returns the subscription redundancy.
    pub fn subscription_redundancy(&self) -> i32 {
        self.config.subscription_redundancy()
    }

    /// Returns the subscription message tracking timeout.
    pub fn subscription_message_tracking_timeout(&self) -> Duration {
        self.config.subscription_message_tracking_timeout()
    }

    /// Returns the subscription acknowledgement interval.
    pub fn subscription_ack_interval(&self) -> Duration {
        self.config.subscription_ack_interval()
    }

    /// Returns whether single-hop access is enabled.
    pub fn pr_single_hop_enabled(&self) -> bool {
        self.config.pr_single_hop_enabled()
    }

    /// Returns whether connections are bound to threads.
    pub fn thread_local_connections(&self) -> bool {
        self.config.thread_local_connections()
    }

    /// Returns whether multiuser authentication is enabled.
    pub fn multiuser_authentication(&self) -> bool {
        self.config.multiuser_authentication()
    }

    /// Returns the SNI proxy host.
    pub fn sni_proxy_host(&self) -> Option<&str> {
        self.config.sni_proxy_host()
    }

    /// Returns the SNI proxy port.
    pub fn sni_proxy_port(&self) -> Option<u16> {
        self.config.sni_proxy_port()
    }

    /// Returns the number of events waiting in this durable client's server
    /// queue.
    ///
    /// `0` means none, a positive value is the queue length, `-1` means the
    /// durable timeout elapsed and the queue was dropped, and `-2` means the
    /// server saw this client for the first time.
    ///
    /// # Errors
    ///
    /// `IllegalState` if the pool is destroyed, the client is not durable,
    /// subscriptions are disabled, no subscription connection exists, or the
    /// cache already signalled readiness for events.
    pub fn pending_event_count(&self) -> Result<i32> {
        self.ensure_active("read the pending event count")?;
        if !self.context.is_durable() {
            return Err(GridError::IllegalState(format!(
                "pool '{}': pending event count is only available to durable clients",
                self.name
            )));
        }
        if !self.config.subscription_enabled() {
            return Err(GridError::IllegalState(format!(
                "pool '{}': pending event count requires subscriptions to be enabled",
                self.name
            )));
        }
        if self.context.is_ready_for_events() {
            return Err(GridError::IllegalState(format!(
                "pool '{}': pending event count must be read before ready_for_events",
                self.name
            )));
        }
        match self.subscription.lock().as_ref() {
            Some(conn) => Ok(conn.queue_status().map_or(0, |s| s.as_count())),
            None => Err(GridError::IllegalState(format!(
                "pool '{}' has no subscription connection",
                self.name
            ))),
        }
    }

    /// Returns a query service that runs queries on this pool's server group.
    pub fn query_service(&self) -> Result<QueryService> {
        self.ensure_active("create a query service")?;
        Ok(QueryService::new(&self.name, self.config.server_group()))
    }

    /// Checks out a connection.
    ///
    /// With thread-local connections the calling thread's bound connection
    /// is reused first. When none is idle and `max_connections` is reached,
    /// waits up to `free_connection_timeout` for one to be returned.
    ///
    /// # Errors
    ///
    /// `IllegalState` if the pool is destroyed, `Timeout` if no connection
    /// became free in time, or the transport's error if opening failed.
    pub fn acquire_connection(&self) -> Result<PooledConnection<'_>> {
        self.ensure_active("acquire a connection")?;

        if self.config.thread_local_connections() {
            let bound = self.thread_bound.lock().remove(&thread::current().id());
            if let Some(conn) = bound {
                return Ok(PooledConnection::new(self, conn));
            }
        }

        let deadline = Instant::now() + self.config.free_connection_timeout();
        let mut slots = self.slots.lock();
        loop {
            self.ensure_active("acquire a connection")?;

            if let Some(conn) = slots.idle.pop() {
                tracing::debug!(pool = %self.name, id = %conn.id(), "checked out connection");
                return Ok(PooledConnection::new(self, conn));
            }

            let below_max = self
                .config
                .max_connections()
                .map_or(true, |max| slots.open < max as usize);
            if below_max {
                slots.open += 1;
                drop(slots);
                return match self.open_connection() {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(e) => {
                        self.slots.lock().open -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            if self.available.wait_until(&mut slots, deadline).timed_out() {
                return Err(GridError::Timeout(format!(
                    "pool '{}': no free connection within {:?}",
                    self.name,
                    self.config.free_connection_timeout()
                )));
            }
        }
    }

    fn release(&self, conn: Connection) {
        let mut slots = self.slots.lock();
        if self.is_destroyed() {
            slots.open = slots.open.saturating_sub(1);
            drop(slots);
            self.close_quietly(conn);
            return;
        }

        let conn = if self.config.thread_local_connections() {
            match self.thread_bound.lock().insert(thread::current().id(), conn) {
                None => return,
                Some(displaced) => displaced,
            }
        } else {
            conn
        };

        tracing::debug!(pool = %self.name, id = %conn.id(), "returned connection");
        slots.idle.push(conn);
        self.available.notify_one();
    }

    fn close_quietly(&self, conn: Connection) {
        let id = conn.id();
        if let Err(e) = self.context.transport().close_connection(conn, false) {
            tracing::warn!(pool = %self.name, id = %id, error = %e, "failed to close connection");
        }
    }

    /// Returns the calling thread's bound connection to the shared idle list.
    ///
    /// Does nothing if the thread holds no bound connection.
    pub fn release_thread_local_connection(&self) -> Result<()> {
        self.ensure_active("release a thread-local connection")?;
        let bound = self.thread_bound.lock().remove(&thread::current().id());
        let Some(conn) = bound else {
            return Ok(());
        };

        let mut slots = self.slots.lock();
        if self.is_destroyed() {
            slots.open = slots.open.saturating_sub(1);
            drop(slots);
            self.close_quietly(conn);
        } else {
            slots.idle.push(conn);
            self.available.notify_one();
        }
        Ok(())
    }

    /// Counts a region against the pool so it cannot be destroyed.
    ///
    /// Shares the slot lock with destruction so a region never attaches to
    /// a pool that is being torn down.
    pub(crate) fn attach_region(&self) -> Result<()> {
        let _slots = self.slots.lock();
        self.ensure_active("attach a region")?;
        self.attached_regions.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub(crate) fn detach_region(&self) {
        let _ = self
            .attached_regions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Destroys the pool, dropping durable queues on the server.
    pub fn destroy(&self) -> Result<()> {
        self.destroy_with_keep_alive(false)
    }

    /// Destroys the pool and closes its connections.
    ///
    /// With `keep_alive` the server keeps this durable client's queue. The
    /// pool removes itself from its registry.
    ///
    /// # Errors
    ///
    /// `IllegalState` if regions still use the pool or it was already
    /// destroyed. A connection close failure or a teardown exceeding
    /// `destroy_timeout` is reported after the pool has been destroyed.
    pub fn destroy_with_keep_alive(&self, keep_alive: bool) -> Result<()> {
        match self.shutdown(keep_alive, true)? {
            Some(result) => result,
            None => Err(self.already_destroyed()),
        }
    }

    /// Destroys the pool without checking for attached regions.
    ///
    /// Returns `None` when the pool had already been destroyed.
    pub(crate) fn teardown(&self, keep_alive: bool) -> Option<Result<()>> {
        self.shutdown(keep_alive, false).unwrap_or_else(|e| Some(Err(e)))
    }

    fn already_destroyed(&self) -> GridError {
        GridError::IllegalState(format!("pool '{}' has already been destroyed", self.name))
    }

    /// The outer error refuses destruction and leaves the pool untouched.
    /// `None` means another caller destroyed it first.
    fn shutdown(&self, keep_alive: bool, require_unused: bool) -> Result<Option<Result<()>>> {
        let connections = {
            let mut slots = self.slots.lock();
            if self.destroyed.load(Ordering::Acquire) {
                return Ok(None);
            }
            let regions = self.attached_region_count();
            if require_unused && regions > 0 {
                return Err(GridError::IllegalState(format!(
                    "pool '{}' is still in use by {} region(s)",
                    self.name, regions
                )));
            }
            self.destroyed.store(true, Ordering::Release);
            let mut connections: Vec<Connection> = slots.idle.drain(..).collect();
            connections.extend(self.thread_bound.lock().drain().map(|(_, conn)| conn));
            slots.open = slots.open.saturating_sub(connections.len());
            self.available.notify_all();
            connections
        };
        let mut connections = connections;
        connections.extend(self.subscription.lock().take());

        let result = self.close_connections(connections, keep_alive);

        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self);
        }

        match &result {
            Ok(()) => tracing::info!(pool = %self.name, keep_alive, "destroyed pool"),
            Err(e) => tracing::warn!(pool = %self.name, error = %e, "pool destroyed with errors"),
        }
        Ok(Some(result))
    }

    fn close_connections(&self, connections: Vec<Connection>, keep_alive: bool) -> Result<()> {
        if connections.is_empty() {
            return Ok(());
        }
        let total = connections.len();
        let transport = Arc::clone(self.context.transport());
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name(format!("{}-teardown", self.name))
            .spawn(move || {
                let failures: Vec<String> = connections
                    .into_iter()
                    .filter_map(|conn| {
                        let id = conn.id();
                        transport
                            .close_connection(conn, keep_alive)
                            .err()
                            .map(|e| format!("{id}: {e}"))
                    })
                    .collect();
                let _ = tx.send(failures);
            })?;

        match rx.recv_timeout(self.config.destroy_timeout()) {
            Ok(failures) if failures.is_empty() => {
                tracing::debug!(pool = %self.name, count = total, "closed connections");
                Ok(())
            }
            Ok(failures) => Err(GridError::Connection(format!(
                "pool '{}': failed to close {} of {} connection(s): {}",
                self.name,
                failures.len(),
                total,
                failures.join("; ")
            ))),
            Err(RecvTimeoutError::Timeout) => Err(GridError::Timeout(format!(
                "pool '{}': connection teardown did not finish within {:?}",
                self.name,
                self.config.destroy_timeout()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(GridError::Connection(format!(
                "pool '{}': connection teardown thread exited unexpectedly",
                self.name
            ))),
        }
    }
}

/// A checked-out connection, returned to its pool on drop.
#[derive(Debug)]
pub struct PooledConnection<'a> {
    pool: &'a Pool,
    conn: Option<Connection>,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a Pool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }

    /// Returns the pool this connection belongs to.
    pub fn pool(&self) -> &Pool {
        self.pool
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `Drop` takes the connection out.
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
