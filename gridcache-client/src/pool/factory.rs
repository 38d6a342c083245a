//! Builder that creates and registers pools.

use std::sync::Arc;
use std::time::Duration;

use gridcache_core::{GridError, Result};

use super::{Pool, PoolRegistry};
use crate::config::{PoolConfig, PoolConfigBuilder};

/// Creates pools bound to one registry.
///
/// Setters mirror [`PoolConfigBuilder`]; [`PoolFactory::create`] validates the
/// accumulated configuration, opens the pool and registers it.
#[derive(Debug, Clone)]
pub struct PoolFactory {
    registry: PoolRegistry,
    builder: PoolConfigBuilder,
}

impl PoolFactory {
    pub(crate) fn new(registry: PoolRegistry) -> Self {
        Self {
            registry,
            builder: PoolConfigBuilder::new(),
        }
    }

    /// Replaces every setting with those of `config`.
    pub fn with_config(mut self, config: PoolConfig) -> Self {
        self.builder = PoolConfigBuilder::from(config);
        self
    }

    /// Adds a locator endpoint.
    pub fn add_locator(mut self, host: impl AsRef<str>, port: u16) -> Self {
        self.builder = self.builder.add_locator(host, port);
        self
    }

    /// Adds a server endpoint.
    pub fn add_server(mut self, host: impl AsRef<str>, port: u16) -> Self {
        self.builder = self.builder.add_server(host, port);
        self
    }

    /// Sets the time to wait for a free connection.
    pub fn free_connection_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.free_connection_timeout(timeout);
        self
    }

    /// Sets the load conditioning interval.
    pub fn load_conditioning_interval(mut self, interval: Duration) -> Self {
        self.builder = self.builder.load_conditioning_interval(interval);
        self
    }

    /// Sets the socket buffer size in bytes.
    pub fn socket_buffer_size(mut self, size: u32) -> Self {
        self.builder = self.builder.socket_buffer_size(size);
        self
    }

    /// Sets the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.read_timeout(timeout);
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, count: u32) -> Self {
        self.builder = self.builder.min_connections(count);
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, count: u32) -> Self {
        self.builder = self.builder.max_connections(count);
        self
    }

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.idle_timeout(timeout);
        self
    }

    /// Sets the retry attempts.
    pub fn retry_attempts(mut self, attempts: i32) -> Self {
        self.builder = self.builder.retry_attempts(attempts);
        self
    }

    /// Sets the ping interval.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.builder = self.builder.ping_interval(interval);
        self
    }

    /// Sets the locator list update interval.
    pub fn update_locator_list_interval(mut self, interval: Duration) -> Self {
        self.builder = self.builder.update_locator_list_interval(interval);
        self
    }

    /// Sets the statistic sampling interval.
    pub fn statistic_interval(mut self, interval: Duration) -> Self {
        self.builder = self.builder.statistic_interval(interval);
        self
    }

    /// Sets the server group.
    pub fn server_group(mut self, group: impl Into<String>) -> Self {
        self.builder = self.builder.server_group(group);
        self
    }

    /// Enables or disables subscriptions.
    pub fn subscription_enabled(mut self, enabled: bool) -> Self {
        self.builder = self.builder.subscription_enabled(enabled);
        self
    }

    /// Sets the subscription redundancy.
    pub fn subscription_redundancy(mut self, redundancy: i32) -> Self {
        self.builder = self.builder.subscription_redundancy(redundancy);
        self
    }

    /// Sets the subscription message tracking timeout.
    pub fn subscription_message_tracking_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.subscription_message_tracking_timeout(timeout);
        self
    }

    /// Sets the subscription acknowledgement interval.
    pub fn subscription_ack_interval(mut self, interval: Duration) -> Self {
        self.builder = self.builder.subscription_ack_interval(interval);
        self
    }

    /// Enables or disables single-hop access.
    pub fn pr_single_hop_enabled(mut self, enabled: bool) -> Self {
        self.builder = self.builder.pr_single_hop_enabled(enabled);
        self
    }

    /// Enables or disables thread-bound connections.
    pub fn thread_local_connections(mut self, enabled: bool) -> Self {
        self.builder = self.builder.thread_local_connections(enabled);
        self
    }

    /// Enables or disables multiuser authentication.
    pub fn multiuser_authentication(mut self, enabled: bool) -> Self {
        self.builder = self.builder.multiuser_authentication(enabled);
        self
    }

    /// Routes connections through an SNI proxy.
    pub fn sni_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.builder = self.builder.sni_proxy(host, port);
        self
    }

    /// Sets the budget for closing the pool's connections on destroy.
    pub fn destroy_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.destroy_timeout(timeout);
        self
    }

    /// Creates the pool named `name` and registers it.
    ///
    /// The factory can be reused to create further pools with the same
    /// settings.
    ///
    /// # Errors
    ///
    /// `Configuration` if the settings are invalid or name no endpoint,
    /// `DuplicateName` if the registry already has a pool called `name`.
    pub fn create(&self, name: &str) -> Result<Arc<Pool>> {
        if name.is_empty() {
            return Err(GridError::Configuration(
                "pool name must not be empty".to_string(),
            ));
        }
        let config = self.builder.clone().build()?;
        if config.endpoints().is_empty() {
            return Err(GridError::Configuration(format!(
                "pool '{}' needs at least one locator or server",
                name
            )));
        }
        if self.registry.find(name).is_some() {
            return Err(GridError::DuplicateName(name.to_string()));
        }

        let inner = self.registry.inner();
        let pool = Pool::open(
            name,
            Arc::new(config),
            Arc::clone(inner.context()),
            Arc::downgrade(inner),
        );

        if let Err(e) = self.registry.add_pool(name, Arc::clone(&pool)) {
            // Lost a race with another creator of the same name.
            if let Some(Err(teardown)) = pool.teardown(false) {
                tracing::warn!(pool = %name, error = %teardown, "failed to discard unregistered pool");
            }
            return Err(e);
        }
        Ok(pool)
    }
}
