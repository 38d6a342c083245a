//! Pool and cache configuration types and builders.

use std::collections::HashSet;
use std::time::Duration;

use gridcache_core::GridError;

/// Default time to wait for a free connection.
pub const DEFAULT_FREE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
/// Default interval between load conditioning passes.
pub const DEFAULT_LOAD_CONDITIONING_INTERVAL: Duration = Duration::from_secs(300);
/// Default socket buffer size in bytes.
pub const DEFAULT_SOCKET_BUFFER_SIZE: u32 = 32 * 1024;
/// Default read timeout for server responses.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of connections kept open.
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
/// Default idle time before a connection above the minimum is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default retry count; `-1` tries every available server once.
pub const DEFAULT_RETRY_ATTEMPTS: i32 = -1;
/// Default interval between server pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);
/// Default interval between locator list refreshes.
pub const DEFAULT_UPDATE_LOCATOR_LIST_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of redundant subscription queues.
pub const DEFAULT_SUBSCRIPTION_REDUNDANCY: i32 = 0;
/// Default lifetime of subscription message tracking state.
pub const DEFAULT_SUBSCRIPTION_MESSAGE_TRACKING_TIMEOUT: Duration = Duration::from_secs(900);
/// Default interval between subscription acknowledgements.
pub const DEFAULT_SUBSCRIPTION_ACK_INTERVAL: Duration = Duration::from_millis(100);
/// Default budget for closing a pool's connections.
pub const DEFAULT_DESTROY_TIMEOUT: Duration = Duration::from_secs(10);
/// Default time the server keeps a durable client's queue after disconnect.
pub const DEFAULT_DURABLE_CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the validation message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for GridError {
    fn from(err: ConfigError) -> Self {
        GridError::Configuration(err.message)
    }
}

/// Immutable tuning parameters of one connection pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    locators: Vec<String>,
    servers: Vec<String>,
    free_connection_timeout: Duration,
    load_conditioning_interval: Duration,
    socket_buffer_size: u32,
    read_timeout: Duration,
    min_connections: u32,
    max_connections: Option<u32>,
    idle_timeout: Duration,
    retry_attempts: i32,
    ping_interval: Duration,
    update_locator_list_interval: Duration,
    statistic_interval: Option<Duration>,
    server_group: String,
    subscription_enabled: bool,
    subscription_redundancy: i32,
    subscription_message_tracking_timeout: Duration,
    subscription_ack_interval: Duration,
    pr_single_hop_enabled: bool,
    thread_local_connections: bool,
    multiuser_authentication: bool,
    sni_proxy_host: Option<String>,
    sni_proxy_port: Option<u16>,
    destroy_timeout: Duration,
}

impl PoolConfig {
    /// Creates a new pool configuration builder.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    /// Returns the locator endpoints, in the order they were added.
    pub fn locators(&self) -> &[String] {
        &self.locators
    }

    /// Returns the server endpoints, in the order they were added.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Returns the time to wait for a free connection.
    pub fn free_connection_timeout(&self) -> Duration {
        self.free_connection_timeout
    }

    /// Returns the load conditioning interval.
    pub fn load_conditioning_interval(&self) -> Duration {
        self.load_conditioning_interval
    }

    /// Returns the socket buffer size in bytes.
    pub fn socket_buffer_size(&self) -> u32 {
        self.socket_buffer_size
    }

    /// Returns the read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the minimum number of connections.
    pub fn min_connections(&self) -> u32 {
        self.min_connections
    }

    /// Returns the maximum number of connections; `None` is unlimited.
    pub fn max_connections(&self) -> Option<u32> {
        self.max_connections
    }

    /// Returns the idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the retry attempts; `-1` tries every available server.
    pub fn retry_attempts(&self) -> i32 {
        self.retry_attempts
    }

    /// Returns the ping interval.
    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Returns the locator list update interval.
    pub fn update_locator_list_interval(&self) -> Duration {
        self.update_locator_list_interval
    }

    /// Returns the statistic sampling interval; `None` disables sampling.
    pub fn statistic_interval(&self) -> Option<Duration> {
        self.statistic_interval
    }

    /// Returns the server group; empty means all servers.
    pub fn server_group(&self) -> &str {
        &self.server_group
    }

    /// Returns whether server-to-client subscriptions are enabled.
    pub fn subscription_enabled(&self) -> bool {
        self.subscription_enabled
    }

    /// Returns the subscription redundancy; `-1` uses every server.
    pub fn subscription_redundancy(&self) -> i32 {
        self.subscription_redundancy
    }

    /// Returns the subscription message tracking timeout.
    pub fn subscription_message_tracking_timeout(&self) -> Duration {
        self.subscription_message_tracking_timeout
    }

    /// Returns the subscription acknowledgement interval.
    pub fn subscription_ack_interval(&self) -> Duration {
        self.subscription_ack_interval
    }

    /// Returns whether single-hop access to partitioned regions is enabled.
    pub fn pr_single_hop_enabled(&self) -> bool {
        self.pr_single_hop_enabled
    }

    /// Returns whether released connections stay bound to their thread.
    pub fn thread_local_connections(&self) -> bool {
        self.thread_local_connections
    }

    /// Returns whether multiuser authentication is enabled.
    pub fn multiuser_authentication(&self) -> bool {
        self.multiuser_authentication
    }

    /// Returns the SNI proxy host, if any.
    pub fn sni_proxy_host(&self) -> Option<&str> {
        self.sni_proxy_host.as_deref()
    }

    /// Returns the SNI proxy port, if any.
    pub fn sni_proxy_port(&self) -> Option<u16> {
        self.sni_proxy_port
    }

    /// Returns the time allowed for closing the pool's connections.
    pub fn destroy_timeout(&self) -> Duration {
        self.destroy_timeout
    }

    /// Returns the endpoints connections are opened against: the servers if
    /// any were configured, the locators otherwise.
    pub fn endpoints(&self) -> &[String] {
        if self.servers.is_empty() {
            &self.locators
        } else {
            &self.servers
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfigBuilder::new().defaults()
    }
}

/// Builder for `PoolConfig`.
#[derive(Debug, Clone, Default)]
pub struct PoolConfigBuilder {
    locators: Vec<String>,
    servers: Vec<String>,
    free_connection_timeout: Option<Duration>,
    load_conditioning_interval: Option<Duration>,
    socket_buffer_size: Option<u32>,
    read_timeout: Option<Duration>,
    min_connections: Option<u32>,
    max_connections: Option<u32>,
    idle_timeout: Option<Duration>,
    retry_attempts: Option<i32>,
    ping_interval: Option<Duration>,
    update_locator_list_interval: Option<Duration>,
    statistic_interval: Option<Duration>,
    server_group: Option<String>,
    subscription_enabled: Option<bool>,
    subscription_redundancy: Option<i32>,
    subscription_message_tracking_timeout: Option<Duration>,
    subscription_ack_interval: Option<Duration>,
    pr_single_hop_enabled: Option<bool>,
    thread_local_connections: Option<bool>,
    multiuser_authentication: Option<bool>,
    sni_proxy_host: Option<String>,
    sni_proxy_port: Option<u16>,
    destroy_timeout: Option<Duration>,
}

impl PoolConfigBuilder {
    /// Creates a new pool configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a locator endpoint.
    pub fn add_locator(mut self, host: impl AsRef<str>, port: u16) -> Self {
        self.locators.push(format!("{}:{}", host.as_ref(), port));
        self
    }

    /// Adds a server endpoint.
    pub fn add_server(mut self, host: impl AsRef<str>, port: u16) -> Self {
        self.servers.push(format!("{}:{}", host.as_ref(), port));
        self
    }

    /// Sets the time to wait for a free connection.
    pub fn free_connection_timeout(mut self, timeout: Duration) -> Self {
        self.free_connection_timeout = Some(timeout);
        self
    }

    /// Sets the load conditioning interval.
    pub fn load_conditioning_interval(mut self, interval: Duration) -> Self {
        self.load_conditioning_interval = Some(interval);
        self
    }

    /// Sets the socket buffer size in bytes.
    pub fn socket_buffer_size(mut self, size: u32) -> Self {
        self.socket_buffer_size = Some(size);
        self
    }

    /// Sets the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, count: u32) -> Self {
        self.min_connections = Some(count);
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, count: u32) -> Self {
        self.max_connections = Some(count);
        self
    }

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Sets the retry attempts; `-1` tries every available server.
    pub fn retry_attempts(mut self, attempts: i32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Sets the ping interval.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = Some(interval);
        self
    }

    /// Sets the locator list update interval.
    pub fn update_locator_list_interval(mut self, interval: Duration) -> Self {
        self.update_locator_list_interval = Some(interval);
        self
    }

    /// Sets the statistic sampling interval.
    pub fn statistic_interval(mut self, interval: Duration) -> Self {
        self.statistic_interval = Some(interval);
        self
    }

    /// Restricts the pool to servers of the given group.
    pub fn server_group(mut self, group: impl Into<String>) -> Self {
        self.server_group = Some(group.into());
        self
    }

    /// Enables or disables server-to-client subscriptions.
    pub fn subscription_enabled(mut self, enabled: bool) -> Self {
        self.subscription_enabled = Some(enabled);
        self
    }

    /// Sets the subscription redundancy.
    pub fn subscription_redundancy(mut self, redundancy: i32) -> Self {
        self.subscription_redundancy = Some(redundancy);
        self
    }

    /// Sets the subscription message tracking timeout.
    pub fn subscription_message_tracking_timeout(mut self, timeout: Duration) -> Self {
        self.subscription_message_tracking_timeout = Some(timeout);
        self
    }

    /// Sets the subscription acknowledgement interval.
    pub fn subscription_ack_interval(mut self, interval: Duration) -> Self {
        self.subscription_ack_interval = Some(interval);
        self
    }

    /// Enables or disables single-hop access to partitioned regions.
    pub fn pr_single_hop_enabled(mut self, enabled: bool) -> Self {
        self.pr_single_hop_enabled = Some(enabled);
        self
    }

    /// Keeps released connections bound to the releasing thread.
    pub fn thread_local_connections(mut self, enabled: bool) -> Self {
        self.thread_local_connections = Some(enabled);
        self
    }

    /// Enables or disables multiuser authentication.
    pub fn multiuser_authentication(mut self, enabled: bool) -> Self {
        self.multiuser_authentication = Some(enabled);
        self
    }

    /// Routes connections through an SNI proxy.
    pub fn sni_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.sni_proxy_host = Some(host.into());
        self.sni_proxy_port = Some(port);
        self
    }

    /// Sets the SNI proxy host alone.
    pub fn sni_proxy_host(mut self, host: impl Into<String>) -> Self {
        self.sni_proxy_host = Some(host.into());
        self
    }

    /// Sets the SNI proxy port alone.
    pub fn sni_proxy_port(mut self, port: u16) -> Self {
        self.sni_proxy_port = Some(port);
        self
    }

    /// Sets the time allowed for closing the pool's connections.
    pub fn destroy_timeout(mut self, timeout: Duration) -> Self {
        self.destroy_timeout = Some(timeout);
        self
    }

    fn defaults(self) -> PoolConfig {
        PoolConfig {
            locators: self.locators,
            servers: self.servers,
            free_connection_timeout: self
                .free_connection_timeout
                .unwrap_or(DEFAULT_FREE_CONNECTION_TIMEOUT),
            load_conditioning_interval: self
                .load_conditioning_interval
                .unwrap_or(DEFAULT_LOAD_CONDITIONING_INTERVAL),
            socket_buffer_size: self.socket_buffer_size.unwrap_or(DEFAULT_SOCKET_BUFFER_SIZE),
            read_timeout: self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
            min_connections: self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS),
            max_connections: self.max_connections,
            idle_timeout: self.idle_timeout.unwrap_or(DEFAULT_IDLE_TIMEOUT),
            retry_attempts: self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            ping_interval: self.ping_interval.unwrap_or(DEFAULT_PING_INTERVAL),
            update_locator_list_interval: self
                .update_locator_list_interval
                .unwrap_or(DEFAULT_UPDATE_LOCATOR_LIST_INTERVAL),
            statistic_interval: self.statistic_interval,
            server_group: self.server_group.unwrap_or_default(),
            subscription_enabled: self.subscription_enabled.unwrap_or(false),
            subscription_redundancy: self
                .subscription_redundancy
                .unwrap_or(DEFAULT_SUBSCRIPTION_REDUNDANCY),
            subscription_message_tracking_timeout: self
                .subscription_message_tracking_timeout
                .unwrap_or(DEFAULT_SUBSCRIPTION_MESSAGE_TRACKING_TIMEOUT),
            subscription_ack_interval: self
                .subscription_ack_interval
                .unwrap_or(DEFAULT_SUBSCRIPTION_ACK_INTERVAL),
            pr_single_hop_enabled: self.pr_single_hop_enabled.unwrap_or(true),
            thread_local_connections: self.thread_local_connections.unwrap_or(false),
            multiuser_authentication: self.multiuser_authentication.unwrap_or(false),
            sni_proxy_host: self.sni_proxy_host,
            sni_proxy_port: self.sni_proxy_port,
            destroy_timeout: self.destroy_timeout.unwrap_or(DEFAULT_DESTROY_TIMEOUT),
        }
    }

    /// Builds the pool configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - both locators and servers were added
    /// - `min_connections` exceeds `max_connections`, or `max_connections` is zero
    /// - `socket_buffer_size` is zero
    /// - `retry_attempts` or `subscription_redundancy` is below `-1`
    /// - an SNI proxy port is set without a host, or the host is empty
    /// - `destroy_timeout` is zero
    pub fn build(self) -> Result<PoolConfig, ConfigError> {
        let config = self.defaults();

        if !config.locators.is_empty() && !config.servers.is_empty() {
            return Err(ConfigError::new(
                "a pool may use locators or servers, not both",
            ));
        }

        if let Some(max) = config.max_connections {
            if max == 0 {
                return Err(ConfigError::new("max_connections must be positive"));
            }
            if config.min_connections > max {
                return Err(ConfigError::new(format!(
                    "min_connections ({}) must not exceed max_connections ({})",
                    config.min_connections, max
                )));
            }
        }

        if config.socket_buffer_size == 0 {
            return Err(ConfigError::new("socket_buffer_size must be positive"));
        }

        if config.retry_attempts < -1 {
            return Err(ConfigError::new("retry_attempts must be -1 or greater"));
        }

        if config.subscription_redundancy < -1 {
            return Err(ConfigError::new(
                "subscription_redundancy must be -1 or greater",
            ));
        }

        match (&config.sni_proxy_host, config.sni_proxy_port) {
            (None, Some(_)) => {
                return Err(ConfigError::new("sni_proxy_port requires sni_proxy_host"));
            }
            (Some(host), _) if host.is_empty() => {
                return Err(ConfigError::new("sni_proxy_host must not be empty"));
            }
            _ => {}
        }

        if config.destroy_timeout.is_zero() {
            return Err(ConfigError::new("destroy_timeout must be positive"));
        }

        Ok(config)
    }
}

impl From<PoolConfig> for PoolConfigBuilder {
    fn from(config: PoolConfig) -> Self {
        Self {
            locators: config.locators,
            servers: config.servers,
            free_connection_timeout: Some(config.free_connection_timeout),
            load_conditioning_interval: Some(config.load_conditioning_interval),
            socket_buffer_size: Some(config.socket_buffer_size),
            read_timeout: Some(config.read_timeout),
            min_connections: Some(config.min_connections),
            max_connections: config.max_connections,
            idle_timeout: Some(config.idle_timeout),
            retry_attempts: Some(config.retry_attempts),
            ping_interval: Some(config.ping_interval),
            update_locator_list_interval: Some(config.update_locator_list_interval),
            statistic_interval: config.statistic_interval,
            server_group: Some(config.server_group),
            subscription_enabled: Some(config.subscription_enabled),
            subscription_redundancy: Some(config.subscription_redundancy),
            subscription_message_tracking_timeout: Some(
                config.subscription_message_tracking_timeout,
            ),
            subscription_ack_interval: Some(config.subscription_ack_interval),
            pr_single_hop_enabled: Some(config.pr_single_hop_enabled),
            thread_local_connections: Some(config.thread_local_connections),
            multiuser_authentication: Some(config.multiuser_authentication),
            sni_proxy_host: config.sni_proxy_host,
            sni_proxy_port: config.sni_proxy_port,
            destroy_timeout: Some(config.destroy_timeout),
        }
    }
}

/// A pool declared in a [`CacheConfig`], created when the cache starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolDeclaration {
    name: String,
    config: PoolConfig,
}

impl PoolDeclaration {
    /// Returns the pool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

/// Cache-wide configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    durable_client_id: Option<String>,
    durable_client_timeout: Duration,
    pools: Vec<PoolDeclaration>,
}

impl CacheConfig {
    /// Creates a new cache configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Returns the durable client id; `None` for a non-durable client.
    pub fn durable_client_id(&self) -> Option<&str> {
        self.durable_client_id.as_deref()
    }

    /// Returns how long the server keeps the durable queue after disconnect.
    pub fn durable_client_timeout(&self) -> Duration {
        self.durable_client_timeout
    }

    /// Returns the pools created when the cache starts.
    pub fn pools(&self) -> &[PoolDeclaration] {
        &self.pools
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            durable_client_id: None,
            durable_client_timeout: DEFAULT_DURABLE_CLIENT_TIMEOUT,
            pools: Vec::new(),
        }
    }
}

/// Builder for `CacheConfig`.
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    durable_client_id: Option<String>,
    durable_client_timeout: Option<Duration>,
    pools: Vec<PoolDeclaration>,
}

impl CacheConfigBuilder {
    /// Creates a new cache configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes this a durable client with the given id.
    pub fn durable_client_id(mut self, id: impl Into<String>) -> Self {
        self.durable_client_id = Some(id.into());
        self
    }

    /// Sets how long the server keeps the durable queue after disconnect.
    pub fn durable_client_timeout(mut self, timeout: Duration) -> Self {
        self.durable_client_timeout = Some(timeout);
        self
    }

    /// Declares a pool to create when the cache starts.
    pub fn add_pool(mut self, name: impl Into<String>, config: PoolConfig) -> Self {
        self.pools.push(PoolDeclaration {
            name: name.into(),
            config,
        });
        self
    }

    /// Builds the cache configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the durable client id is empty, a pool name is
    /// empty, or two pools share a name.
    pub fn build(self) -> Result<CacheConfig, ConfigError> {
        if let Some(id) = &self.durable_client_id {
            if id.is_empty() {
                return Err(ConfigError::new("durable_client_id must not be empty"));
            }
        }

        let mut seen = HashSet::new();
        for pool in &self.pools {
            if pool.name.is_empty() {
                return Err(ConfigError::new("pool name must not be empty"));
            }
            if !seen.insert(pool.name.as_str()) {
                return Err(ConfigError::new(format!(
                    "pool '{}' is declared more than once",
                    pool.name
                )));
            }
        }

        Ok(CacheConfig {
            durable_client_id: self.durable_client_id,
            durable_client_timeout: self
                .durable_client_timeout
                .unwrap_or(DEFAULT_DURABLE_CLIENT_TIMEOUT),
            pools: self.pools,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::builder().build().unwrap();
        assert_eq!(config.free_connection_timeout(), DEFAULT_FREE_CONNECTION_TIMEOUT);
        assert_eq!(config.load_conditioning_interval(), Duration::from_secs(300));
        assert_eq!(config.socket_buffer_size(), 32768);
        assert_eq!(config.read_timeout(), DEFAULT_READ_TIMEOUT);
        assert_eq!(config.min_connections(), 1);
        assert_eq!(config.max_connections(), None);
        assert_eq!(config.idle_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_attempts(), -1);
        assert_eq!(config.ping_interval(), Duration::from_secs(10));
        assert_eq!(config.statistic_interval(), None);
        assert_eq!(config.server_group(), "");
        assert!(!config.subscription_enabled());
        assert_eq!(config.subscription_redundancy(), 0);
        assert!(config.pr_single_hop_enabled());
        assert!(!config.thread_local_connections());
        assert!(!config.multiuser_authentication());
        assert_eq!(config.sni_proxy_host(), None);
        assert_eq!(config.destroy_timeout(), DEFAULT_DESTROY_TIMEOUT);
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_endpoints_are_kept_in_order() {
        let config = PoolConfig::builder()
            .add_server("s1", 40404)
            .add_server("s2", 40405)
            .build()
            .unwrap();
        assert_eq!(config.servers(), ["s1:40404", "s2:40405"]);
        assert_eq!(config.endpoints(), config.servers());

        let config = PoolConfig::builder().add_locator("loc", 10334).build().unwrap();
        assert_eq!(config.endpoints(), ["loc:10334"]);
    }

    #[test]
    fn test_locators_and_servers_are_exclusive() {
        let result = PoolConfig::builder()
            .add_locator("loc", 10334)
            .add_server("srv", 40404)
            .build();
        assert!(result.unwrap_err().to_string().contains("not both"));
    }

    #[test]
    fn test_min_exceeding_max_fails() {
        let result = PoolConfig::builder()
            .min_connections(5)
            .max_connections(2)
            .build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("min_connections (5) must not exceed max_connections (2)"));
    }

    #[test]
    fn test_zero_max_connections_fails() {
        let result = PoolConfig::builder().min_connections(0).max_connections(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_range_checks() {
        assert!(PoolConfig::builder().socket_buffer_size(0).build().is_err());
        assert!(PoolConfig::builder().retry_attempts(-2).build().is_err());
        assert!(PoolConfig::builder().retry_attempts(-1).build().is_ok());
        assert!(PoolConfig::builder().subscription_redundancy(-2).build().is_err());
        assert!(PoolConfig::builder()
            .destroy_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_sni_port_requires_host() {
        let result = PoolConfig::builder().sni_proxy_port(15443).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("sni_proxy_port requires sni_proxy_host"));

        let config = PoolConfig::builder().sni_proxy("proxy", 15443).build().unwrap();
        assert_eq!(config.sni_proxy_host(), Some("proxy"));
        assert_eq!(config.sni_proxy_port(), Some(15443));
    }

    #[test]
    fn test_builder_from_config_round_trip() {
        let config = PoolConfig::builder()
            .add_server("s", 1)
            .server_group("east")
            .subscription_enabled(true)
            .statistic_interval(Duration::from_secs(1))
            .build()
            .unwrap();
        let rebuilt = PoolConfigBuilder::from(config.clone()).build().unwrap();
        assert_eq!(rebuilt, config);
    }

    #[test]
    fn test_config_error_converts_to_grid_error() {
        let err: GridError = ConfigError::new("bad").into();
        assert!(matches!(err, GridError::Configuration(ref m) if m == "bad"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::new("test error");
        assert_eq!(err.to_string(), "configuration error: test error");
    }

    #[test]
    fn test_cache_config_rejects_duplicate_pools() {
        let result = CacheConfig::builder()
            .add_pool("p", PoolConfig::default())
            .add_pool("p", PoolConfig::default())
            .build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("pool 'p' is declared more than once"));
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::builder().build().unwrap();
        assert_eq!(config.durable_client_id(), None);
        assert_eq!(config.durable_client_timeout(), DEFAULT_DURABLE_CLIENT_TIMEOUT);
        assert!(config.pools().is_empty());
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PoolConfig>();
        assert_send_sync::<CacheConfig>();
        assert_send_sync::<ConfigError>();
    }
}
