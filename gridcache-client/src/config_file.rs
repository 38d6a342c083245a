//! Declarative configuration loading from YAML, TOML, and environment variables.
//!
//! Mirror structs deserialized with serde are converted into the programmatic
//! [`CacheConfig`](crate::config::CacheConfig) through the builder API.
//!
//! # Supported Formats
//!
//! - **YAML** (requires `config-file` feature): `CacheConfig::from_yaml("cache.yaml")`
//! - **TOML** (requires `config-file` feature): `CacheConfig::from_toml("cache.toml")`
//! - **Environment Variables** (always available): `CacheConfig::from_env()`
//!
//! # Example YAML
//!
//! ```yaml
//! durable-client-id: order-feed
//! durable-client-timeout-seconds: 600
//! pools:
//!   - name: orders
//!     locators:
//!       - "10.0.0.1:10334"
//!     min-connections: 2
//!     max-connections: 16
//!     subscription-enabled: true
//!     server-group: east
//!   - name: audit
//!     servers:
//!       - "10.0.0.9:40404"
//!     thread-local-connections: true
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{CacheConfig, CacheConfigBuilder, ConfigError, PoolConfig, PoolConfigBuilder};

/// Top-level file-based configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileCacheConfig {
    /// Durable client id.
    pub durable_client_id: Option<String>,
    /// Durable queue lifetime after disconnect, in seconds.
    pub durable_client_timeout_seconds: Option<u64>,
    /// Pools created when the cache starts.
    pub pools: Vec<FilePoolConfig>,
}

/// File-based pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilePoolConfig {
    /// Pool name.
    pub name: String,
    /// Locator endpoints as `host:port`.
    pub locators: Option<Vec<String>>,
    /// Server endpoints as `host:port`.
    pub servers: Option<Vec<String>>,
    /// Time to wait for a free connection, in milliseconds.
    pub free_connection_timeout_ms: Option<u64>,
    /// Load conditioning interval, in milliseconds.
    pub load_conditioning_interval_ms: Option<u64>,
    /// Socket buffer size in bytes.
    pub socket_buffer_size: Option<u32>,
    /// Read timeout, in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Minimum number of connections.
    pub min_connections: Option<u32>,
    /// Maximum number of connections.
    pub max_connections: Option<u32>,
    /// Idle timeout, in milliseconds.
    pub idle_timeout_ms: Option<u64>,
    /// Retry attempts; `-1` tries every server.
    pub retry_attempts: Option<i32>,
    /// Ping interval, in milliseconds.
    pub ping_interval_ms: Option<u64>,
    /// Locator list update interval, in milliseconds.
    pub update_locator_list_interval_ms: Option<u64>,
    /// Statistic sampling interval, in milliseconds.
    pub statistic_interval_ms: Option<u64>,
    /// Server group.
    pub server_group: Option<String>,
    /// Whether subscriptions are enabled.
    pub subscription_enabled: Option<bool>,
    /// Subscription redundancy.
    pub subscription_redundancy: Option<i32>,
    /// Subscription message tracking timeout, in milliseconds.
    pub subscription_message_tracking_timeout_ms: Option<u64>,
    /// Subscription acknowledgement interval, in milliseconds.
    pub subscription_ack_interval_ms: Option<u64>,
    /// Whether single-hop access is enabled.
    pub pr_single_hop_enabled: Option<bool>,
    /// Whether connections are bound to threads.
    pub thread_local_connections: Option<bool>,
    /// Whether multiuser authentication is enabled.
    pub multiuser_authentication: Option<bool>,
    /// SNI proxy host.
    pub sni_proxy_host: Option<String>,
    /// SNI proxy port.
    pub sni_proxy_port: Option<u16>,
    /// Pool teardown budget, in milliseconds.
    pub destroy_timeout_ms: Option<u64>,
}

fn parse_endpoint(endpoint: &str) -> Result<(&str, u16), ConfigError> {
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::new(format!("endpoint '{endpoint}' must be host:port")))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| ConfigError::new(format!("invalid port in endpoint '{endpoint}'")))?;
    if host.is_empty() {
        return Err(ConfigError::new(format!("missing host in endpoint '{endpoint}'")));
    }
    Ok((host, port))
}

impl TryFrom<FilePoolConfig> for PoolConfig {
    type Error = ConfigError;

    fn try_from(file: FilePoolConfig) -> Result<Self, Self::Error> {
        let mut b = PoolConfigBuilder::new();

        for endpoint in file.locators.iter().flatten() {
            let (host, port) = parse_endpoint(endpoint)?;
            b = b.add_locator(host, port);
        }
        for endpoint in file.servers.iter().flatten() {
            let (host, port) = parse_endpoint(endpoint)?;
            b = b.add_server(host, port);
        }

        if let Some(ms) = file.free_connection_timeout_ms {
            b = b.free_connection_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.load_conditioning_interval_ms {
            b = b.load_conditioning_interval(Duration::from_millis(ms));
        }
        if let Some(v) = file.socket_buffer_size {
            b = b.socket_buffer_size(v);
        }
        if let Some(ms) = file.read_timeout_ms {
            b = b.read_timeout(Duration::from_millis(ms));
        }
        if let Some(v) = file.min_connections {
            b = b.min_connections(v);
        }
        if let Some(v) = file.max_connections {
            b = b.max_connections(v);
        }
        if let Some(ms) = file.idle_timeout_ms {
            b = b.idle_timeout(Duration::from_millis(ms));
        }
        if let Some(v) = file.retry_attempts {
            b = b.retry_attempts(v);
        }
        if let Some(ms) = file.ping_interval_ms {
            b = b.ping_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = file.update_locator_list_interval_ms {
            b = b.update_locator_list_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = file.statistic_interval_ms {
            b = b.statistic_interval(Duration::from_millis(ms));
        }
        if let Some(group) = file.server_group {
            b = b.server_group(group);
        }
        if let Some(v) = file.subscription_enabled {
            b = b.subscription_enabled(v);
        }
        if let Some(v) = file.subscription_redundancy {
            b = b.subscription_redundancy(v);
        }
        if let Some(ms) = file.subscription_message_tracking_timeout_ms {
            b = b.subscription_message_tracking_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.subscription_ack_interval_ms {
            b = b.subscription_ack_interval(Duration::from_millis(ms));
        }
        if let Some(v) = file.pr_single_hop_enabled {
            b = b.pr_single_hop_enabled(v);
        }
        if let Some(v) = file.thread_local_connections {
            b = b.thread_local_connections(v);
        }
        if let Some(v) = file.multiuser_authentication {
            b = b.multiuser_authentication(v);
        }
        if let Some(host) = file.sni_proxy_host {
            b = b.sni_proxy_host(host);
        }
        if let Some(port) = file.sni_proxy_port {
            b = b.sni_proxy_port(port);
        }
        if let Some(ms) = file.destroy_timeout_ms {
            b = b.destroy_timeout(Duration::from_millis(ms));
        }

        b.build()
            .map_err(|e| ConfigError::new(format!("pool '{}': {}", file.name, e.message())))
    }
}

impl TryFrom<FileCacheConfig> for CacheConfig {
    type Error = ConfigError;

    fn try_from(file: FileCacheConfig) -> Result<Self, Self::Error> {
        let mut builder = CacheConfigBuilder::new();

        if let Some(id) = file.durable_client_id {
            builder = builder.durable_client_id(id);
        }

        if let Some(secs) = file.durable_client_timeout_seconds {
            builder = builder.durable_client_timeout(Duration::from_secs(secs));
        }

        for pool in file.pools {
            let name = pool.name.clone();
            builder = builder.add_pool(name, pool.try_into()?);
        }

        builder.build()
    }
}

impl CacheConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Requires the `config-file` feature.
    #[cfg(feature = "config-file")]
    pub fn from_yaml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!("failed to read YAML config file: {e}"))
        })?;
        let file_config: FileCacheConfig = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::new(format!("failed to parse YAML config: {e}"))
        })?;
        file_config.try_into()
    }

    /// Loads configuration from a TOML file.
    ///
    /// Requires the `config-file` feature.
    #[cfg(feature = "config-file")]
    pub fn from_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!("failed to read TOML config file: {e}"))
        })?;
        let file_config: FileCacheConfig = toml_crate::from_str(&content).map_err(|e| {
            ConfigError::new(format!("failed to parse TOML config: {e}"))
        })?;
        file_config.try_into()
    }

    /// Loads configuration from environment variables.
    ///
    /// This method is always available (no feature flag required). The
    /// variables describe the cache and at most one pool.
    ///
    /// # Supported Environment Variables
    ///
    /// | Variable | Maps to |
    /// |----------|---------|
    /// | `GRIDCACHE_DURABLE_CLIENT_ID` | `durable_client_id` |
    /// | `GRIDCACHE_DURABLE_CLIENT_TIMEOUT_SECONDS` | `durable_client_timeout` |
    /// | `GRIDCACHE_POOL_NAME` | Name of the declared pool (default `default`) |
    /// | `GRIDCACHE_LOCATORS` | Comma-separated `host:port` locators |
    /// | `GRIDCACHE_SERVERS` | Comma-separated `host:port` servers |
    /// | `GRIDCACHE_MIN_CONNECTIONS` | `min_connections` |
    /// | `GRIDCACHE_MAX_CONNECTIONS` | `max_connections` |
    /// | `GRIDCACHE_SERVER_GROUP` | `server_group` |
    /// | `GRIDCACHE_SUBSCRIPTION_ENABLED` | `"true"` or `"false"` |
    /// | `GRIDCACHE_READ_TIMEOUT_MS` | Read timeout in milliseconds |
    ///
    /// A pool is declared only when `GRIDCACHE_LOCATORS` or
    /// `GRIDCACHE_SERVERS` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_env_with(
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut file_config = FileCacheConfig {
            durable_client_id: var("GRIDCACHE_DURABLE_CLIENT_ID"),
            ..Default::default()
        };

        if let Some(val) = var("GRIDCACHE_DURABLE_CLIENT_TIMEOUT_SECONDS") {
            file_config.durable_client_timeout_seconds = Some(parse_env(
                "GRIDCACHE_DURABLE_CLIENT_TIMEOUT_SECONDS",
                &val,
            )?);
        }

        let split = |val: String| -> Vec<String> {
            val.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let locators = var("GRIDCACHE_LOCATORS").map(split);
        let servers = var("GRIDCACHE_SERVERS").map(split);

        if locators.is_some() || servers.is_some() {
            let mut pool = FilePoolConfig {
                name: var("GRIDCACHE_POOL_NAME").unwrap_or_else(|| "default".to_string()),
                locators,
                servers,
                server_group: var("GRIDCACHE_SERVER_GROUP"),
                ..Default::default()
            };
            if let Some(val) = var("GRIDCACHE_MIN_CONNECTIONS") {
                pool.min_connections = Some(parse_env("GRIDCACHE_MIN_CONNECTIONS", &val)?);
            }
            if let Some(val) = var("GRIDCACHE_MAX_CONNECTIONS") {
                pool.max_connections = Some(parse_env("GRIDCACHE_MAX_CONNECTIONS", &val)?);
            }
            if let Some(val) = var("GRIDCACHE_SUBSCRIPTION_ENABLED") {
                pool.subscription_enabled = Some(val.eq_ignore_ascii_case("true"));
            }
            if let Some(val) = var("GRIDCACHE_READ_TIMEOUT_MS") {
                pool.read_timeout_ms = Some(parse_env("GRIDCACHE_READ_TIMEOUT_MS", &val)?);
            }
            file_config.pools.push(pool);
        }

        file_config.try_into()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::new(format!("invalid value for {key}: '{val}'")))
}

/// Loads a configuration file, detecting the format by extension.
///
/// Supports `.yaml`, `.yml`, and `.toml` extensions.
/// Requires the `config-file` feature.
#[cfg(feature = "config-file")]
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<CacheConfig, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => CacheConfig::from_yaml(path),
        Some("toml") => CacheConfig::from_toml(path),
        Some(ext) => Err(ConfigError::new(format!(
            "unsupported config file extension: .{ext} (expected .yaml, .yml, or .toml)"
        ))),
        None => Err(ConfigError::new(
            "config file has no extension; expected .yaml, .yml, or .toml",
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_file_config_defaults_produce_valid_cache_config() {
        let config: CacheConfig = FileCacheConfig::default().try_into().unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_file_pool_config_maps_every_field() {
        let file = FilePoolConfig {
            name: "orders".to_string(),
            locators: Some(vec!["10.0.0.1:10334".to_string()]),
            min_connections: Some(2),
            max_connections: Some(8),
            server_group: Some("east".to_string()),
            subscription_enabled: Some(true),
            subscription_redundancy: Some(1),
            thread_local_connections: Some(true),
            read_timeout_ms: Some(2500),
            sni_proxy_host: Some("proxy".to_string()),
            sni_proxy_port: Some(15443),
            ..Default::default()
        };
        let config: PoolConfig = file.try_into().unwrap();
        assert_eq!(config.locators(), ["10.0.0.1:10334"]);
        assert_eq!(config.min_connections(), 2);
        assert_eq!(config.max_connections(), Some(8));
        assert_eq!(config.server_group(), "east");
        assert!(config.subscription_enabled());
        assert_eq!(config.subscription_redundancy(), 1);
        assert!(config.thread_local_connections());
        assert_eq!(config.read_timeout(), Duration::from_millis(2500));
        assert_eq!(config.sni_proxy_port(), Some(15443));
    }

    #[test]
    fn test_invalid_pool_reports_pool_name() {
        let file = FileCacheConfig {
            pools: vec![FilePoolConfig {
                name: "bad".to_string(),
                min_connections: Some(4),
                max_connections: Some(1),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = CacheConfig::try_from(file).unwrap_err();
        assert!(err.to_string().contains("pool 'bad'"));
    }

    #[test]
    fn test_malformed_endpoint_fails() {
        assert!(parse_endpoint("nohost").is_err());
        assert!(parse_endpoint("host:notaport").is_err());
        assert!(parse_endpoint(":10334").is_err());
        assert_eq!(parse_endpoint("h:1").unwrap(), ("h", 1));
    }

    #[test]
    fn test_from_env_declares_single_pool() {
        let vars: HashMap<&str, &str> = [
            ("GRIDCACHE_DURABLE_CLIENT_ID", "feed"),
            ("GRIDCACHE_DURABLE_CLIENT_TIMEOUT_SECONDS", "60"),
            ("GRIDCACHE_POOL_NAME", "main"),
            ("GRIDCACHE_SERVERS", "a:1, b:2"),
            ("GRIDCACHE_MAX_CONNECTIONS", "4"),
            ("GRIDCACHE_SUBSCRIPTION_ENABLED", "TRUE"),
        ]
        .into_iter()
        .collect();
        let config = CacheConfig::from_env_with(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.durable_client_id(), Some("feed"));
        assert_eq!(config.durable_client_timeout(), Duration::from_secs(60));
        assert_eq!(config.pools().len(), 1);
        let pool = &config.pools()[0];
        assert_eq!(pool.name(), "main");
        assert_eq!(pool.config().servers(), ["a:1", "b:2"]);
        assert_eq!(pool.config().max_connections(), Some(4));
        assert!(pool.config().subscription_enabled());
    }

    #[test]
    fn test_from_env_without_endpoints_declares_no_pool() {
        let config = CacheConfig::from_env_with(|_| None).unwrap();
        assert!(config.pools().is_empty());
    }

    #[test]
    fn test_from_env_rejects_bad_number() {
        let err = CacheConfig::from_env_with(|k| {
            (k == "GRIDCACHE_DURABLE_CLIENT_TIMEOUT_SECONDS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("invalid value for GRIDCACHE_DURABLE_CLIENT_TIMEOUT_SECONDS"));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_yaml_round_trip() {
        let file_config = FileCacheConfig {
            durable_client_id: Some("yaml-test".to_string()),
            pools: vec![FilePoolConfig {
                name: "p".to_string(),
                servers: Some(vec!["s:40404".to_string()]),
                ..Default::default()
            }],
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&file_config).unwrap();
        let parsed: FileCacheConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.durable_client_id.as_deref(), Some("yaml-test"));
        assert_eq!(parsed.pools[0].name, "p");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_toml_file_loads() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
durable-client-id = "toml-test"

[[pools]]
name = "orders"
locators = ["loc:10334"]
max-connections = 3
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.durable_client_id(), Some("toml-test"));
        assert_eq!(config.pools()[0].config().max_connections(), Some(3));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_unknown_extension_fails() {
        let err = load_config("cache.ini").unwrap_err();
        assert!(err.to_string().contains("unsupported config file extension"));
    }
}
