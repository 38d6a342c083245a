//! Client runtime for the gridcache data grid.
//!
//! A [`Cache`] owns a [`PoolRegistry`] of named connection pools. Pools are
//! created through a [`PoolFactory`], looked up by name or by the region they
//! serve, and torn down together when the cache closes. The network layer is
//! supplied by the application through the [`Transport`] trait.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gridcache_client::{Cache, CacheConfig, PoolConfig, Transport};
//!
//! fn run(transport: Arc<dyn Transport>) -> gridcache_client::core::Result<()> {
//!     let config = CacheConfig::builder()
//!         .durable_client_id("orders-client")
//!         .add_pool(
//!             "orders",
//!             PoolConfig::builder()
//!                 .add_locator("locator1", 10334)
//!                 .subscription_enabled(true)
//!                 .build()?,
//!         )
//!         .build()?;
//!
//!     let cache = Cache::new(&config, transport)?;
//!     let pool = cache.pool_registry().find("orders").expect("declared above");
//!     println!("pending events: {}", pool.pending_event_count()?);
//!     cache.ready_for_events()?;
//!
//!     cache.close(true)
//! }
//! ```
//!
//! # Configuration
//!
//! Pools are configured with [`PoolConfig::builder()`], or declared in a YAML
//! or TOML file (feature `config-file`) or `GRIDCACHE_*` environment
//! variables; see [`config_file`].
//!
//! # Feature Flags
//!
//! | Flag | Purpose |
//! |------|---------|
//! | `config-file` | Load [`CacheConfig`] from YAML or TOML files |

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod config_file;
pub mod connection;
pub mod pool;
pub mod query;

pub use cache::{Cache, CacheContext, CacheRegion, Region};
pub use config::{
    CacheConfig, CacheConfigBuilder, ConfigError, PoolConfig, PoolConfigBuilder, PoolDeclaration,
};
#[cfg(feature = "config-file")]
pub use config_file::load_config;
pub use config_file::{FileCacheConfig, FilePoolConfig};
pub use connection::{
    Connection, ConnectionId, DurableQueueStatus, LoadBalancer, RoundRobinLoadBalancer, Transport,
};
pub use gridcache_core as core;
pub use pool::{Pool, PoolFactory, PoolRegistry, PooledConnection};
pub use query::{Query, QueryService};
