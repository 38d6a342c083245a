//! The client cache: durable identity, regions and the pool registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gridcache_core::{GridError, Result};
use parking_lot::Mutex;

use crate::config::{CacheConfig, DEFAULT_DURABLE_CLIENT_TIMEOUT};
use crate::connection::Transport;
use crate::pool::{Pool, PoolRegistry};

/// State shared by a cache and every pool it creates.
#[derive(Debug)]
pub struct CacheContext {
    transport: Arc<dyn Transport>,
    durable_client_id: Option<String>,
    durable_client_timeout: Duration,
    ready_for_events: AtomicBool,
}

impl CacheContext {
    /// Creates a context. A `durable_client_id` makes the client durable.
    pub fn new(transport: Arc<dyn Transport>, durable_client_id: Option<String>) -> Self {
        Self {
            transport,
            durable_client_id,
            durable_client_timeout: DEFAULT_DURABLE_CLIENT_TIMEOUT,
            ready_for_events: AtomicBool::new(false),
        }
    }

    /// Sets how long the server keeps the durable queue after disconnect.
    pub fn with_durable_client_timeout(mut self, timeout: Duration) -> Self {
        self.durable_client_timeout = timeout;
        self
    }

    /// Returns the transport pools open connections through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Returns true if the client has a durable identity.
    pub fn is_durable(&self) -> bool {
        self.durable_client_id.is_some()
    }

    /// Returns the durable client id.
    pub fn durable_client_id(&self) -> Option<&str> {
        self.durable_client_id.as_deref()
    }

    /// Returns the durable client timeout.
    pub fn durable_client_timeout(&self) -> Duration {
        self.durable_client_timeout
    }

    /// Returns true once the cache signalled readiness for events.
    pub fn is_ready_for_events(&self) -> bool {
        self.ready_for_events.load(Ordering::Acquire)
    }

    fn mark_ready_for_events(&self) -> bool {
        !self.ready_for_events.swap(true, Ordering::AcqRel)
    }
}

/// A named region as seen by the pool registry.
pub trait Region {
    /// Returns the region name.
    fn name(&self) -> &str;

    /// Returns the name of the pool serving this region, if any.
    fn attached_pool_name(&self) -> Option<&str>;
}

/// A region created through [`Cache::create_region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRegion {
    name: String,
    pool_name: Option<String>,
}

impl Region for CacheRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn attached_pool_name(&self) -> Option<&str> {
        self.pool_name.as_deref()
    }
}

#[derive(Debug)]
struct RegionEntry {
    region: Arc<CacheRegion>,
    pool: Option<Arc<Pool>>,
}

impl RegionEntry {
    fn detach(self) {
        if let Some(pool) = self.pool {
            pool.detach_region();
        }
    }
}

/// A client cache owning one pool registry.
#[derive(Debug)]
pub struct Cache {
    context: Arc<CacheContext>,
    registry: PoolRegistry,
    regions: Mutex<HashMap<String, RegionEntry>>,
    closed: AtomicBool,
}

impl Cache {
    /// Creates a cache and every pool declared in `config`.
    ///
    /// # Errors
    ///
    /// Returns the first pool creation error; pools created before it are
    /// destroyed again.
    pub fn new(config: &CacheConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let context = Arc::new(
            CacheContext::new(transport, config.durable_client_id().map(str::to_string))
                .with_durable_client_timeout(config.durable_client_timeout()),
        );
        let registry = PoolRegistry::new(Arc::clone(&context));

        for declaration in config.pools() {
            let created = registry
                .create_factory()
                .with_config(declaration.config().clone())
                .create(declaration.name());
            if let Err(e) = created {
                if let Err(cleanup) = registry.close(false) {
                    tracing::warn!(error = %cleanup, "failed to discard pools of incomplete cache");
                }
                return Err(e);
            }
        }

        tracing::info!(
            durable = context.is_durable(),
            pools = registry.len(),
            "created cache"
        );
        Ok(Self {
            context,
            registry,
            regions: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the shared cache context.
    pub fn context(&self) -> &Arc<CacheContext> {
        &self.context
    }

    /// Returns the pool registry.
    pub fn pool_registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// Returns true once the cache has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.is_closed() {
            return Err(GridError::IllegalState(format!(
                "cache is closed; cannot {}",
                operation
            )));
        }
        Ok(())
    }

    /// Creates a region served by `pool_name`, or by the default pool when
    /// no name is given. A region created with no pool available is local.
    ///
    /// # Errors
    ///
    /// `IllegalState` if the cache is closed, the region exists, the named
    /// pool is not registered or has been destroyed.
    pub fn create_region(&self, name: &str, pool_name: Option<&str>) -> Result<Arc<CacheRegion>> {
        self.ensure_open("create a region")?;
        let mut regions = self.regions.lock();
        // close may have drained the map between the check and the lock.
        self.ensure_open("create a region")?;
        if regions.contains_key(name) {
            return Err(GridError::IllegalState(format!(
                "region '{}' already exists",
                name
            )));
        }

        let pool = match pool_name {
            Some(pool_name) => Some(self.registry.find(pool_name).ok_or_else(|| {
                GridError::IllegalState(format!(
                    "region '{}': no pool named '{}' is registered",
                    name, pool_name
                ))
            })?),
            None => self.registry.default_pool(),
        };
        if let Some(pool) = &pool {
            pool.attach_region()?;
        }

        let region = Arc::new(CacheRegion {
            name: name.to_string(),
            pool_name: pool.as_ref().map(|p| p.name().to_string()),
        });
        tracing::debug!(region = %name, pool = ?region.pool_name, "created region");
        regions.insert(
            name.to_string(),
            RegionEntry {
                region: Arc::clone(&region),
                pool,
            },
        );
        Ok(region)
    }

    /// Returns the region named `name`.
    pub fn region(&self, name: &str) -> Option<Arc<CacheRegion>> {
        self.regions
            .lock()
            .get(name)
            .map(|entry| Arc::clone(&entry.region))
    }

    /// Destroys a region, releasing its hold on the pool.
    ///
    /// Returns false if no such region exists.
    pub fn destroy_region(&self, name: &str) -> bool {
        let Some(entry) = self.regions.lock().remove(name) else {
            return false;
        };
        entry.detach();
        tracing::debug!(region = %name, "destroyed region");
        true
    }

    /// Signals that the application is ready to receive subscription events.
    ///
    /// Pending event counts are no longer available afterwards.
    ///
    /// # Errors
    ///
    /// `IllegalState` if the client is not durable or the cache is closed.
    pub fn ready_for_events(&self) -> Result<()> {
        self.ensure_open("signal ready for events")?;
        if !self.context.is_durable() {
            return Err(GridError::IllegalState(
                "ready_for_events is only valid for durable clients".to_string(),
            ));
        }
        if self.context.mark_ready_for_events() {
            tracing::info!(
                durable_client_id = ?self.context.durable_client_id(),
                "ready for events"
            );
        }
        Ok(())
    }

    /// Closes the cache: drops every region, then destroys every pool with
    /// `keep_alive`. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// `Teardown` if one or more pools failed to close.
    pub fn close(&self, keep_alive: bool) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let regions: Vec<RegionEntry> = self.regions.lock().drain().map(|(_, e)| e).collect();
        for entry in regions {
            entry.detach();
        }
        let result = self.registry.close(keep_alive);
        tracing::info!(keep_alive, ok = result.is_ok(), "closed cache");
        result
    }
}
