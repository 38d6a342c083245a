//! The cache-wide table of named pools.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use gridcache_core::{GridError, Result, TeardownFailure};
use parking_lot::ReentrantMutex;

use super::{Pool, PoolFactory};
use crate::cache::{CacheContext, Region};

#[derive(Debug, Default)]
struct RegistryState {
    pools: HashMap<String, Arc<Pool>>,
    default_pool: Option<Arc<Pool>>,
}

impl RegistryState {
    fn remove(&mut self, name: &str) -> Option<Arc<Pool>> {
        let removed = self.pools.remove(name)?;
        if self
            .default_pool
            .as_ref()
            .is_some_and(|p| Arc::ptr_eq(p, &removed))
        {
            self.default_pool = None;
        }
        Some(removed)
    }
}

#[derive(Debug)]
pub(crate) struct RegistryInner {
    state: ReentrantMutex<RefCell<RegistryState>>,
    context: Arc<CacheContext>,
}

impl RegistryInner {
    pub(crate) fn context(&self) -> &Arc<CacheContext> {
        &self.context
    }

    /// Drops the registration of `pool`, if this exact pool is registered.
    pub(crate) fn deregister(&self, pool: &Pool) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let registered = state
            .pools
            .get(pool.name())
            .is_some_and(|p| std::ptr::eq(Arc::as_ptr(p), pool));
        if registered {
            state.remove(pool.name());
            tracing::debug!(pool = %pool.name(), "deregistered pool");
        }
    }
}

/// Owns the named pools of one cache.
///
/// Every operation takes the same reentrant lock, so a pool that removes
/// itself while the registry is closing re-enters without deadlocking.
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    inner: Arc<RegistryInner>,
}

impl PoolRegistry {
    /// Creates an empty registry bound to a cache context.
    pub fn new(context: Arc<CacheContext>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: ReentrantMutex::new(RefCell::new(RegistryState::default())),
                context,
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Arc<RegistryInner> {
        &self.inner
    }

    /// Registers a pool under `name`.
    ///
    /// The first pool registered while no default is set becomes the
    /// default pool.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if the name is taken; the existing registration is
    /// kept. `IllegalState` if `name` differs from the pool's own name or the
    /// pool is already destroyed.
    pub fn add_pool(&self, name: &str, pool: Arc<Pool>) -> Result<()> {
        if pool.name() != name {
            return Err(GridError::IllegalState(format!(
                "cannot register pool '{}' under the name '{}'",
                pool.name(),
                name
            )));
        }
        if pool.is_destroyed() {
            return Err(GridError::IllegalState(format!(
                "pool '{}' has been destroyed; cannot register it",
                name
            )));
        }

        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();
        if state.pools.contains_key(name) {
            return Err(GridError::DuplicateName(name.to_string()));
        }
        if state.default_pool.is_none() {
            state.default_pool = Some(Arc::clone(&pool));
        }
        state.pools.insert(name.to_string(), pool);
        tracing::debug!(pool = %name, count = state.pools.len(), "registered pool");
        Ok(())
    }

    /// Returns the pool registered under `name`.
    pub fn find(&self, name: &str) -> Option<Arc<Pool>> {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        state.pools.get(name).cloned()
    }

    /// Returns the pool the region is attached to, if it has one and that
    /// pool is registered.
    pub fn find_by_region(&self, region: &dyn Region) -> Option<Arc<Pool>> {
        region.attached_pool_name().and_then(|name| self.find(name))
    }

    /// Returns the default pool.
    pub fn default_pool(&self) -> Option<Arc<Pool>> {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        state.default_pool.clone()
    }

    /// Returns a snapshot of the name to pool table.
    pub fn get_all(&self) -> HashMap<String, Arc<Pool>> {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        state.pools.clone()
    }

    /// Returns the number of registered pools.
    pub fn len(&self) -> usize {
        let guard = self.inner.state.lock();
        let len = guard.borrow().pools.len();
        len
    }

    /// Returns true if no pool is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregisters the pool named `name` without destroying it.
    ///
    /// Unknown names are ignored.
    pub fn remove_pool(&self, name: &str) {
        let guard = self.inner.state.lock();
        if guard.borrow_mut().remove(name).is_some() {
            tracing::debug!(pool = %name, "removed pool");
        }
    }

    /// Destroys every registered pool with the same `keep_alive` and
    /// empties the registry.
    ///
    /// A failing pool does not stop the others from being destroyed.
    ///
    /// # Errors
    ///
    /// `Teardown` listing every pool that failed, with its cause.
    pub fn close(&self, keep_alive: bool) -> Result<()> {
        let guard = self.inner.state.lock();
        let pools: Vec<Arc<Pool>> = {
            let mut state = guard.borrow_mut();
            state.default_pool = None;
            state.pools.drain().map(|(_, pool)| pool).collect()
        };

        let total = pools.len();
        let failures: Vec<TeardownFailure> = pools
            .into_iter()
            .filter_map(|pool| match pool.teardown(keep_alive) {
                // Destroyed directly while the registry was closing.
                None => {
                    tracing::debug!(pool = %pool.name(), "pool already destroyed, skipping");
                    None
                }
                Some(Ok(())) => None,
                Some(Err(e)) => {
                    tracing::warn!(pool = %pool.name(), error = %e, "pool teardown failed");
                    Some(TeardownFailure::new(pool.name(), e))
                }
            })
            .collect();
        drop(guard);

        tracing::info!(
            pools = total,
            failed = failures.len(),
            keep_alive,
            "closed pool registry"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(GridError::Teardown(failures))
        }
    }

    /// Returns a factory that creates pools registered here.
    pub fn create_factory(&self) -> PoolFactory {
        PoolFactory::new(self.clone())
    }
}
