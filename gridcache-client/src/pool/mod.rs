//! Named connection pools and the registry that owns them.

mod factory;
#[allow(clippy::module_inception)]
mod pool;
mod registry;

pub use factory::PoolFactory;
pub use pool::{Pool, PooledConnection};
pub use registry::PoolRegistry;
