//! Query handles scoped to a pool's server group.
//!
//! Execution belongs to the server; this module only carries the query text
//! and the routing information a transport needs to send it.

use gridcache_core::{GridError, Result};

/// Creates queries routed through one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryService {
    pool_name: String,
    server_group: String,
}

impl QueryService {
    pub(crate) fn new(pool_name: impl Into<String>, server_group: impl Into<String>) -> Self {
        Self {
            pool_name: pool_name.into(),
            server_group: server_group.into(),
        }
    }

    /// Returns the name of the pool queries are sent through.
    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    /// Returns the server group queries run on; empty means every server.
    pub fn server_group(&self) -> &str {
        &self.server_group
    }

    /// Prepares a query.
    ///
    /// # Errors
    ///
    /// `IllegalState` if `text` is blank.
    pub fn new_query(&self, text: impl Into<String>) -> Result<Query> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(GridError::IllegalState(format!(
                "pool '{}': query text must not be empty",
                self.pool_name
            )));
        }
        Ok(Query {
            text,
            pool_name: self.pool_name.clone(),
            server_group: self.server_group.clone(),
        })
    }
}

/// A prepared query bound to a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    pool_name: String,
    server_group: String,
}

impl Query {
    /// Returns the query text.
    pub fn query_string(&self) -> &str {
        &self.text
    }

    /// Returns the name of the pool the query is sent through.
    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    /// Returns the server group the query runs on.
    pub fn server_group(&self) -> &str {
        &self.server_group
    }
}
