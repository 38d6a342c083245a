//! Endpoint selection for new connections.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A strategy for choosing the endpoint of the next connection.
pub trait LoadBalancer: Send + Sync {
    /// Selects an endpoint from the given list.
    ///
    /// Returns `None` if the list is empty.
    fn select<'a>(&self, endpoints: &'a [String]) -> Option<&'a str>;
}

impl std::fmt::Debug for dyn LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoadBalancer")
    }
}

/// Cycles through endpoints in order, wrapping around at the end.
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalancer {
    index: AtomicUsize,
}

impl RoundRobinLoadBalancer {
    /// Creates a new round-robin load balancer.
    pub fn new() -> Self {
        Self {
            index: AtomicUsize::new(0),
        }
    }
}

impl LoadBalancer for RoundRobinLoadBalancer {
    fn select<'a>(&self, endpoints: &'a [String]) -> Option<&'a str> {
        if endpoints.is_empty() {
            return None;
        }
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % endpoints.len();
        Some(&endpoints[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Vec<String> {
        vec!["a:1".to_string(), "b:2".to_string(), "c:3".to_string()]
    }

    #[test]
    fn test_round_robin_cycles() {
        let lb = RoundRobinLoadBalancer::new();
        let endpoints = endpoints();
        let picked: Vec<_> = (0..4).filter_map(|_| lb.select(&endpoints)).collect();
        assert_eq!(picked, vec!["a:1", "b:2", "c:3", "a:1"]);
    }

    #[test]
    fn test_round_robin_empty() {
        let lb = RoundRobinLoadBalancer::new();
        assert!(lb.select(&[]).is_none());
    }
}
