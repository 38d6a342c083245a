//! Connections and the transport seam pools open them through.

mod connection;
mod load_balancer;
mod transport;

pub use connection::{Connection, ConnectionId, DurableQueueStatus};
pub use load_balancer::{LoadBalancer, RoundRobinLoadBalancer};
pub use transport::Transport;
