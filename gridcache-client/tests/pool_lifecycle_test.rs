//! Pool lifecycle: connections, durable subscriptions and destruction.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{registry_with, MockTransport};
use gridcache_client::core::GridError;
use gridcache_client::{Cache, CacheConfig, DurableQueueStatus, PoolConfig};

fn durable_pool(status: DurableQueueStatus) -> (Arc<MockTransport>, Arc<gridcache_client::Pool>) {
    let transport = MockTransport::new();
    transport.set_queue_status(status);
    let registry = registry_with(&transport, Some("feed-client"));
    let pool = registry
        .create_factory()
        .add_locator("loc", 10334)
        .subscription_enabled(true)
        .create("feed")
        .unwrap();
    (transport, pool)
}

#[test]
fn test_pending_event_count_first_connection() {
    let (transport, pool) = durable_pool(DurableQueueStatus::FirstConnection);
    assert_eq!(pool.pending_event_count().unwrap(), -2);
    assert_eq!(
        transport.subscription_client_ids(),
        vec![Some("feed-client".to_string())]
    );
}

#[test]
fn test_pending_event_count_after_durable_timeout() {
    let (_transport, pool) = durable_pool(DurableQueueStatus::Expired);
    assert_eq!(pool.pending_event_count().unwrap(), -1);
}

#[test]
fn test_pending_event_count_with_queued_events() {
    let (_transport, pool) = durable_pool(DurableQueueStatus::Pending(42));
    assert_eq!(pool.pending_event_count().unwrap(), 42);
}

#[test]
fn test_pending_event_count_rejected_after_ready_for_events() {
    let transport = MockTransport::new();
    transport.set_queue_status(DurableQueueStatus::Pending(3));
    let config = CacheConfig::builder()
        .durable_client_id("feed-client")
        .add_pool(
            "feed",
            PoolConfig::builder()
                .add_server("s", 40404)
                .subscription_enabled(true)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let cache = Cache::new(&config, transport.clone()).unwrap();
    let pool = cache.pool_registry().find("feed").unwrap();

    assert_eq!(pool.pending_event_count().unwrap(), 3);
    cache.ready_for_events().unwrap();

    let err = pool.pending_event_count().unwrap_err();
    assert!(err.is_illegal_state());
    assert!(err.to_string().contains("feed"));
}

#[test]
fn test_pending_event_count_requires_subscriptions() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, Some("feed-client"));
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .create("plain")
        .unwrap();

    assert!(pool.pending_event_count().unwrap_err().is_illegal_state());
}

#[test]
fn test_destroy_twice_fails() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .create("p")
        .unwrap();

    pool.destroy().unwrap();
    let err = pool.destroy().unwrap_err();

    assert!(err.is_illegal_state());
    assert!(err.to_string().contains("already been destroyed"));
}

#[test]
fn test_destroyed_pool_rejects_operations_but_answers_properties() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .server_group("east")
        .read_timeout(Duration::from_secs(7))
        .create("p")
        .unwrap();
    pool.destroy().unwrap();

    assert!(pool.acquire_connection().unwrap_err().is_illegal_state());
    assert!(pool.query_service().unwrap_err().is_illegal_state());
    assert!(pool.release_thread_local_connection().unwrap_err().is_illegal_state());
    assert!(pool.pending_event_count().unwrap_err().is_illegal_state());

    assert_eq!(pool.server_group(), "east");
    assert_eq!(pool.read_timeout(), Duration::from_secs(7));
}

#[test]
fn test_destroy_passes_keep_alive_to_transport() {
    common::init_tracing();
    let (transport, pool) = durable_pool(DurableQueueStatus::Pending(0));
    pool.destroy_with_keep_alive(true).unwrap();

    let closed = transport.closed();
    assert_eq!(closed.len(), 2);
    assert!(closed.iter().all(|c| c.keep_alive));
}

#[test]
fn test_region_in_use_blocks_destroy() {
    let transport = MockTransport::new();
    let config = CacheConfig::builder()
        .add_pool("p", PoolConfig::builder().add_server("s", 1).build().unwrap())
        .build()
        .unwrap();
    let cache = Cache::new(&config, transport.clone()).unwrap();
    cache.create_region("r1", Some("p")).unwrap();
    cache.create_region("r2", Some("p")).unwrap();
    let pool = cache.pool_registry().find("p").unwrap();

    let err = pool.destroy().unwrap_err();
    assert!(err.to_string().contains("in use by 2 region(s)"));
    assert!(!pool.is_destroyed());

    cache.destroy_region("r1");
    cache.destroy_region("r2");
    pool.destroy().unwrap();
}

#[test]
fn test_acquire_times_out_when_exhausted() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .min_connections(0)
        .max_connections(2)
        .free_connection_timeout(Duration::from_millis(50))
        .create("small")
        .unwrap();

    let _a = pool.acquire_connection().unwrap();
    let _b = pool.acquire_connection().unwrap();
    let start = Instant::now();
    let err = pool.acquire_connection().unwrap_err();

    assert!(matches!(err, GridError::Timeout(_)));
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(pool.connection_count(), 2);
}

#[test]
fn test_waiting_acquire_gets_released_connection() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .max_connections(1)
        .free_connection_timeout(Duration::from_secs(5))
        .create("single")
        .unwrap();

    let held = pool.acquire_connection().unwrap();
    let held_id = held.id();
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire_connection().map(|c| c.id()))
    };
    thread::sleep(Duration::from_millis(30));
    drop(held);

    assert_eq!(waiter.join().unwrap().unwrap(), held_id);
}

#[test]
fn test_destroy_wakes_waiting_acquire() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .max_connections(1)
        .free_connection_timeout(Duration::from_secs(5))
        .create("single")
        .unwrap();

    let held = pool.acquire_connection().unwrap();
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire_connection().map(|c| c.id()))
    };
    thread::sleep(Duration::from_millis(30));
    pool.destroy().unwrap();

    assert!(waiter.join().unwrap().unwrap_err().is_illegal_state());
    drop(held);
    assert_eq!(pool.connection_count(), 0);
}

#[test]
fn test_thread_local_connections_stay_with_thread() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .min_connections(0)
        .thread_local_connections(true)
        .create("tl")
        .unwrap();

    let main_id = pool.acquire_connection().unwrap().id();
    assert_eq!(pool.acquire_connection().unwrap().id(), main_id);

    let other_id = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire_connection().map(|c| c.id()))
            .join()
            .unwrap()
            .unwrap()
    };
    assert_ne!(other_id, main_id);
    assert_eq!(transport.opened().len(), 2);

    pool.release_thread_local_connection().unwrap();
    assert_eq!(pool.idle_connection_count(), 1);
}

#[test]
fn test_initial_connection_failure_does_not_fail_creation() {
    common::init_tracing();
    let transport = MockTransport::new();
    transport.refuse("down:1");
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("down", 1)
        .min_connections(2)
        .create("p")
        .unwrap();

    assert_eq!(pool.connection_count(), 0);
    let err = pool.acquire_connection().unwrap_err();
    assert!(matches!(err, GridError::Connection(_)));
    assert_eq!(pool.connection_count(), 0);
}

#[test]
fn test_connections_round_robin_over_servers() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    registry
        .create_factory()
        .add_server("a", 1)
        .add_server("b", 2)
        .min_connections(4)
        .create("rr")
        .unwrap();

    assert_eq!(transport.opened(), vec!["a:1", "b:2", "a:1", "b:2"]);
}

#[test]
fn test_query_service_scoped_to_server_group() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s", 1)
        .server_group("analytics")
        .create("q")
        .unwrap();

    let service = pool.query_service().unwrap();
    let query = service.new_query("SELECT * FROM /trades").unwrap();
    assert_eq!(service.server_group(), "analytics");
    assert_eq!(query.pool_name(), "q");
}
