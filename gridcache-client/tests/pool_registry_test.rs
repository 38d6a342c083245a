//! Registry behaviour across pool creation, lookup and bulk teardown.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{registry_with, unique_name, MockTransport};
use gridcache_client::core::GridError;
use gridcache_client::{Cache, CacheConfig, PoolConfig, Region};

#[test]
fn test_add_then_find_returns_same_pool() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let name = unique_name("orders");

    let pool = registry
        .create_factory()
        .add_server("s1", 40404)
        .create(&name)
        .unwrap();

    assert!(Arc::ptr_eq(&registry.find(&name).unwrap(), &pool));
    assert!(registry.find("unknown").is_none());
}

#[test]
fn test_duplicate_add_keeps_first_registration() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let factory = registry.create_factory().add_server("s1", 40404);
    let first = factory.create("p").unwrap();

    let other = registry_with(&transport, None)
        .create_factory()
        .add_server("s2", 40404)
        .create("p")
        .unwrap();
    let err = registry.add_pool("p", other).unwrap_err();

    assert!(matches!(err, GridError::DuplicateName(ref n) if n == "p"));
    let found = registry.find("p").unwrap();
    assert!(Arc::ptr_eq(&found, &first));
    assert_eq!(found.servers(), ["s1:40404"]);
}

#[test]
fn test_get_all_unchanged_by_find() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let factory = registry.create_factory().add_server("s1", 40404);
    factory.create("a").unwrap();
    factory.create("b").unwrap();

    let before = registry.get_all();
    let _ = registry.find("a");
    let _ = registry.find("missing");
    let after = registry.get_all();

    assert_eq!(before.len(), after.len());
    for (name, pool) in &before {
        assert!(Arc::ptr_eq(pool, &after[name]));
    }
}

#[test]
fn test_get_all_is_a_snapshot() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    registry
        .create_factory()
        .add_server("s1", 40404)
        .create("a")
        .unwrap();

    let snapshot = registry.get_all();
    registry.remove_pool("a");

    assert!(snapshot.contains_key("a"));
    assert!(registry.get_all().is_empty());
}

#[test]
fn test_close_destroys_every_pool_despite_failure() {
    common::init_tracing();
    let transport = MockTransport::new();
    transport.fail_close("bad:1");
    let registry = registry_with(&transport, None);

    let mut pools = Vec::new();
    for i in 0..5 {
        let host = if i == 2 { "bad".to_string() } else { format!("s{i}") };
        let pool = registry
            .create_factory()
            .add_server(&host, 1)
            .create(&format!("pool-{i}"))
            .unwrap();
        pools.push(pool);
    }

    let err = registry.close(true).unwrap_err();

    match &err {
        GridError::Teardown(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].pool(), "pool-2");
            assert!(matches!(failures[0].error(), GridError::Connection(_)));
        }
        other => panic!("expected teardown error, got {other:?}"),
    }
    assert!(pools.iter().all(|p| p.is_destroyed()));
    assert!(registry.is_empty());
    assert!(registry.default_pool().is_none());

    let closed = transport.closed();
    assert_eq!(closed.len(), 4);
    assert!(closed.iter().all(|c| c.keep_alive));
}

#[test]
fn test_close_records_teardown_timeout_and_continues() {
    common::init_tracing();
    let transport = MockTransport::new();
    transport.slow_close("slow:1", Duration::from_millis(500));
    let registry = registry_with(&transport, None);

    let slow = registry
        .create_factory()
        .add_server("slow", 1)
        .destroy_timeout(Duration::from_millis(50))
        .create("slow")
        .unwrap();
    let fast = registry
        .create_factory()
        .add_server("fast", 1)
        .create("fast")
        .unwrap();

    let err = registry.close(false).unwrap_err();

    let GridError::Teardown(failures) = &err else {
        panic!("expected teardown error, got {err:?}");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].pool(), "slow");
    assert!(matches!(failures[0].error(), GridError::Timeout(_)));
    assert!(slow.is_destroyed());
    assert!(fast.is_destroyed());
    assert!(err.to_string().contains("slow"));
}

#[test]
fn test_lookups_during_close_do_not_deadlock() {
    let transport = MockTransport::new();
    transport.slow_close("s1:1", Duration::from_millis(20));
    let registry = registry_with(&transport, None);
    let factory = registry.create_factory().add_server("s1", 1);
    for i in 0..4 {
        factory.create(&format!("p{i}")).unwrap();
    }

    let reader = {
        let registry = registry.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let _ = registry.find("p1");
                let _ = registry.default_pool();
                let _ = registry.get_all();
            }
        })
    };
    registry.close(false).unwrap();
    reader.join().unwrap();

    assert!(registry.is_empty());
}

#[test]
fn test_destroyed_pool_leaves_registry_and_default() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s1", 1)
        .create("only")
        .unwrap();
    assert!(Arc::ptr_eq(&registry.default_pool().unwrap(), &pool));

    pool.destroy().unwrap();

    assert!(registry.find("only").is_none());
    assert!(registry.default_pool().is_none());
    assert_eq!(pool.name(), "only");
    assert_eq!(pool.servers(), ["s1:1"]);
}

#[test]
fn test_destroyed_pool_cannot_be_registered() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport, None);
    let pool = registry
        .create_factory()
        .add_server("s1", 1)
        .create("p")
        .unwrap();
    pool.destroy().unwrap();

    let err = registry.add_pool("p", pool).unwrap_err();
    assert!(err.is_illegal_state());
}

#[test]
fn test_find_by_region_through_cache() {
    let transport = MockTransport::new();
    let config = CacheConfig::builder()
        .add_pool(
            "east",
            PoolConfig::builder().add_locator("loc", 10334).build().unwrap(),
        )
        .add_pool(
            "west",
            PoolConfig::builder().add_server("w", 40404).build().unwrap(),
        )
        .build()
        .unwrap();
    let cache = Cache::new(&config, transport.clone()).unwrap();

    let region = cache.create_region("trades", Some("west")).unwrap();
    assert_eq!(region.name(), "trades");
    let pool = cache.pool_registry().find_by_region(&*region).unwrap();
    assert_eq!(pool.name(), "west");

    cache.close(false).unwrap();
    assert!(cache.pool_registry().find_by_region(&*region).is_none());
}
