mod support;

use std::sync::{Arc, Barrier};
use std::thread;

use aside_cache::{CacheConfig, CacheError, CacheRegistry};

use support::FakeStore;

#[test]
fn racing_first_access_builds_one_client() {
    let registry = Arc::new(CacheRegistry::new(CacheConfig::default()));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_instance("cache.internal:6380").unwrap()
            })
        })
        .collect();

    let clients: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(clients.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(registry.len(), 1);
}

#[test]
fn registry_clients_talk_to_their_endpoint() {
    let store = FakeStore::start();
    let registry = CacheRegistry::new(CacheConfig::default());

    let cache = registry.get_instance(store.addr()).unwrap();
    cache.put_value("k", "v").unwrap();

    let again = registry.get_instance(store.addr()).unwrap();
    let value: String = again.get_or_load("k", || Ok::<_, CacheError>("loaded".into())).unwrap();
    assert_eq!(value, "v");
}

#[test]
fn malformed_endpoints_are_rejected() {
    let registry = CacheRegistry::new(CacheConfig::default());
    for bad in ["", "host:", "host:notaport", ":6379"] {
        assert!(matches!(
            registry.get_instance(bad),
            Err(CacheError::InvalidEndpoint { .. })
        ));
    }
    assert!(registry.is_empty());
}
