//! Persistence Integration Tests
//!
//! Chains written through the JSON file store survive a registry restart,
//! clearing removes the persisted record, and abandoned callers never leave a
//! half-applied mutation behind.

mod common;

use common::fixtures::write_manifest;
use common::{aid, cid, lvl, pairs, SlowChainStore, TestRegistry};
use lod_registry_db::{ChainStore, InMemoryCatalog, InMemoryEventStore, JsonFileChainStore};
use lod_registry_service::{DefaultLodChainRegistry, LodChainRegistry, RegistryConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_chains_reload_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(JsonFileChainStore::open(dir.path()).await.unwrap());
        let t = TestRegistry::with_store(store);
        let c1 = t.seed("c1", &["a1", "a2"]);
        t.registry.register_asset(&c1, &aid("a2"), lvl(4)).await.unwrap();
        t.registry.register_asset(&c1, &aid("a1"), lvl(0)).await.unwrap();
    }

    let store = Arc::new(JsonFileChainStore::open(dir.path()).await.unwrap());
    let t = TestRegistry::with_store(store);
    let c1 = t.seed("c1", &["a1", "a2"]);

    let chain = t.registry.get_chain(&c1).await.unwrap();
    assert_eq!(
        pairs(&chain),
        vec![(0, "a1".to_string()), (4, "a2".to_string())]
    );
    assert_eq!(t.registry.list_collections().await.unwrap(), vec![c1.clone()]);

    // Reloaded chains still enforce uniqueness.
    let err = t
        .registry
        .register_asset(&c1, &aid("a2"), lvl(0))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_registry_over_manifest_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), &[("c1", &["a1", "a2"][..]), ("c2", &[][..])]);

    let catalog = Arc::new(InMemoryCatalog::from_json_file(&manifest).await.unwrap());
    let store = Arc::new(JsonFileChainStore::open(dir.path().join("chains")).await.unwrap());
    let registry = DefaultLodChainRegistry::builder()
        .catalog(catalog)
        .store(store)
        .event_store(Arc::new(InMemoryEventStore::new(16)))
        .config(RegistryConfig::default())
        .build()
        .unwrap();

    registry
        .register_asset(&cid("c1"), &aid("a1"), lvl(0))
        .await
        .unwrap();
    assert!(registry.get_chain(&cid("c2")).await.unwrap().is_empty());

    let err = registry
        .register_asset(&cid("c2"), &aid("a1"), lvl(0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    registry.health_check().await.unwrap();
}

#[tokio::test]
async fn test_collection_deletion_clears_persisted_chain() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileChainStore::open(dir.path()).await.unwrap());
    let t = TestRegistry::with_store(store.clone());
    let c1 = t.seed("c1", &["a1"]);
    t.registry.register_asset(&c1, &aid("a1"), lvl(0)).await.unwrap();
    assert!(store.load(&c1).await.unwrap().is_some());

    // The collection store deletes the collection, then calls the hook.
    t.catalog.remove_collection(&c1);
    t.registry.clear(&c1).await.unwrap();

    assert!(store.load(&c1).await.unwrap().is_none());
    assert!(store.list_collections().await.unwrap().is_empty());

    // Later registrations against the deleted collection are refused.
    let err = t
        .registry
        .register_asset(&c1, &aid("a1"), lvl(0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let events = t.registry.collection_events(&c1, 5).await.unwrap();
    assert_eq!(events[0].event_name(), "chain_cleared");
}

#[tokio::test]
async fn test_abandoned_mutation_is_all_or_nothing() {
    let store = Arc::new(SlowChainStore::new(Duration::from_millis(100)));
    let t = TestRegistry::with_store(store.clone());
    let c1 = t.seed("c1", &["a1", "a2"]);

    // Give up long before the store finishes writing.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        t.registry.register_asset(&c1, &aid("a1"), lvl(0)),
    )
    .await;
    assert!(abandoned.is_err());

    // The next mutation waits for the in-flight commit, then applies on top.
    let chain = t.registry.register_asset(&c1, &aid("a2"), lvl(1)).await.unwrap();
    assert_eq!(
        pairs(&chain),
        vec![(0, "a1".to_string()), (1, "a2".to_string())]
    );

    let persisted = store.inner.load(&c1).await.unwrap().unwrap();
    assert_eq!(persisted, chain);
}

#[tokio::test]
async fn test_long_collection_id_round_trips_through_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let long_id = "c".repeat(200);

    {
        let store = Arc::new(JsonFileChainStore::open(dir.path()).await.unwrap());
        let t = TestRegistry::with_store(store);
        let c = t.seed(&long_id, &["a1", "a2"]);
        assert!(t.registry.get_chain(&c).await.unwrap().is_empty());
        t.registry.register_asset(&c, &aid("a1"), lvl(0)).await.unwrap();
        t.registry.register_asset(&c, &aid("a2"), lvl(2)).await.unwrap();
    }

    let store = Arc::new(JsonFileChainStore::open(dir.path()).await.unwrap());
    let t = TestRegistry::with_store(store);
    let c = t.seed(&long_id, &["a1", "a2"]);

    let chain = t.registry.get_chain(&c).await.unwrap();
    assert_eq!(
        pairs(&chain),
        vec![(0, "a1".to_string()), (2, "a2".to_string())]
    );
    assert_eq!(t.registry.list_collections().await.unwrap(), vec![c.clone()]);

    t.registry.clear(&c).await.unwrap();
    assert!(t.registry.list_collections().await.unwrap().is_empty());
}
