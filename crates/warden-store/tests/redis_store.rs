//! Integration tests for the Redis store.
//!
//! These need a live server, so they're ignored by default. Run with:
//!
//! ```text
//! REDIS_URL=redis://127.0.0.1:6379/15 cargo test -p warden-store -- --ignored
//! ```

#[cfg(feature = "redis")]
mod redis {
    use std::time::Duration;

    use warden_store::{RedisStore, RedisStoreConfig, SessionStore};

    async fn connect() -> RedisStore {
        let url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
        RedisStore::connect(&RedisStoreConfig {
            url,
            ..RedisStoreConfig::default()
        })
        .await
        .expect("redis should be reachable")
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_string_round_trip_with_ttl() {
        let store = connect().await;
        let key = "warden-test:string";

        store
            .set_ex(key, "hello", Duration::from_secs(60))
            .await
            .unwrap();
        let stored = store.get_with_ttl(key).await.unwrap().unwrap();

        assert_eq!(stored.value, "hello");
        let ttl = stored.ttl.expect("key should carry a TTL");
        assert!(ttl <= Duration::from_secs(60));
        assert!(store.delete(key).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_replace_ex_skips_missing_key() {
        let store = connect().await;
        let key = "warden-test:missing";
        store.delete(key).await.unwrap();

        let replaced = store
            .replace_ex(key, "x", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!replaced);
        assert!(!store.exists(key).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_scan_prefix_finds_sets() {
        let store = connect().await;
        store.set_add("warden-test-scan:1", "a").await.unwrap();
        store.set_add("warden-test-scan:2", "b").await.unwrap();

        let keys = store.scan_prefix("warden-test-scan:").await.unwrap();

        assert_eq!(keys, vec!["warden-test-scan:1", "warden-test-scan:2"]);
        store.delete("warden-test-scan:1").await.unwrap();
        store.delete("warden-test-scan:2").await.unwrap();
    }
}
