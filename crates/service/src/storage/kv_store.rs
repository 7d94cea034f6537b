use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ServiceError;
use crate::storage::json_map_store::JsonMapStore;

/// Durable key-value storage the session store persists its snapshot into.
/// Implementations can be file-backed, in-memory, or a remote KV.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value) -> Result<(), ServiceError>;
    async fn remove(&self, key: &str) -> Result<bool, ServiceError>;
}

#[async_trait]
impl KvStore for JsonMapStore<String, Value> {
    async fn get(&self, key: &str) -> Option<Value> { JsonMapStore::get(self, &key.to_string()).await }
    async fn set(&self, key: &str, value: Value) -> Result<(), ServiceError> { self.insert(key.to_string(), value).await }
    async fn remove(&self, key: &str) -> Result<bool, ServiceError> { JsonMapStore::remove(self, &key.to_string()).await }
}

/// Simple in-memory store for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryKvStore {
        entries: Mutex<HashMap<String, Value>>,
        fail_writes: AtomicBool,
        writes: AtomicUsize,
    }

    impl MemoryKvStore {
        /// Seed the store with an existing entry, as if left by a previous run.
        pub fn with_entry(key: &str, value: Value) -> Self {
            let store = Self::default();
            store.entries.lock().unwrap().insert(key.to_string(), value);
            store
        }

        /// Make every subsequent `set` fail until switched back.
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Number of successful `set` calls so far.
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn snapshot(&self, key: &str) -> Option<Value> {
            self.entries.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl KvStore for MemoryKvStore {
        async fn get(&self, key: &str) -> Option<Value> {
            self.snapshot(key)
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), ServiceError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ServiceError::Storage("injected write failure".into()));
            }
            self.entries.lock().unwrap().insert(key.to_string(), value);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<bool, ServiceError> {
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MemoryKvStore;
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn file_store_through_trait_object() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("kv_store_{}.json", uuid::Uuid::new_v4()));
        let store: Arc<dyn KvStore> = JsonMapStore::<String, Value>::new(&tmp).await?;

        assert!(store.get("app_state").await.is_none());
        store.set("app_state", json!({"version": 0})).await?;
        assert_eq!(store.get("app_state").await, Some(json!({"version": 0})));
        assert!(store.remove("app_state").await?);
        assert!(store.get("app_state").await.is_none());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn memory_store_injected_failure() {
        let store = MemoryKvStore::default();
        store.fail_writes(true);
        assert!(store.set("k", json!(1)).await.is_err());
        assert_eq!(store.write_count(), 0);

        store.fail_writes(false);
        store.set("k", json!(1)).await.unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get("k").await, Some(json!(1)));
    }
}
