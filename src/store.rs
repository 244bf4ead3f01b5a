//! Record store abstraction
//!
//! A record store addresses one item per partition key and supports the
//! point operations the repository needs. Each call is atomic for the single
//! item it touches; nothing spans more than one item.

use crate::error::StoreError;
use crate::profile::Item;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Outcome of a conditional attribute removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The item existed and the attributes are gone
    Applied,
    /// No item exists under the key; nothing was written
    Missing,
}

/// Key-value store keyed by a single partition key
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point read. `Ok(None)` when no item exists.
    async fn get(&self, key: &str) -> Result<Option<Item>, StoreError>;

    /// Full overwrite of the item under `key`
    async fn put(&self, key: &str, item: Item) -> Result<(), StoreError>;

    /// Removes `attributes` from an existing item, keeping the key
    async fn remove_attributes(
        &self,
        key: &str,
        attributes: &[&str],
    ) -> Result<Removal, StoreError>;

    /// Sets `attributes` on the item, creating it when absent
    async fn set_attributes(&self, key: &str, attributes: Item) -> Result<(), StoreError>;
}

/// In-process store for tests and local development
#[derive(Debug)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Item>>,
    key_attribute: String,
}

impl MemoryStore {
    /// Creates an empty store whose items carry the key under `key_attribute`
    pub fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            key_attribute: key_attribute.into(),
        }
    }

    /// Number of items held
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Item>, StoreError> {
        let item = self.items.read().await.get(key).cloned();
        debug!(key = %key, found = item.is_some(), "memory get");
        Ok(item)
    }

    async fn put(&self, key: &str, mut item: Item) -> Result<(), StoreError> {
        item.insert(self.key_attribute.clone(), key.to_string());
        self.items.write().await.insert(key.to_string(), item);
        debug!(key = %key, "memory put");
        Ok(())
    }

    async fn remove_attributes(
        &self,
        key: &str,
        attributes: &[&str],
    ) -> Result<Removal, StoreError> {
        let mut items = self.items.write().await;
        let Some(item) = items.get_mut(key) else {
            debug!(key = %key, "memory remove on missing item");
            return Ok(Removal::Missing);
        };
        for attribute in attributes {
            if *attribute != self.key_attribute {
                item.remove(*attribute);
            }
        }
        debug!(key = %key, removed = attributes.len(), "memory remove");
        Ok(Removal::Applied)
    }

    async fn set_attributes(&self, key: &str, attributes: Item) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        let item = items.entry(key.to_string()).or_insert_with(|| {
            let mut fresh = Item::new();
            fresh.insert(self.key_attribute.clone(), key.to_string());
            fresh
        });
        for (name, value) in attributes {
            if name != self.key_attribute {
                item.insert(name, value);
            }
        }
        debug!(key = %key, "memory set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, &str)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new("CPF");
        store
            .put("1", item(&[("CPF", "1"), ("Name", "a"), ("Email", "e")]))
            .await
            .unwrap();
        store.put("1", item(&[("CPF", "1"), ("Name", "b")])).await.unwrap();

        let stored = store.get("1").await.unwrap().unwrap();
        assert_eq!(stored, item(&[("CPF", "1"), ("Name", "b")]));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_attributes_keeps_key() {
        let store = MemoryStore::new("CPF");
        store.put("1", item(&[("Name", "a")])).await.unwrap();

        let outcome = store.remove_attributes("1", &["Name", "CPF"]).await.unwrap();
        assert_eq!(outcome, Removal::Applied);
        assert_eq!(store.get("1").await.unwrap(), Some(item(&[("CPF", "1")])));
    }

    #[tokio::test]
    async fn test_remove_attributes_on_missing_item() {
        let store = MemoryStore::new("CPF");
        let outcome = store.remove_attributes("nope", &["Name"]).await.unwrap();
        assert_eq!(outcome, Removal::Missing);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_attributes_creates_and_patches() {
        let store = MemoryStore::new("CPF");
        store.set_attributes("1", item(&[("Name", "a")])).await.unwrap();
        store.set_attributes("1", item(&[("Email", "e")])).await.unwrap();

        let stored = store.get("1").await.unwrap().unwrap();
        assert_eq!(stored, item(&[("CPF", "1"), ("Name", "a"), ("Email", "e")]));
    }
}
