//! In-process partition store.
//!
//! Not durable; used by tests and by hosts that do not need entries to
//! survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheStore, StoredResponse};
use crate::Error;

/// In-memory [`CacheStore`] keeping partitions in creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<Vec<(String, HashMap<String, StoredResponse>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        if !partitions.iter().any(|(n, _)| n == name) {
            partitions.push((name.to_string(), HashMap::new()));
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.partitions.read().await.iter().any(|(n, _)| n == name))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.partitions.read().await.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|(n, _)| n != name);
        Ok(partitions.len() != before)
    }

    async fn lookup(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, entries)| entries.get(key).cloned()))
    }

    async fn lookup_any(&self, key: &str) -> Result<Option<(String, StoredResponse)>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find_map(|(n, entries)| entries.get(key).map(|e| (n.clone(), e.clone()))))
    }

    async fn put(&self, name: &str, entry: StoredResponse) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        match partitions.iter_mut().find(|(n, _)| n == name) {
            Some((_, entries)) => {
                entries.insert(entry.key.clone(), entry);
            }
            None => {
                let mut entries = HashMap::new();
                entries.insert(entry.key.clone(), entry);
                partitions.push((name.to_string(), entries));
            }
        }
        Ok(())
    }

    async fn remove(&self, name: &str, key: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        Ok(partitions
            .iter_mut()
            .find(|(n, _)| n == name)
            .is_some_and(|(_, entries)| entries.remove(key).is_some()))
    }

    async fn entries(&self, name: &str) -> Result<Vec<StoredResponse>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entries)| entries.values().cloned().collect())
            .unwrap_or_default())
    }
}
