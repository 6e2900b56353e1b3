use std::collections::HashMap;

use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;
use parking_lot::RwLock;

use super::KeyValueStore;

/// In-memory `KeyValueStore`.
#[derive(Debug, Default)]
pub struct StaticStore {
    entries: RwLock<HashMap<String, String>>,
}

impl StaticStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for StaticStore {
    async fn get(&self, key: &str) -> CycoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }
}
