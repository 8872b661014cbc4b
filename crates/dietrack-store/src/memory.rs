use std::collections::HashMap;

use parking_lot::Mutex;

use dietrack_core::Scope;

use crate::error::StoreError;
use crate::kv::DefinitionStore;

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    persistent: bool,
}

/// In-memory definition store, used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(Scope, String), Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DefinitionStore for MemoryStore {
    fn get(&self, key: &str, scope: Scope) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock();
        Ok(entries.get(&(scope, key.to_string())).map(|e| e.value.clone()))
    }

    fn put(&self, key: &str, value: &str, scope: Scope) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries
            .entry((scope, key.to_string()))
            .and_modify(|e| e.value = value.to_string())
            .or_insert_with(|| Entry {
                value: value.to_string(),
                persistent: false,
            });
        Ok(())
    }

    fn exists(&self, key: &str, scope: Scope) -> Result<bool, StoreError> {
        let entries = self.entries.lock();
        Ok(entries.contains_key(&(scope, key.to_string())))
    }

    fn mark_persistent(&self, key: &str, scope: Scope) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&(scope, key.to_string())) {
            entry.persistent = true;
        }
        Ok(())
    }

    fn clear_volatile(&self, scope: Scope) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.retain(|(s, _), e| *s != scope || e.persistent);
        Ok(())
    }
}
