use std::sync::Arc;

use tracing::{info, warn};

use dietrack_core::Scope;
use dietrack_store::{keys, DefinitionStore, StoreError};

use crate::error::EngineError;

/// Handle over the global "down-bins allowed" flag.
///
/// The flag gates whether any tracker's committed value may change after its
/// first write. It lives at lot scope, is marked persistent, and is never
/// reset mid-run: once configured, a conflicting reconfigure is ignored.
#[derive(Clone)]
pub struct DownBinPolicy {
    store: Arc<dyn DefinitionStore>,
}

impl DownBinPolicy {
    pub fn new(store: Arc<dyn DefinitionStore>) -> Self {
        Self { store }
    }

    /// Whether down-bins are currently allowed. Defaults to true when the
    /// flag was never configured.
    pub fn allowed(&self) -> Result<bool, EngineError> {
        match self.store.get(keys::DOWN_BIN_POLICY, Scope::Lot)? {
            None => Ok(true),
            Some(raw) => raw.parse().map_err(|_| {
                EngineError::Store(StoreError::Serialization(format!(
                    "down-bin policy flag holds `{raw}`, expected a boolean"
                )))
            }),
        }
    }

    /// Configure the flag for the remainder of the run. The first call wins;
    /// a later call with a different value is ignored with a warning.
    pub fn configure(&self, allowed: bool) -> Result<(), EngineError> {
        if let Some(existing) = self.store.get(keys::DOWN_BIN_POLICY, Scope::Lot)? {
            if existing != allowed.to_string() {
                warn!(
                    existing = %existing,
                    requested = allowed,
                    "down-bin policy already configured; keeping existing value"
                );
            }
            return Ok(());
        }
        self.store
            .put(keys::DOWN_BIN_POLICY, &allowed.to_string(), Scope::Lot)?;
        self.store.mark_persistent(keys::DOWN_BIN_POLICY, Scope::Lot)?;
        info!(allowed, "down-bin policy configured");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dietrack_store::MemoryStore;

    fn policy() -> DownBinPolicy {
        DownBinPolicy::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn defaults_to_allowed() {
        assert!(policy().allowed().unwrap());
    }

    #[test]
    fn configure_then_read() {
        let policy = policy();
        policy.configure(false).unwrap();
        assert!(!policy.allowed().unwrap());
    }

    #[test]
    fn first_configure_wins() {
        let policy = policy();
        policy.configure(false).unwrap();
        policy.configure(true).unwrap();
        assert!(!policy.allowed().unwrap());
    }

    #[test]
    fn flag_survives_volatile_clear() {
        let store = Arc::new(MemoryStore::new());
        let policy = DownBinPolicy::new(store.clone());
        policy.configure(false).unwrap();
        store.clear_volatile(Scope::Lot).unwrap();
        assert!(!policy.allowed().unwrap());
    }

    #[test]
    fn garbage_flag_value_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.put(keys::DOWN_BIN_POLICY, "maybe", Scope::Lot).unwrap();
        let policy = DownBinPolicy::new(store);
        assert!(policy.allowed().is_err());
    }
}
