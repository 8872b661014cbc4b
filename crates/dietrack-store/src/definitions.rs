use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dietrack_core::{BitVector, RuleDefinition, Scope, TrackerDefinition};

use crate::error::StoreError;
use crate::keys;
use crate::kv::DefinitionStore;

/// Tagged wrapper for entities serialized into the store. The tag replaces
/// any runtime type lookup: a fetch that finds the wrong tag is an error,
/// not a cast.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredEntity {
    Tracker(TrackerDefinition),
    Rule(RuleDefinition),
}

impl StoredEntity {
    fn kind(&self) -> &'static str {
        match self {
            Self::Tracker(_) => "tracker",
            Self::Rule(_) => "rule",
        }
    }
}

/// Typed access to definitions and tracker data over the raw key/value store.
///
/// Definitions and rules live at IP scope (program lifetime); tracker data is
/// per unit under test.
#[derive(Clone)]
pub struct DefinitionRepo {
    store: Arc<dyn DefinitionStore>,
}

impl DefinitionRepo {
    pub fn new(store: Arc<dyn DefinitionStore>) -> Self {
        Self { store }
    }

    pub fn put_tracker(&self, def: &TrackerDefinition) -> Result<(), StoreError> {
        def.validate()?;
        let key = keys::tracker_definition(&def.name);
        let json = serde_json::to_string(&StoredEntity::Tracker(def.clone()))?;
        self.store.put(&key, &json, Scope::Ip)?;
        debug!(tracker = %def.name, size = def.size, "tracker definition stored");
        Ok(())
    }

    pub fn get_tracker(&self, name: &str) -> Result<TrackerDefinition, StoreError> {
        let key = keys::tracker_definition(name);
        match self.load_entity(&key)? {
            StoredEntity::Tracker(def) => Ok(def),
            other => Err(StoreError::WrongKind {
                key,
                expected: "tracker",
                found: other.kind(),
            }),
        }
    }

    pub fn tracker_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.store.exists(&keys::tracker_definition(name), Scope::Ip)
    }

    pub fn put_rule(&self, rule: &RuleDefinition) -> Result<(), StoreError> {
        rule.validate()?;
        let key = keys::rule_definition(&rule.name);
        let json = serde_json::to_string(&StoredEntity::Rule(rule.clone()))?;
        self.store.put(&key, &json, Scope::Ip)?;
        debug!(rule = %rule.name, "rule definition stored");
        Ok(())
    }

    pub fn get_rule(&self, name: &str) -> Result<RuleDefinition, StoreError> {
        let key = keys::rule_definition(name);
        match self.load_entity(&key)? {
            StoredEntity::Rule(rule) => Ok(rule),
            other => Err(StoreError::WrongKind {
                key,
                expected: "rule",
                found: other.kind(),
            }),
        }
    }

    /// Stored per-unit value for one tracker, `None` if never written.
    pub fn tracker_data(&self, name: &str) -> Result<Option<BitVector>, StoreError> {
        let key = keys::tracker_data(name);
        match self.store.get(&key, Scope::Unit)? {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("tracker data `{name}`: {e}"))),
        }
    }

    pub fn set_tracker_data(&self, name: &str, value: &BitVector) -> Result<(), StoreError> {
        self.store
            .put(&keys::tracker_data(name), &value.to_string(), Scope::Unit)
    }

    /// Copy tracker `src`'s definition, and current data if any, under the
    /// new name `dst`. `src` is left untouched.
    pub fn clone_tracker(&self, src: &str, dst: &str) -> Result<TrackerDefinition, StoreError> {
        let mut def = self.get_tracker(src)?;
        def.name = dst.to_string();
        self.put_tracker(&def)?;
        if let Some(data) = self.tracker_data(src)? {
            self.set_tracker_data(dst, &data)?;
        }
        Ok(def)
    }

    fn load_entity(&self, key: &str) -> Result<StoredEntity, StoreError> {
        let raw = self
            .store
            .get(key, Scope::Ip)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use dietrack_core::{BitRange, RuleMode, RuleVariant, VariantKind};

    fn repo() -> DefinitionRepo {
        DefinitionRepo::new(Arc::new(MemoryStore::new()))
    }

    fn tracker(name: &str, initial: &str) -> TrackerDefinition {
        TrackerDefinition {
            name: name.to_string(),
            size: initial.len(),
            initial_value: initial.parse().unwrap(),
            link_on_disable: Vec::new(),
        }
    }

    fn rule(name: &str) -> RuleDefinition {
        RuleDefinition {
            name: name.to_string(),
            mode: RuleMode::ValidCombinations,
            range: BitRange { start: 0, end: 1 },
            variants: vec![RuleVariant {
                name: "Both".into(),
                kind: VariantKind::FullyFeatured,
                width: 2,
                patterns: vec!["00".parse().unwrap()],
            }],
        }
    }

    #[test]
    fn tracker_round_trip() {
        let repo = repo();
        repo.put_tracker(&tracker("CORE", "0000")).unwrap();
        let def = repo.get_tracker("CORE").unwrap();
        assert_eq!(def.size, 4);
        assert!(repo.tracker_exists("CORE").unwrap());
        assert!(!repo.tracker_exists("GFX").unwrap());
    }

    #[test]
    fn invalid_tracker_rejected_on_put() {
        let repo = repo();
        let mut def = tracker("CORE", "0000");
        def.size = 3;
        assert!(matches!(
            repo.put_tracker(&def).unwrap_err(),
            StoreError::Definition(_)
        ));
    }

    #[test]
    fn missing_tracker_is_not_found() {
        let repo = repo();
        assert!(matches!(
            repo.get_tracker("GHOST").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn rule_round_trip() {
        let repo = repo();
        repo.put_rule(&rule("CoreRule")).unwrap();
        let fetched = repo.get_rule("CoreRule").unwrap();
        assert_eq!(fetched.variants.len(), 1);
    }

    #[test]
    fn wrong_kind_detected() {
        let store: Arc<dyn DefinitionStore> = Arc::new(MemoryStore::new());
        let repo = DefinitionRepo::new(store.clone());
        // A rule entity stored under a tracker key.
        let json = serde_json::to_string(&StoredEntity::Rule(rule("R"))).unwrap();
        store
            .put(&keys::tracker_definition("CORE"), &json, Scope::Ip)
            .unwrap();
        assert!(matches!(
            repo.get_tracker("CORE").unwrap_err(),
            StoreError::WrongKind { expected: "tracker", found: "rule", .. }
        ));
    }

    #[test]
    fn tracker_data_absent_until_written() {
        let repo = repo();
        assert_eq!(repo.tracker_data("CORE").unwrap(), None);
        repo.set_tracker_data("CORE", &"0110".parse().unwrap()).unwrap();
        assert_eq!(
            repo.tracker_data("CORE").unwrap().unwrap().to_string(),
            "0110"
        );
    }

    #[test]
    fn clone_copies_definition_and_data() {
        let repo = repo();
        repo.put_tracker(&tracker("A", "00")).unwrap();
        repo.set_tracker_data("A", &"01".parse().unwrap()).unwrap();

        let cloned = repo.clone_tracker("A", "A2").unwrap();
        assert_eq!(cloned.name, "A2");
        assert_eq!(repo.tracker_data("A2").unwrap().unwrap().to_string(), "01");

        // Source untouched.
        assert_eq!(repo.get_tracker("A").unwrap().name, "A");
        assert_eq!(repo.tracker_data("A").unwrap().unwrap().to_string(), "01");
    }

    #[test]
    fn clone_without_data_copies_definition_only() {
        let repo = repo();
        repo.put_tracker(&tracker("A", "00")).unwrap();
        repo.clone_tracker("A", "A2").unwrap();
        assert_eq!(repo.tracker_data("A2").unwrap(), None);
        assert!(repo.tracker_exists("A2").unwrap());
    }
}
