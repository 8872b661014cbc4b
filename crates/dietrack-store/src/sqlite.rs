use chrono::Utc;
use rusqlite::params;

use dietrack_core::Scope;

use crate::database::Database;
use crate::error::StoreError;
use crate::kv::DefinitionStore;

/// Durable definition store over the SQLite `kv` table.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl DefinitionStore for SqliteStore {
    fn get(&self, key: &str, scope: Scope) -> Result<Option<String>, StoreError> {
        self.db.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1 AND scope = ?2",
                    params![key, scope.as_str()],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(StoreError::from(other)),
                })?;
            Ok(value)
        })
    }

    fn put(&self, key: &str, value: &str, scope: Scope) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, scope, value, persistent, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4)
                 ON CONFLICT(key, scope)
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, scope.as_str(), value, now],
            )?;
            Ok(())
        })
    }

    fn exists(&self, key: &str, scope: Scope) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM kv WHERE key = ?1 AND scope = ?2",
                params![key, scope.as_str()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    fn mark_persistent(&self, key: &str, scope: Scope) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE kv SET persistent = 1 WHERE key = ?1 AND scope = ?2",
                params![key, scope.as_str()],
            )?;
            Ok(())
        })
    }

    fn clear_volatile(&self, scope: Scope) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM kv WHERE scope = ?1 AND persistent = 0",
                params![scope.as_str()],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::new(Database::in_memory().unwrap())
    }

    #[test]
    fn put_get_round_trip() {
        let store = store();
        store.put("tracker_data:CORE", "0110", Scope::Unit).unwrap();
        assert_eq!(
            store.get("tracker_data:CORE", Scope::Unit).unwrap().as_deref(),
            Some("0110")
        );
        assert_eq!(store.get("tracker_data:CORE", Scope::Ip).unwrap(), None);
    }

    #[test]
    fn put_overwrites() {
        let store = store();
        store.put("k", "a", Scope::Unit).unwrap();
        store.put("k", "b", Scope::Unit).unwrap();
        assert_eq!(store.get("k", Scope::Unit).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn clear_volatile_keeps_persistent_keys() {
        let store = store();
        store.put("keep", "1", Scope::Lot).unwrap();
        store.mark_persistent("keep", Scope::Lot).unwrap();
        store.put("drop", "1", Scope::Lot).unwrap();

        store.clear_volatile(Scope::Lot).unwrap();

        assert!(store.exists("keep", Scope::Lot).unwrap());
        assert!(!store.exists("drop", Scope::Lot).unwrap());
    }

    #[test]
    fn overwrite_preserves_persistence() {
        let store = store();
        store.put("k", "a", Scope::Lot).unwrap();
        store.mark_persistent("k", Scope::Lot).unwrap();
        store.put("k", "b", Scope::Lot).unwrap();
        store.clear_volatile(Scope::Lot).unwrap();
        assert_eq!(store.get("k", Scope::Lot).unwrap().as_deref(), Some("b"));
    }
}
