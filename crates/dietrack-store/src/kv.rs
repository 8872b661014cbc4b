use dietrack_core::Scope;

use crate::error::StoreError;

/// Scoped key/value storage the engine reads and writes through.
///
/// Every operation is atomic per key; there are no multi-key transactions.
/// The persistence flag is one-way: once a key is marked persistent it
/// survives `clear_volatile`, which models the end-of-unit reset of the
/// surrounding test program.
pub trait DefinitionStore: Send + Sync {
    fn get(&self, key: &str, scope: Scope) -> Result<Option<String>, StoreError>;

    fn put(&self, key: &str, value: &str, scope: Scope) -> Result<(), StoreError>;

    fn exists(&self, key: &str, scope: Scope) -> Result<bool, StoreError>;

    /// Mark an existing key persistent. A missing key is a no-op; the flag
    /// applies once the key is written.
    fn mark_persistent(&self, key: &str, scope: Scope) -> Result<(), StoreError>;

    /// Remove every non-persistent key in the given scope.
    fn clear_volatile(&self, scope: Scope) -> Result<(), StoreError>;
}
