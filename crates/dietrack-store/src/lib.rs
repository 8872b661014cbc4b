pub mod audit;
pub mod database;
pub mod definitions;
pub mod error;
pub mod keys;
pub mod kv;
pub mod loader;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use audit::{AuditSink, MemoryAuditLog, SqliteAuditLog};
pub use database::Database;
pub use definitions::{DefinitionRepo, StoredEntity};
pub use error::StoreError;
pub use kv::DefinitionStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
