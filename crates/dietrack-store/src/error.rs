use dietrack_core::DefinitionError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("key `{key}` holds a {found} entity, expected {expected}")]
    WrongKind {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
