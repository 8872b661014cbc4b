/// SQL DDL for the dietrack store database.
/// WAL mode enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
"#;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS kv (
    key TEXT NOT NULL,
    scope TEXT NOT NULL,
    value TEXT NOT NULL,
    persistent INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (key, scope)
);

CREATE TABLE IF NOT EXISTS audit (
    id TEXT PRIMARY KEY,
    tracker TEXT NOT NULL,
    mask TEXT NOT NULL,
    result TEXT NOT NULL,
    incoming TEXT NOT NULL,
    outgoing TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_kv_scope ON kv(scope);
CREATE INDEX IF NOT EXISTS idx_audit_tracker ON audit(tracker);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit(timestamp);
"#;
