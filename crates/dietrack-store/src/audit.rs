use parking_lot::Mutex;
use rusqlite::params;
use tracing::debug;

use dietrack_core::AuditRecord;

use crate::database::Database;
use crate::error::StoreError;

/// Write-only sink for tracking-structure audit records.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError>;
}

/// Durable audit log in the SQLite `audit` table. Append-only; rows are
/// never updated or deleted by this crate.
#[derive(Clone)]
pub struct SqliteAuditLog {
    db: Database,
}

impl SqliteAuditLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Most recent records, newest first. Used by the CLI and tests; the
    /// engine itself only appends.
    pub fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tracker, mask, result, incoming, outgoing, timestamp
                 FROM audit ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(AuditRecord {
                        id: row.get(0)?,
                        tracker: row.get(1)?,
                        mask: row.get(2)?,
                        result: row.get(3)?,
                        incoming: row.get(4)?,
                        outgoing: row.get(5)?,
                        timestamp: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

impl AuditSink for SqliteAuditLog {
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError> {
        debug!(
            tracker = %record.tracker,
            incoming = %record.incoming,
            outgoing = %record.outgoing,
            "audit record"
        );
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO audit (id, tracker, mask, result, incoming, outgoing, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.tracker,
                    record.mask,
                    record.result,
                    record.incoming,
                    record.outgoing,
                    record.timestamp,
                ],
            )?;
            Ok(())
        })
    }
}

/// In-memory audit log for tests.
#[derive(Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError> {
        debug!(tracker = %record.tracker, "audit record");
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dietrack_core::BitVector;

    fn record(tracker: &str, incoming: &str, outgoing: &str) -> AuditRecord {
        AuditRecord::new(
            tracker,
            &BitVector::zeros(incoming.len()),
            &outgoing.parse().unwrap(),
            &incoming.parse().unwrap(),
            &outgoing.parse().unwrap(),
        )
    }

    #[test]
    fn sqlite_append_and_query() {
        let log = SqliteAuditLog::new(Database::in_memory().unwrap());
        log.append(&record("A", "000", "010")).unwrap();
        log.append(&record("A,B", "01000", "11000")).unwrap();

        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].tracker, "A,B");
        assert_eq!(recent[0].outgoing, "11000");
        assert_eq!(recent[1].tracker, "A");
    }

    #[test]
    fn recent_respects_limit() {
        let log = SqliteAuditLog::new(Database::in_memory().unwrap());
        for _ in 0..5 {
            log.append(&record("A", "0", "1")).unwrap();
        }
        assert_eq!(log.recent(3).unwrap().len(), 3);
    }

    #[test]
    fn memory_log_captures_in_order() {
        let log = MemoryAuditLog::new();
        log.append(&record("A", "00", "01")).unwrap();
        log.append(&record("A", "01", "11")).unwrap();
        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outgoing, "01");
        assert_eq!(records[1].outgoing, "11");
    }
}
