use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bits::BitVector;

/// One append-only trace of a tracking-structure update.
///
/// A record is written for every logged update, including idempotent no-ops
/// and policy-rejected attempts, so the test log shows each decision the
/// engine made. All bit fields are rendered as binary strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    /// Constituent tracker names of the composite, joined with `,`.
    pub tracker: String,
    /// Bits withheld from the update (`1` = preserved).
    pub mask: String,
    /// The value reported for the update (caller-supplied override or the
    /// incoming new value).
    pub result: String,
    /// Stored value before the update (all zeros when never written).
    pub incoming: String,
    /// Computed value after the update.
    pub outgoing: String,
    pub timestamp: String,
}

impl AuditRecord {
    pub fn new(
        tracker: impl Into<String>,
        mask: &BitVector,
        result: &BitVector,
        incoming: &BitVector,
        outgoing: &BitVector,
    ) -> Self {
        Self {
            id: format!("aud_{}", Uuid::now_v7()),
            tracker: tracker.into(),
            mask: mask.to_string(),
            result: result.to_string(),
            incoming: incoming.to_string(),
            outgoing: outgoing.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_renders_binary_strings() {
        let mask = BitVector::zeros(3);
        let value: BitVector = "101".parse().unwrap();
        let record = AuditRecord::new("A,B", &mask, &value, &BitVector::zeros(3), &value);
        assert!(record.id.starts_with("aud_"));
        assert_eq!(record.tracker, "A,B");
        assert_eq!(record.mask, "000");
        assert_eq!(record.result, "101");
        assert_eq!(record.outgoing, "101");
    }

    #[test]
    fn record_ids_are_unique() {
        let zero = BitVector::zeros(1);
        let a = AuditRecord::new("A", &zero, &zero, &zero, &zero);
        let b = AuditRecord::new("A", &zero, &zero, &zero, &zero);
        assert_ne!(a.id, b.id);
    }
}
