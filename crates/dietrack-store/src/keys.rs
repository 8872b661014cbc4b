//! Key namespacing for the definition store.
//!
//! Keys are `<table>:<entity-name>` strings; the scope is carried separately
//! so the same key layout works per-unit, per-lot, and per-IP.

pub const SEPARATOR: char = ':';

pub const TABLE_TRACKER_DEFINITION: &str = "tracker_def";
pub const TABLE_TRACKER_DATA: &str = "tracker_data";
pub const TABLE_RULE_DEFINITION: &str = "rule_def";

/// The global down-bin policy flag. Written once per run, marked persistent,
/// never reset.
pub const DOWN_BIN_POLICY: &str = "policy:down_bins_allowed";

pub fn tracker_definition(name: &str) -> String {
    format!("{TABLE_TRACKER_DEFINITION}{SEPARATOR}{name}")
}

pub fn tracker_data(name: &str) -> String {
    format!("{TABLE_TRACKER_DATA}{SEPARATOR}{name}")
}

pub fn rule_definition(name: &str) -> String {
    format!("{TABLE_RULE_DEFINITION}{SEPARATOR}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(tracker_definition("CORE"), "tracker_def:CORE");
        assert_eq!(tracker_data("CORE"), "tracker_data:CORE");
        assert_eq!(rule_definition("CoreRule"), "rule_def:CoreRule");
    }

    #[test]
    fn tables_do_not_collide() {
        assert_ne!(tracker_definition("X"), tracker_data("X"));
        assert_ne!(tracker_definition("X"), rule_definition("X"));
    }
}
