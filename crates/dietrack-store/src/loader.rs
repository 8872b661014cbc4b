//! Parsing and validation of tracker and rule definition files.
//!
//! Both formats are JSON documents. Every configuration error (malformed
//! JSON, unsupported rule mode, bad widths, unknown link targets) is fatal
//! to the load; nothing from a failed file reaches the store.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use dietrack_core::{DefinitionError, RuleDefinition, TrackerDefinition};

use crate::definitions::DefinitionRepo;
use crate::error::StoreError;

#[derive(Deserialize)]
struct TrackerFile {
    trackers: Vec<TrackerDefinition>,
}

#[derive(Deserialize)]
struct RuleFile {
    rules: Vec<RuleDefinition>,
}

/// Parse and validate a tracker definition document.
///
/// Link-on-disable targets must exist among the trackers in this document;
/// the error names the first offender. Existence is the only graph check —
/// cycle-freedom is not validated here (the engine's cascade guards against
/// cycles at run time).
pub fn parse_trackers(source: &str) -> Result<Vec<TrackerDefinition>, StoreError> {
    let file: TrackerFile = serde_json::from_str(source)?;
    let names: HashSet<&str> = file.trackers.iter().map(|t| t.name.as_str()).collect();
    for def in &file.trackers {
        def.validate()?;
        for target in &def.link_on_disable {
            if !names.contains(target.as_str()) {
                return Err(DefinitionError::UnknownLink {
                    tracker: def.name.clone(),
                    target: target.clone(),
                }
                .into());
            }
        }
    }
    Ok(file.trackers)
}

/// Parse and validate a rule definition document. Only the
/// `valid-combinations` mode deserializes; any other mode fails the parse.
pub fn parse_rules(source: &str) -> Result<Vec<RuleDefinition>, StoreError> {
    let file: RuleFile = serde_json::from_str(source)?;
    for rule in &file.rules {
        rule.validate()?;
    }
    Ok(file.rules)
}

/// Load a tracker definition file into the store.
pub fn load_tracker_file(repo: &DefinitionRepo, path: &Path) -> Result<usize, StoreError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
    let trackers = parse_trackers(&source)?;
    for def in &trackers {
        repo.put_tracker(def)?;
    }
    info!(path = %path.display(), count = trackers.len(), "tracker definitions loaded");
    Ok(trackers.len())
}

/// Load a rule definition file into the store.
pub fn load_rule_file(repo: &DefinitionRepo, path: &Path) -> Result<usize, StoreError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
    let rules = parse_rules(&source)?;
    for rule in &rules {
        repo.put_rule(rule)?;
    }
    info!(path = %path.display(), count = rules.len(), "rule definitions loaded");
    Ok(rules.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tracker_file() {
        let src = r#"{
            "trackers": [
                {"name": "CORE", "size": 4, "initial_value": "0000", "link_on_disable": ["LLC"]},
                {"name": "LLC", "size": 2, "initial_value": "00"}
            ]
        }"#;
        let trackers = parse_trackers(src).unwrap();
        assert_eq!(trackers.len(), 2);
        assert_eq!(trackers[0].link_on_disable, vec!["LLC".to_string()]);
    }

    #[test]
    fn unknown_link_target_names_offender() {
        let src = r#"{
            "trackers": [
                {"name": "CORE", "size": 2, "initial_value": "00", "link_on_disable": ["GFX"]}
            ]
        }"#;
        let err = parse_trackers(src).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("GFX"), "got: {message}");
        assert!(message.contains("CORE"), "got: {message}");
    }

    #[test]
    fn self_link_is_accepted_by_the_loader() {
        // Existence is checked, not cycle-freedom.
        let src = r#"{
            "trackers": [
                {"name": "CORE", "size": 2, "initial_value": "00", "link_on_disable": ["CORE"]}
            ]
        }"#;
        assert!(parse_trackers(src).is_ok());
    }

    #[test]
    fn bad_initial_width_fails() {
        let src = r#"{
            "trackers": [{"name": "CORE", "size": 3, "initial_value": "00"}]
        }"#;
        assert!(matches!(
            parse_trackers(src).unwrap_err(),
            StoreError::Definition(DefinitionError::InitialWidth { .. })
        ));
    }

    #[test]
    fn parses_rule_file() {
        let src = r#"{
            "rules": [{
                "name": "CoreRule",
                "mode": "valid-combinations",
                "index": "0-4",
                "variants": [
                    {"name": "AllCores", "type": "fully-featured", "width": 5, "patterns": ["00000"]},
                    {"name": "CORE2Valid", "type": "recovery", "width": 5, "patterns": ["00100"]}
                ]
            }]
        }"#;
        let rules = parse_rules(src).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].variants.len(), 2);
    }

    #[test]
    fn unsupported_mode_fails_load() {
        let src = r#"{
            "rules": [{"name": "R", "mode": "best-match", "index": "0-1", "variants": []}]
        }"#;
        assert!(matches!(
            parse_rules(src).unwrap_err(),
            StoreError::Serialization(_)
        ));
    }

    #[test]
    fn pattern_width_mismatch_fails_load() {
        let src = r#"{
            "rules": [{
                "name": "R",
                "mode": "valid-combinations",
                "index": "0-4",
                "variants": [
                    {"name": "V", "type": "recovery", "width": 5, "patterns": ["001"]}
                ]
            }]
        }"#;
        assert!(matches!(
            parse_rules(src).unwrap_err(),
            StoreError::Definition(DefinitionError::PatternWidth { .. })
        ));
    }
}
