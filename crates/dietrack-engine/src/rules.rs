use std::sync::Arc;

use tracing::debug;

use dietrack_core::{BitVector, RuleMatch};
use dietrack_store::{DefinitionRepo, DefinitionStore, StoreError};

use crate::error::EngineError;

/// Evaluates named rule definitions against supplied bit vectors.
///
/// Matching is exact: a variant matches when one of its literal patterns
/// equals the bits extracted at the rule's index range. The engine reports
/// every match in declaration order and never picks a "best" one — zero,
/// one, or several matches are all legal outcomes for the caller to
/// interpret.
#[derive(Clone)]
pub struct RuleEngine {
    repo: DefinitionRepo,
}

impl RuleEngine {
    pub fn new(store: Arc<dyn DefinitionStore>) -> Self {
        Self {
            repo: DefinitionRepo::new(store),
        }
    }

    pub fn evaluate(
        &self,
        rule_name: &str,
        bits: &BitVector,
    ) -> Result<Vec<RuleMatch>, EngineError> {
        let rule = self.repo.get_rule(rule_name).map_err(|e| match e {
            StoreError::NotFound(_) => EngineError::UnknownRule(rule_name.to_string()),
            other => EngineError::Store(other),
        })?;

        if rule.range.end >= bits.len() {
            return Err(EngineError::Range {
                rule: rule.name,
                range: rule.range.to_string(),
                len: bits.len(),
            });
        }
        let inspected = bits.slice(rule.range.start..rule.range.end + 1);

        let matches: Vec<RuleMatch> = rule
            .variants
            .iter()
            .filter(|variant| variant.patterns.iter().any(|p| *p == inspected))
            .map(|variant| RuleMatch {
                variant: variant.name.clone(),
                kind: variant.kind,
            })
            .collect();

        debug!(
            rule = rule_name,
            inspected = %inspected,
            matches = matches.len(),
            "rule evaluated"
        );
        Ok(matches)
    }
}
