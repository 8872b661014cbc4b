use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bits::BitVector;
use crate::errors::DefinitionError;

/// Inclusive range of bit positions a rule inspects, written `start-end`
/// in definition files (e.g. `"0-4"` covers five bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitRange {
    pub start: usize,
    pub end: usize,
}

impl BitRange {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for BitRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("bit range must be `start-end`, got `{s}`"))?;
        let start: usize = start
            .trim()
            .parse()
            .map_err(|_| format!("bad range start in `{s}`"))?;
        let end: usize = end
            .trim()
            .parse()
            .map_err(|_| format!("bad range end in `{s}`"))?;
        if end < start {
            return Err(format!("bit range `{s}` runs backwards"));
        }
        Ok(Self { start, end })
    }
}

impl Serialize for BitRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BitRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The only supported rule mode. Any other mode in a definition file is a
/// deserialization error, which fails the load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleMode {
    ValidCombinations,
}

/// Whether a matching variant represents the fully-featured part or a
/// recovery (partially defeatured) configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantKind {
    FullyFeatured,
    Recovery,
}

/// One named legal configuration: any of `patterns` matching the inspected
/// bits means the die is in this configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVariant {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariantKind,
    pub width: usize,
    pub patterns: Vec<BitVector>,
}

/// A named rule: which bits of a tracker to inspect and which patterns at
/// those positions are legal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub mode: RuleMode,
    #[serde(rename = "index")]
    pub range: BitRange,
    pub variants: Vec<RuleVariant>,
}

impl RuleDefinition {
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for variant in &self.variants {
            if variant.patterns.is_empty() {
                return Err(DefinitionError::NoPatterns {
                    rule: self.name.clone(),
                    variant: variant.name.clone(),
                });
            }
            for pattern in &variant.patterns {
                if pattern.len() != variant.width {
                    return Err(DefinitionError::PatternWidth {
                        rule: self.name.clone(),
                        variant: variant.name.clone(),
                        pattern: pattern.to_string(),
                        expected: variant.width,
                        actual: pattern.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One evaluation hit: the variant whose pattern matched, in declaration
/// order. Zero, one, or several hits are all legal outcomes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub variant: String,
    pub kind: VariantKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_range_round_trip() {
        let range: BitRange = "0-4".parse().unwrap();
        assert_eq!(range, BitRange { start: 0, end: 4 });
        assert_eq!(range.len(), 5);
        assert_eq!(range.to_string(), "0-4");
    }

    #[test]
    fn backwards_range_rejected() {
        assert!("4-0".parse::<BitRange>().is_err());
        assert!("3".parse::<BitRange>().is_err());
        assert!("a-b".parse::<BitRange>().is_err());
    }

    #[test]
    fn single_bit_range() {
        let range: BitRange = "2-2".parse().unwrap();
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn unsupported_mode_fails_deserialization() {
        let json = r#"{"name":"R","mode":"best-match","index":"0-1","variants":[]}"#;
        assert!(serde_json::from_str::<RuleDefinition>(json).is_err());
    }

    #[test]
    fn rule_deserializes() {
        let json = r#"{
            "name": "CoreRule",
            "mode": "valid-combinations",
            "index": "0-4",
            "variants": [
                {"name": "CORE2Valid", "type": "recovery", "width": 5, "patterns": ["00100"]}
            ]
        }"#;
        let rule: RuleDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(rule.range.len(), 5);
        assert_eq!(rule.variants[0].kind, VariantKind::Recovery);
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn pattern_width_mismatch_rejected() {
        let rule = RuleDefinition {
            name: "R".into(),
            mode: RuleMode::ValidCombinations,
            range: BitRange { start: 0, end: 4 },
            variants: vec![RuleVariant {
                name: "V".into(),
                kind: VariantKind::FullyFeatured,
                width: 5,
                patterns: vec!["001".parse().unwrap()],
            }],
        };
        assert!(matches!(
            rule.validate().unwrap_err(),
            DefinitionError::PatternWidth { expected: 5, actual: 3, .. }
        ));
    }

    #[test]
    fn variant_without_patterns_rejected() {
        let rule = RuleDefinition {
            name: "R".into(),
            mode: RuleMode::ValidCombinations,
            range: BitRange { start: 0, end: 0 },
            variants: vec![RuleVariant {
                name: "V".into(),
                kind: VariantKind::Recovery,
                width: 1,
                patterns: vec![],
            }],
        };
        assert!(matches!(
            rule.validate().unwrap_err(),
            DefinitionError::NoPatterns { .. }
        ));
    }
}
