use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error from strict bit-string parsing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid bit character {found:?} at position {position}")]
pub struct ParseBitsError {
    pub found: char,
    pub position: usize,
}

/// A fixed-length vector of disable bits.
///
/// Bit semantics throughout the crate: `0` = feature enabled, `1` = feature
/// disabled (masked). Rendered and parsed as a string of `0`/`1` characters,
/// most-significant-position first, matching the definition-file format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitVector(Vec<bool>);

impl BitVector {
    /// All-enabled vector (`000…0`) of the given length.
    pub fn zeros(len: usize) -> Self {
        Self(vec![false; len])
    }

    /// All-disabled vector (`111…1`) of the given length.
    pub fn ones(len: usize) -> Self {
        Self(vec![true; len])
    }

    /// Lenient conversion for resolved input values: `'1'` maps to a set bit,
    /// any other character maps to a clear bit.
    pub fn from_lenient(s: &str) -> Self {
        Self(s.chars().map(|c| c == '1').collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bit at `index`. Panics if out of bounds; callers validate widths first.
    pub fn get(&self, index: usize) -> bool {
        self.0[index]
    }

    pub fn set(&mut self, index: usize, value: bool) {
        self.0[index] = value;
    }

    pub fn is_all_ones(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|b| *b)
    }

    pub fn is_all_zeros(&self) -> bool {
        self.0.iter().all(|b| !*b)
    }

    /// Copy of the bits in `range`. Panics if the range is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self(self.0[range].to_vec())
    }

    /// Append all bits of `other`.
    pub fn extend(&mut self, other: &BitVector) {
        self.0.extend_from_slice(&other.0);
    }

    /// Concatenate a sequence of vectors in order.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a BitVector>) -> Self {
        let mut out = Self::default();
        for part in parts {
            out.extend(part);
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.0 {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for BitVector {
    type Err = ParseBitsError;

    /// Strict parse: only `0` and `1` are accepted. Used for definition files
    /// and stored tracker data, where a stray character is a configuration
    /// error rather than an implicit zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bits = Vec::with_capacity(s.len());
        for (position, found) in s.chars().enumerate() {
            match found {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => return Err(ParseBitsError { found, position }),
            }
        }
        Ok(Self(bits))
    }
}

impl Serialize for BitVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BitVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse_round_trip() {
        let bits: BitVector = "01101".parse().unwrap();
        assert_eq!(bits.len(), 5);
        assert!(!bits.get(0));
        assert!(bits.get(1));
        assert_eq!(bits.to_string(), "01101");
    }

    #[test]
    fn strict_parse_rejects_junk() {
        let err = "01x1".parse::<BitVector>().unwrap_err();
        assert_eq!(err.found, 'x');
        assert_eq!(err.position, 2);
    }

    #[test]
    fn lenient_treats_non_one_as_zero() {
        let bits = BitVector::from_lenient("1x0 1");
        assert_eq!(bits.to_string(), "10001");
    }

    #[test]
    fn ones_and_zeros() {
        assert!(BitVector::ones(4).is_all_ones());
        assert!(BitVector::zeros(4).is_all_zeros());
        assert!(!BitVector::zeros(4).is_all_ones());
        // An empty vector is never "fully disabled".
        assert!(!BitVector::ones(0).is_all_ones());
    }

    #[test]
    fn slice_and_concat() {
        let a: BitVector = "110".parse().unwrap();
        let b: BitVector = "01".parse().unwrap();
        let joined = BitVector::concat([&a, &b]);
        assert_eq!(joined.to_string(), "11001");
        assert_eq!(joined.slice(1..4).to_string(), "100");
    }

    #[test]
    fn serde_as_string() {
        let bits: BitVector = "0100".parse().unwrap();
        let json = serde_json::to_string(&bits).unwrap();
        assert_eq!(json, "\"0100\"");
        let back: BitVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bits);
        assert!(serde_json::from_str::<BitVector>("\"0a\"").is_err());
    }
}
