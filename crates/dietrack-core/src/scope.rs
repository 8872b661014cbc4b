use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage scope for persisted keys.
///
/// Mirrors the three contexts recognized in storage tokens: `DUT` (per unit
/// under test), `LOT` (per lot), `IP` (per test-program IP, effectively
/// program-lifetime).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "DUT")]
    Unit,
    #[serde(rename = "LOT")]
    Lot,
    #[serde(rename = "IP")]
    Ip,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unit => "DUT",
            Self::Lot => "LOT",
            Self::Ip => "IP",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DUT" => Ok(Self::Unit),
            "LOT" => Ok(Self::Lot),
            "IP" => Ok(Self::Ip),
            other => Err(format!("unrecognized scope: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for scope in [Scope::Unit, Scope::Lot, Scope::Ip] {
            assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
        }
    }

    #[test]
    fn unknown_scope_fails() {
        assert!("WAFER".parse::<Scope>().is_err());
        // Scope names are case-sensitive.
        assert!("dut".parse::<Scope>().is_err());
    }
}
