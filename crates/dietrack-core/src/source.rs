use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where an externally-named input value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// The name *is* the value.
    Literal,
    /// The name is resolved through the global-variable reader.
    GlobalVariable,
    /// The name is a `Context.Key` token read from persistent storage.
    PersistentStorage,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::GlobalVariable => "global_variable",
            Self::PersistentStorage => "persistent_storage",
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(Self::Literal),
            "global_variable" | "global" => Ok(Self::GlobalVariable),
            "persistent_storage" | "storage" => Ok(Self::PersistentStorage),
            other => Err(format!("unknown value source: {other}")),
        }
    }
}
