use serde::{Deserialize, Serialize};

use crate::bits::BitVector;
use crate::errors::DefinitionError;

/// Immutable definition of one tracker: a named, fixed-width vector of
/// feature-disable bits with an optional list of trackers to force-disable
/// when this one becomes fully disabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerDefinition {
    pub name: String,
    pub size: usize,
    pub initial_value: BitVector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_on_disable: Vec<String>,
}

impl TrackerDefinition {
    /// Structural checks that do not need the rest of the loaded set.
    /// Link-target existence is checked by the loader across the whole file.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.size == 0 {
            return Err(DefinitionError::ZeroSize {
                tracker: self.name.clone(),
            });
        }
        if self.initial_value.len() != self.size {
            return Err(DefinitionError::InitialWidth {
                tracker: self.name.clone(),
                expected: self.size,
                actual: self.initial_value.len(),
            });
        }
        Ok(())
    }
}

/// How an update combines the incoming value with the stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Disables accumulate: each unmasked bit is OR'ed with the stored bit,
    /// so a disabled feature never re-enables.
    Merge,
    /// Each unmasked bit is replaced outright by the incoming bit.
    Overwrite,
}
