pub mod audit;
pub mod bits;
pub mod errors;
pub mod rules;
pub mod scope;
pub mod source;
pub mod trackers;

pub use audit::AuditRecord;
pub use bits::{BitVector, ParseBitsError};
pub use errors::DefinitionError;
pub use rules::{BitRange, RuleDefinition, RuleMatch, RuleMode, RuleVariant, VariantKind};
pub use scope::Scope;
pub use source::ValueSource;
pub use trackers::{TrackerDefinition, UpdateMode};
