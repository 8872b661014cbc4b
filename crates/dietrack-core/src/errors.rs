/// Configuration errors raised while validating loaded definitions.
/// These are fatal to the load operation that produced them.
#[derive(Clone, Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("tracker `{tracker}` has zero size")]
    ZeroSize { tracker: String },

    #[error("tracker `{tracker}`: initial value is {actual} bits, expected {expected}")]
    InitialWidth {
        tracker: String,
        expected: usize,
        actual: usize,
    },

    #[error("tracker `{tracker}`: link-on-disable target `{target}` is not defined")]
    UnknownLink { tracker: String, target: String },

    #[error("rule `{rule}` variant `{variant}` declares no patterns")]
    NoPatterns { rule: String, variant: String },

    #[error(
        "rule `{rule}` variant `{variant}`: pattern `{pattern}` is {actual} bits, expected {expected}"
    )]
    PatternWidth {
        rule: String,
        variant: String,
        pattern: String,
        expected: usize,
        actual: usize,
    },
}
