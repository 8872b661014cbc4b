use dietrack_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A constituent tracker has no stored value yet. Surfaced rather than
    /// silently defaulted: an uninitialized tracker must not read as
    /// "all features enabled".
    #[error("tracker `{tracker}` has not been initialized")]
    NotInitialized { tracker: String },

    #[error("unknown tracker: {0}")]
    UnknownTracker(String),

    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// Malformed resolver token (wrong separator count, unrecognized scope).
    #[error("format error: {0}")]
    Format(String),

    /// A storage token resolved to a key with no stored value.
    #[error("no stored value for token `{token}`")]
    MissingValue { token: String },

    #[error("bit width mismatch: got {actual}, expected {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    /// A rule's index range reaches beyond the supplied bit vector.
    #[error("rule `{rule}` inspects bits {range}, but only {len} bits were supplied")]
    Range {
        rule: String,
        range: String,
        len: usize,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
