use thiserror::Error;

/// Local validation failures. Raised immediately by setters and adders,
/// never deferred to submission; the rejected value is not stored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Timestamp must be numeric: '{input}'")]
    NonNumericTimestamp { input: String },

    #[error("Timestamp must be positive: {micros}")]
    InvalidTimestamp { micros: i64 },

    #[error("Timestamp out of range: {input}")]
    TimestampOutOfRange { input: String },

    #[error("Timestamp {micros} is older than 3 days")]
    TimestampTooOld { micros: i64 },

    #[error("User property limit exceeded: at most {limit} properties allowed")]
    UserPropertyLimit { limit: usize },
}
