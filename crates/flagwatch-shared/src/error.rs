use thiserror::Error;

/// A single field of a fetched record failed to parse.
///
/// These never cross the conversion site: callers log them and substitute a
/// fallback (raw id, zero weight) so one bad record cannot block a view.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed metadata JSON: {0}")]
    MalformedMetadata(#[from] serde_json::Error),

    #[error("Metadata has no string `name` field")]
    MissingName,

    #[error("Invalid weight: {0:?}")]
    InvalidWeight(String),

    #[error("Invalid integer: {0:?}")]
    InvalidInteger(String),
}
