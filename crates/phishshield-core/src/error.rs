use thiserror::Error;

use crate::signal::SourceId;

pub type ScanResult<T> = Result<T, ScanError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("malformed subject: {0}")]
    MalformedSubject(String),

    #[error("signal source {source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },
}
