use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecommendError>;

/// Errors surfaced by the public engine operations.
///
/// Lower-level failures (io, csv, parse, matrix shape) never leak out as their
/// own types; they are folded into `DataUnavailable` with context.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Backing tables missing or corrupt. Fatal for the calling session.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The user id has no operations on record.
    #[error("Unknown user: {0}")]
    UnknownUser(u32),

    /// The neighbor pool produced nothing the user has not already seen.
    #[error("No candidate videos for user {0}")]
    NoCandidates(u32),
}

impl RecommendError {
    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        RecommendError::DataUnavailable(msg.into())
    }

    /// Whether the caller should abandon the session rather than re-prompt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecommendError::DataUnavailable(_))
    }

    /// `NoCandidates` is a legitimate empty result, not a user error.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, RecommendError::NoCandidates(_))
    }
}

impl From<std::io::Error> for RecommendError {
    fn from(err: std::io::Error) -> Self {
        RecommendError::DataUnavailable(err.to_string())
    }
}

impl From<csv::Error> for RecommendError {
    fn from(err: csv::Error) -> Self {
        RecommendError::DataUnavailable(err.to_string())
    }
}
