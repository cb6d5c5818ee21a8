use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A range was built with `end < start`.
    RangeInvariant { start: NaiveDate, end: NaiveDate },
    /// A fetch failed and was not recovered by the caller.
    Fetch(FetchError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RangeInvariant { start, end } => {
                write!(f, "invalid range: end {end} is before start {start}")
            }
            Self::Fetch(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<FetchError> for EngineError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

/// Failure reported by a [`RangeFetcher`](crate::fetch::RangeFetcher).
///
/// `retryable` marks transient failures (driver crashed, no download); a
/// malformed export is not retryable. `schema` marks an export whose header
/// no longer matches the known layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchError {
    pub message: String,
    pub retryable: bool,
    pub schema: bool,
}

impl FetchError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
            schema: false,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            schema: false,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            schema: true,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed: {}", self.message)
    }
}

impl std::error::Error for FetchError {}
