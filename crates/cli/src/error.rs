use std::fmt;

use licita_config::ConfigError;
use licita_engine::{EngineError, FetchError};
use licita_io::IoError;

use crate::exit_codes::{EXIT_CAPPED, EXIT_ERROR, EXIT_FETCH, EXIT_IO, EXIT_SCHEMA, EXIT_SYNC, EXIT_USAGE};

/// Error surfaced to the user: printed as `error:` (+ `hint:`) and turned
/// into the process exit code.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::new(EXIT_FETCH, msg)
    }

    pub fn sync(msg: impl Into<String>) -> Self {
        Self::new(EXIT_SYNC, msg)
    }

    pub fn capped(msg: impl Into<String>) -> Self {
        Self::new(EXIT_CAPPED, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

const SCHEMA_HINT: &str =
    "the portal export format changed; map the new column names under `renames` in the config";

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        if err.is_schema_mismatch() {
            Self::new(EXIT_SCHEMA, err.to_string()).with_hint(SCHEMA_HINT)
        } else {
            Self::io(err.to_string())
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::args(err.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        if err.schema {
            Self::new(EXIT_SCHEMA, err.to_string()).with_hint(SCHEMA_HINT)
        } else {
            Self::fetch(err.to_string())
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Fetch(err) => err.into(),
            other => Self::general(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_gets_its_own_code() {
        let err: CliError = IoError::SchemaMismatch {
            expected: vec!["Entidad".into()],
            found: vec!["Entity".into()],
        }
        .into();
        assert_eq!(err.code, EXIT_SCHEMA);
        assert!(err.hint.is_some());

        let err: CliError = IoError::open("/nope.xlsx", "not found").into();
        assert_eq!(err.code, EXIT_IO);
    }

    #[test]
    fn fetch_and_config_errors_map_to_codes() {
        let err: CliError = FetchError::fatal("driver crashed").into();
        assert_eq!(err.code, EXIT_FETCH);
        assert!(err.message.contains("driver crashed"));

        let err: CliError = FetchError::schema("header mismatch").into();
        assert_eq!(err.code, EXIT_SCHEMA);

        let err: CliError = ConfigError::Validation("fetch.cap must be at least 2".into()).into();
        assert_eq!(err.code, EXIT_USAGE);
    }
}
