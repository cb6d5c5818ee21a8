use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or is not a readable workbook.
    Open { path: PathBuf, message: String },
    /// A sheet could not be read.
    Sheet { sheet: String, message: String },
    /// Header does not match the expected schema, even after renames.
    SchemaMismatch { expected: Vec<String>, found: Vec<String> },
    /// A data row could not be turned into a record.
    BadRow { row: usize, column: String, value: String },
    /// Workbook could not be written or moved into place.
    Write { path: PathBuf, message: String },
}

impl IoError {
    pub fn open(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Open {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch { .. })
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, message } => {
                write!(f, "cannot open {}: {message}", path.display())
            }
            Self::Sheet { sheet, message } => write!(f, "cannot read sheet '{sheet}': {message}"),
            Self::SchemaMismatch { expected, found } => {
                write!(f, "header mismatch: expected {expected:?}, found {found:?}")
            }
            Self::BadRow { row, column, value } => {
                write!(f, "row {row}: cannot parse '{column}' value '{value}'")
            }
            Self::Write { path, message } => {
                write!(f, "cannot write {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for IoError {}
