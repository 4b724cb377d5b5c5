use std::io;

/// Errors raised while reading or writing a key-exchange file.
#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    /// The underlying CSV reader or writer failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The file could not be opened or created.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file name is not `{kind}_{account}_{unix_nanos}`.
    #[error("invalid key file name {0:?}")]
    InvalidFileName(String),

    /// A required field is empty or missing.
    #[error("line {line}: missing {field}")]
    MissingField {
        /// 1-based line number
        line: u64,
        /// field name
        field: &'static str,
    },

    /// A field cannot be parsed.
    #[error("line {line}: invalid {field} {value:?}")]
    InvalidField {
        /// 1-based line number
        line: u64,
        /// field name
        field: &'static str,
        /// offending value
        value: String,
    },
}
