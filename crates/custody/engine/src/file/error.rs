use std::{borrow::Cow, io, path::PathBuf};

use custody_domain::tx::TxStatus;

/// Errors raised while naming, writing or reading a hand-off file.
#[derive(Debug, thiserror::Error)]
pub enum FileProtocolError {
    /// The file name does not consist of exactly five `_` separated tokens.
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    /// One token of the file name cannot be parsed.
    #[error("invalid {field} token {token:?} in file name")]
    InvalidToken {
        /// the token position, e.g. `action`
        field: &'static str,
        /// the offending token
        token: String,
    },

    /// The file is tagged with a status the reading step does not accept.
    #[error("file is tagged {found}, expected {expected}")]
    UnexpectedStatus {
        /// the status the step requires
        expected: TxStatus,
        /// the status in the file name
        found: TxStatus,
    },

    /// The body is empty or malformed.
    #[error("invalid file body: {0}")]
    InvalidBody(Cow<'static, str>),

    /// The signing context is not valid base64.
    #[error("context decode error: {0}")]
    ContextEncoding(#[from] base64::DecodeError),

    /// The signing context is not the expected structure.
    #[error("context serde error: {0}")]
    ContextSerde(#[from] serde_json::Error),

    /// A file with the same name is already present.
    #[error("file {0} already exists")]
    AlreadyExists(PathBuf),

    /// Reading or writing the file failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FileProtocolError {
    pub(crate) fn invalid_token(field: &'static str, token: &str) -> Self {
        Self::InvalidToken { field, token: token.to_owned() }
    }

    pub(crate) fn invalid_body<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::InvalidBody(err.into())
    }
}
