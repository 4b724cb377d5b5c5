use std::borrow::Cow;

pub type Result<T, E = BitcoindClientError> = core::result::Result<T, E>;

/// Errors returned by [`BitcoindClient`](crate::BitcoindClient).
#[derive(Debug, thiserror::Error)]
pub enum BitcoindClientError {
    /// The RPC call failed at the transport or was answered with an error object.
    #[error("rpc error: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    /// The credentials cannot be carried in an HTTP header.
    #[error("invalid credentials header")]
    InvalidCredentials,

    /// The node answered with a value that does not fit the domain model.
    #[error("invalid response from {method}: {reason}")]
    InvalidResponse {
        /// the RPC method
        method: &'static str,
        /// what was wrong
        reason: Cow<'static, str>,
    },

    /// The node runs on another chain than configured.
    #[error("node runs on {actual}, expected {expected}")]
    NetworkMismatch {
        /// configured network
        expected: bitcoin::Network,
        /// chain reported by the node
        actual: String,
    },

    /// A signed transaction hex does not decode.
    #[error("invalid tx: {0}")]
    InvalidTx(String),

    /// The node has no fee estimate yet.
    #[error("fee estimation failed: {0}")]
    FeeEstimate(String),

    /// An unclassified error.
    #[error("other error: {0}")]
    Other(Cow<'static, str>),
}

impl BitcoindClientError {
    pub(crate) fn invalid_response<E>(method: &'static str, reason: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::InvalidResponse { method, reason: reason.into() }
    }

    pub(crate) fn other<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Other(err.into())
    }
}
