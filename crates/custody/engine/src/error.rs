use std::borrow::Cow;

use custody_domain::{
    amount::{Amount, AmountError, FeeAdjustmentError},
    multisig::MultisigError,
    tx::TxStatus,
};

use crate::{file::FileProtocolError, keyfile::KeyFileError};

/// A boxed collaborator error, keeping its message across the engine boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error returned by every engine operation.
///
/// The category is available through [`CustodyEngineError::kind`] for callers that must
/// branch on it, e.g. to tell a retryable broadcast rejection from a post-broadcast
/// inconsistency that needs manual reconciliation.
#[derive(Debug, thiserror::Error)]
#[error("custody engine error: {0}")]
pub struct CustodyEngineError(#[from] CustodyEngineErrorKind);

/// Categories of [`CustodyEngineError`].
#[derive(Debug, thiserror::Error)]
pub enum CustodyEngineErrorKind {
    /// The candidate unspent outputs cannot cover a non-zero target.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// target amount
        required: Amount,
        /// sum of all candidates
        available: Amount,
    },

    /// The fee would drive the fee-bearing output to zero or below.
    #[error("insufficient funds to cover fee {fee}")]
    InsufficientFee {
        /// the computed fee
        fee: Amount,
    },

    /// Several outputs exist but none returns change to the sender.
    #[error("no output belongs to the sender account")]
    MissingChangeOutput,

    /// Inputs do not equal outputs plus fee after adjustment.
    #[error("inconsistent totals: input {input}, output {output}, fee {fee}")]
    InconsistentTotals {
        /// sum of inputs
        input: Amount,
        /// sum of outputs
        output: Amount,
        /// fee
        fee: Amount,
    },

    /// An amount computation overflowed or went negative.
    #[error("amount error: {0}")]
    Amount(#[from] AmountError),

    /// The operator supplied fee multiplier is outside the configured range.
    #[error("fee adjustment error: {0}")]
    FeeAdjustment(#[from] FeeAdjustmentError),

    /// Multisig parameters or exchanged keys are invalid.
    #[error("multisig error: {0}")]
    Multisig(#[from] MultisigError),

    /// A hand-off file name or body violates the exchange protocol.
    #[error("file protocol error: {0}")]
    FileProtocol(#[from] FileProtocolError),

    /// A key-exchange file cannot be read or written.
    #[error("key file error: {0}")]
    KeyFile(#[from] KeyFileError),

    /// The node rejected the signed transaction; the status is unchanged and the send can
    /// be retried from the same file.
    #[error("broadcast rejected by node: {0}")]
    Broadcast(BoxError),

    /// The node accepted the transaction but recording it failed. Funds have moved; the
    /// record needs manual correction.
    #[error("tx {hash} was broadcast but recording it failed: {source}")]
    PostBroadcast {
        /// the broadcast hash
        hash: String,
        /// the failed write
        source: BoxError,
    },

    /// The imported hex equals the unsigned hex, so nothing was signed.
    #[error("tx has not been signed")]
    NotSigned,

    /// The record is not in a status that permits the requested step.
    #[error("tx status cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// current status
        from: TxStatus,
        /// requested status
        to: TxStatus,
    },

    /// The request is inconsistent, e.g. a transfer to the sending account.
    #[error("invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    /// A node call failed.
    #[error("node error: {0}")]
    Node(BoxError),

    /// A repository call failed.
    #[error("repository error: {0}")]
    Repository(BoxError),

    /// A referenced record does not exist.
    #[error("not found error: {0}")]
    NotFound(Cow<'static, str>),

    /// An unclassified error.
    #[error("other error: {0}")]
    Other(Cow<'static, str>),
}

impl CustodyEngineError {
    /// Returns the error category.
    pub fn kind(&self) -> &CustodyEngineErrorKind {
        &self.0
    }

    /// Consumes the error, returning its category.
    pub fn into_kind(self) -> CustodyEngineErrorKind {
        self.0
    }
}

impl CustodyEngineErrorKind {
    pub(crate) fn node<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Node(Box::new(err))
    }

    pub(crate) fn repository<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Repository(Box::new(err))
    }

    pub(crate) fn broadcast<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Broadcast(Box::new(err))
    }

    pub(crate) fn post_broadcast<E>(hash: &str, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::PostBroadcast { hash: hash.to_owned(), source: err.into() }
    }

    pub(crate) fn invalid_request<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::InvalidRequest(err.into())
    }

    pub(crate) fn not_found<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::NotFound(err.into())
    }

    pub(crate) fn other<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Other(err.into())
    }
}

impl From<AmountError> for CustodyEngineError {
    fn from(err: AmountError) -> Self {
        Self(err.into())
    }
}

pub type Result<T, E = CustodyEngineError> = core::result::Result<T, E>;
