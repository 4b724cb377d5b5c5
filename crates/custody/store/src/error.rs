use std::borrow::Cow;

use crate::persistence::store::StoreError;

pub type Result<T, E = CustodyStoreError> = core::result::Result<T, E>;

/// Errors that can occur when interacting with the store.
#[derive(Debug, thiserror::Error)]
pub enum CustodyStoreError {
    /// A database-level error occurred.
    ///
    /// This wraps errors from the underlying persistence layer, including connection
    /// issues, query failures, constraint violations and transaction errors.
    #[error("database error: {0}")]
    Store(#[from] StoreError),

    /// The write was refused because it would break a record invariant, such as moving a
    /// transaction status backwards.
    #[error("validation error: {0}")]
    Validation(Cow<'static, str>),

    /// The requested record does not exist.
    #[error("not found error: {0}")]
    NotFound(Cow<'static, str>),

    /// Failed to acquire a database connection from the pool.
    #[error("pool error")]
    Pool,

    /// A stored value cannot be converted into its domain representation.
    #[error("invalid value error: {0}")]
    InvalidValue(Cow<'static, str>),
}

impl CustodyStoreError {
    pub(crate) fn invalid_value<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::InvalidValue(err.into())
    }
}

impl From<diesel::result::Error> for CustodyStoreError {
    fn from(err: diesel::result::Error) -> Self {
        CustodyStoreError::Store(StoreError::Db(err))
    }
}
