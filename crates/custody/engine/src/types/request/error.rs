use custody_domain::account::AccountKind;

/// Top-level error for request validation.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Error creating a transfer request.
    #[error("create transfer tx error: {0}")]
    CreateTransferTx(#[from] CreateTransferTxRequestError),

    /// Error creating a multisig address request.
    #[error("add multisig addresses error: {0}")]
    AddMultisigAddresses(#[from] AddMultisigAddressesRequestError),
}

/// Errors that can occur when validating a transfer request.
#[derive(Debug, thiserror::Error)]
pub enum CreateTransferTxRequestError {
    /// The receiver may not receive internal transfers.
    #[error("{0} account is not allowed as receiver")]
    InvalidReceiver(AccountKind),

    /// The sender does not hold custody funds.
    #[error("{0} account is not allowed as sender")]
    InvalidSender(AccountKind),

    /// Sender and receiver are the same account.
    #[error("sender and receiver are the same account {0}")]
    SameAccount(AccountKind),
}

/// Errors that can occur when validating a multisig address request.
#[derive(Debug, thiserror::Error)]
pub enum AddMultisigAddressesRequestError {
    /// The account does not use multisig addresses.
    #[error("{0} account does not use multisig addresses")]
    NotMultisig(AccountKind),

    /// The authorization address is empty.
    #[error("empty auth address error")]
    EmptyAuthAddress,
}
