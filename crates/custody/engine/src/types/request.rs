//! Request types for custody engine operations.

mod error;

pub use self::error::{
    AddMultisigAddressesRequestError, CreateTransferTxRequestError, RequestError,
};

use bon::Builder;
use custody_domain::{
    account::AccountKind,
    amount::Amount,
    tx::{ActionType, TxId},
};
use dissolve_derive::Dissolve;

/// Request to sweep client funds into the deposit account.
#[derive(Debug, Default, Builder, Dissolve)]
pub struct CreateDepositTxRequest {
    /// Optional fee multiplier, checked against the configured range
    adjustment: Option<f64>,
}

/// Request to pay every pending payment request in one transaction.
#[derive(Debug, Default, Builder, Dissolve)]
pub struct CreatePaymentTxRequest {
    /// Optional fee multiplier, checked against the configured range
    adjustment: Option<f64>,
}

/// Request to move funds between two custody accounts.
///
/// # Validation
///
/// The request validates that:
/// - the receiver is neither the client nor an authorization account
/// - the sender is not an authorization or anonymous account
/// - sender and receiver differ
#[derive(Debug, Dissolve)]
pub struct CreateTransferTxRequest {
    /// The paying account
    sender: AccountKind,

    /// The receiving account, which gets a fresh address
    receiver: AccountKind,

    /// The amount to move; zero sweeps the sender
    amount: Amount,

    /// Optional fee multiplier, checked against the configured range
    adjustment: Option<f64>,
}

/// Request to abandon a transaction before broadcast.
#[derive(Debug, Builder, Dissolve)]
pub struct CancelTxRequest {
    /// The action of the record
    action: ActionType,

    /// The record to cancel
    tx_id: TxId,
}

/// Request to create multisig addresses for every pending public key of an account.
#[derive(Debug, Dissolve)]
pub struct AddMultisigAddressesRequest {
    /// The receiving account whose keys were imported
    account: AccountKind,

    /// The authorization role's own address, already known to its node
    auth_address: String,
}

#[bon::bon]
impl CreateTransferTxRequest {
    #[builder]
    pub fn new(
        sender: AccountKind,
        receiver: AccountKind,
        #[builder(default)] amount: Amount,
        adjustment: Option<f64>,
    ) -> Result<Self, CreateTransferTxRequestError> {
        if !receiver.allows_receiving_transfer() {
            return Err(CreateTransferTxRequestError::InvalidReceiver(receiver));
        }

        if sender.is_authorization() || sender == AccountKind::Anonymous {
            return Err(CreateTransferTxRequestError::InvalidSender(sender));
        }

        if sender == receiver {
            return Err(CreateTransferTxRequestError::SameAccount(sender));
        }

        Ok(Self { sender, receiver, amount, adjustment })
    }
}

#[bon::bon]
impl AddMultisigAddressesRequest {
    #[builder]
    pub fn new(
        account: AccountKind,
        auth_address: String,
    ) -> Result<Self, AddMultisigAddressesRequestError> {
        if !account.is_multisig() {
            return Err(AddMultisigAddressesRequestError::NotMultisig(account));
        }

        if auth_address.trim().is_empty() {
            return Err(AddMultisigAddressesRequestError::EmptyAuthAddress);
        }

        Ok(Self { account, auth_address })
    }
}
