//! Externally queued payment instructions.

use alloc::string::String;

use bon::Builder;
use dissolve_derive::Dissolve;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Timestamps, account::AccountKind, amount::Amount, tx::TxId};

/// A queued instruction to pay an external address.
///
/// Created upstream, linked to the transaction that pays it through `payment_id`, and
/// marked done once that transaction reaches `notified`.
///
/// # Type Parameters
///
/// * `AUX` - Auxiliary data type, defaults to [`Timestamps`] for tracking metadata.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PaymentRequest<AUX = Timestamps> {
    /// The record id.
    id: i64,
    /// The requesting customer's address.
    sender_address: String,
    /// The requesting customer's account.
    sender_account: AccountKind,
    /// The external destination.
    receiver_address: String,
    /// Requested amount.
    amount: Amount,
    /// The transaction that pays this request, once bundled.
    payment_id: Option<TxId>,
    /// Set once the paying transaction was notified.
    #[builder(default)]
    is_done: bool,
    /// Auxiliary metadata.
    aux: AUX,
}

impl<AUX> PaymentRequest<AUX> {
    /// Returns the record id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the external destination.
    pub fn receiver_address(&self) -> &str {
        &self.receiver_address
    }

    /// Returns the requested amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns the paying transaction, if bundled.
    pub fn payment_id(&self) -> Option<TxId> {
        self.payment_id
    }

    /// Whether the paying transaction was notified.
    pub fn is_done(&self) -> bool {
        self.is_done
    }

    /// Whether the request is still waiting to be bundled.
    pub fn is_pending(&self) -> bool {
        self.payment_id.is_none() && !self.is_done
    }
}
