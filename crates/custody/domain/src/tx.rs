//! Transaction domain models and the transaction lifecycle.

use alloc::string::String;
use core::fmt;

use bon::Builder;
use dissolve_derive::Dissolve;
use strum::{Display, EnumString, IntoStaticStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Timestamps, account::AccountKind, amount::Amount};

/// The persisted identifier of a transaction record.
///
/// This is the only piece of identity that crosses the air gap, carried in hand-off file
/// names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct TxId(i64);

/// The kind of transfer a transaction record performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ActionType {
    /// Sweep of client funds into the deposit (receipt) account.
    #[strum(to_string = "deposit", serialize = "receipt")]
    #[cfg_attr(feature = "serde", serde(alias = "receipt"))]
    Deposit,
    /// Batch of outgoing payments built from pending payment requests.
    Payment,
    /// Internal transfer between two custody accounts.
    Transfer,
}

/// The lifecycle status of a transaction record.
///
/// ```text
/// unsigned -> signed -> sent -> done -> notified
///     \         \
///      +---------+--> cancel
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum TxStatus {
    /// Built and recorded, waiting for the offline signers.
    Unsigned = 1,
    /// A signed hand-back file was imported.
    Signed = 2,
    /// Accepted by the node.
    Sent = 3,
    /// Reached the required number of confirmations.
    Done = 4,
    /// Downstream consumers have been informed.
    Notified = 5,
    /// Abandoned by an operator before broadcast.
    Cancel = 6,
}

/// A transaction that has been built but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnsignedTx {
    /// The kind of transfer.
    action: ActionType,
    /// Raw unsigned transaction hex.
    unsigned_hex: String,
    /// Sum of all consumed inputs.
    total_input: Amount,
    /// Sum of all outputs after the fee was deducted.
    total_output: Amount,
    /// Network fee.
    fee: Amount,
}

/// A persisted transaction record.
///
/// # Type Parameters
///
/// * `AUX` - Auxiliary data type, defaults to [`Timestamps`] for tracking metadata.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TxRecord<AUX = Timestamps> {
    /// The record id.
    id: TxId,
    /// The kind of transfer.
    action: ActionType,
    /// The current lifecycle status.
    status: TxStatus,
    /// Raw unsigned transaction hex.
    unsigned_hex: String,
    /// Raw signed transaction hex, once imported.
    signed_hex: Option<String>,
    /// The broadcast hash, once sent.
    sent_hash: Option<String>,
    /// Sum of all consumed inputs.
    total_input: Amount,
    /// Sum of all outputs.
    total_output: Amount,
    /// Network fee.
    fee: Amount,
    /// Auxiliary metadata.
    aux: AUX,
}

/// One consumed unspent output of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TxInput {
    /// Source transaction id.
    input_txid: String,
    /// Source output index.
    input_vout: u32,
    /// Address holding the output.
    input_address: String,
    /// Account owning the address.
    input_account: AccountKind,
    /// Amount of the output.
    input_amount: Amount,
    /// Confirmations at selection time.
    input_confirmations: u64,
}

/// One output of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TxOutput {
    /// Destination address.
    output_address: String,
    /// Account owning the destination; anonymous for external receivers.
    output_account: AccountKind,
    /// Amount sent to the destination.
    output_amount: Amount,
    /// Whether the output returns change to the sender.
    is_change: bool,
}

impl TxStatus {
    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Only single forward steps are allowed, plus cancellation before broadcast.
    pub fn can_transition_to(self, next: TxStatus) -> bool {
        use TxStatus::*;

        matches!(
            (self, next),
            (Unsigned, Signed)
                | (Signed, Sent)
                | (Sent, Done)
                | (Done, Notified)
                | (Unsigned, Cancel)
                | (Signed, Cancel)
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Notified | Self::Cancel)
    }

    /// Whether the transaction has been handed to the network.
    pub fn is_broadcast(self) -> bool {
        matches!(self, Self::Sent | Self::Done | Self::Notified)
    }
}

impl ActionType {
    /// All action types, in monitoring order.
    pub const ALL: [ActionType; 3] = [Self::Deposit, Self::Payment, Self::Transfer];
}

impl<AUX> TxRecord<AUX> {
    /// Returns the record id.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Returns the kind of transfer.
    pub fn action(&self) -> ActionType {
        self.action
    }

    /// Returns the current status.
    pub fn status(&self) -> TxStatus {
        self.status
    }

    /// Returns the unsigned hex.
    pub fn unsigned_hex(&self) -> &str {
        &self.unsigned_hex
    }

    /// Returns the signed hex, if imported.
    pub fn signed_hex(&self) -> Option<&str> {
        self.signed_hex.as_deref()
    }

    /// Returns the broadcast hash, if sent.
    pub fn sent_hash(&self) -> Option<&str> {
        self.sent_hash.as_deref()
    }

    /// Returns the sum of the inputs.
    pub fn total_input(&self) -> Amount {
        self.total_input
    }

    /// Returns the sum of the outputs.
    pub fn total_output(&self) -> Amount {
        self.total_output
    }

    /// Returns the fee.
    pub fn fee(&self) -> Amount {
        self.fee
    }
}

impl UnsignedTx {
    /// Returns the kind of transfer.
    pub fn action(&self) -> ActionType {
        self.action
    }

    /// Returns the unsigned hex.
    pub fn unsigned_hex(&self) -> &str {
        &self.unsigned_hex
    }

    /// Returns the input total.
    pub fn total_input(&self) -> Amount {
        self.total_input
    }

    /// Returns the output total.
    pub fn total_output(&self) -> Amount {
        self.total_output
    }

    /// Returns the fee.
    pub fn fee(&self) -> Amount {
        self.fee
    }
}

impl TxInput {
    /// Returns the source transaction id.
    pub fn input_txid(&self) -> &str {
        &self.input_txid
    }

    /// Returns the source output index.
    pub fn input_vout(&self) -> u32 {
        self.input_vout
    }

    /// Returns the amount of the consumed output.
    pub fn input_amount(&self) -> Amount {
        self.input_amount
    }

    /// Returns the address holding the consumed output.
    pub fn input_address(&self) -> &str {
        &self.input_address
    }
}

impl TxOutput {
    /// Returns the destination address.
    pub fn output_address(&self) -> &str {
        &self.output_address
    }

    /// Returns the account owning the destination.
    pub fn output_account(&self) -> AccountKind {
        self.output_account
    }

    /// Returns the output amount.
    pub fn output_amount(&self) -> Amount {
        self.output_amount
    }

    /// Whether the output is change back to the sender.
    pub fn is_change(&self) -> bool {
        self.is_change
    }
}

impl From<i64> for TxId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TxId> for i64 {
    fn from(TxId(id): TxId) -> Self {
        id
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use rstest::rstest;

    use super::{ActionType, TxStatus};

    const CHAIN: [TxStatus; 5] =
        [TxStatus::Unsigned, TxStatus::Signed, TxStatus::Sent, TxStatus::Done, TxStatus::Notified];

    #[test]
    fn forward_chain_is_allowed_one_step_at_a_time() {
        for pair in CHAIN.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }

        assert!(!TxStatus::Unsigned.can_transition_to(TxStatus::Sent));
        assert!(!TxStatus::Signed.can_transition_to(TxStatus::Done));
    }

    #[test]
    fn status_never_moves_backwards() {
        for (i, from) in CHAIN.iter().enumerate() {
            for to in &CHAIN[..=i] {
                assert!(!from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[rstest]
    #[case(TxStatus::Unsigned, true)]
    #[case(TxStatus::Signed, true)]
    #[case(TxStatus::Sent, false)]
    #[case(TxStatus::Done, false)]
    #[case(TxStatus::Notified, false)]
    #[case(TxStatus::Cancel, false)]
    fn cancel_only_before_broadcast(#[case] from: TxStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(TxStatus::Cancel), allowed);
    }

    #[test]
    fn action_accepts_receipt_alias() {
        assert_eq!(ActionType::from_str("receipt").unwrap(), ActionType::Deposit);
        assert_eq!(ActionType::Deposit.to_string(), "deposit");
        assert!(ActionType::from_str("withdrawal").is_err());
    }

    #[test]
    fn status_labels_round_trip() {
        for status in CHAIN.iter().copied().chain([TxStatus::Cancel]) {
            assert_eq!(TxStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }
}
