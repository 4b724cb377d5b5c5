//! Capabilities the engine needs from the coin daemon.
//!
//! Each trait covers one concern so a use case only asks for what it calls. The bitcoind
//! client implements all of them; tests use an in-memory node.

use async_trait::async_trait;
use bon::Builder;
use custody_domain::{
    account::AccountKind,
    address::Unspent,
    amount::{Amount, FeeRate},
    multisig::MultisigAddress,
};
use dissolve_derive::Dissolve;

/// Base trait of every node capability.
pub trait NodeClient: Send + Sync {
    /// The error returned by node calls.
    type Error: std::error::Error + Send + Sync + 'static;
}

/// An outpoint consumed by a raw transaction.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct RawTxInput {
    txid: String,
    vout: u32,
}

/// A destination of a raw transaction.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct RawTxOutput {
    address: String,
    amount: Amount,
}

/// A serialized raw transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTx {
    hex: String,
}

/// Lists spendable outputs.
#[async_trait]
pub trait UnspentSource: NodeClient {
    /// Returns the unspent outputs held by `account` with at least `min_conf`
    /// confirmations, in node order.
    async fn list_unspent_by_account(
        &self,
        account: AccountKind,
        min_conf: u64,
    ) -> Result<Vec<Unspent>, Self::Error>;

    /// Returns the spendable balance of `account`.
    async fn balance_by_account(
        &self,
        account: AccountKind,
        min_conf: u64,
    ) -> Result<Amount, Self::Error>;
}

/// Builds raw transactions.
#[async_trait]
pub trait RawTxBuilder: NodeClient {
    /// Builds an unsigned raw transaction spending `inputs` into `outputs`.
    async fn create_raw_transaction(
        &self,
        inputs: &[RawTxInput],
        outputs: &[RawTxOutput],
    ) -> Result<RawTx, Self::Error>;
}

/// Estimates network fees.
#[async_trait]
pub trait FeeEstimator: NodeClient {
    /// Returns the current fee rate estimate.
    async fn estimate_fee_rate(&self) -> Result<FeeRate, Self::Error>;

    /// Returns the minimum relay fee the node accepts for any transaction.
    async fn min_relay_fee(&self) -> Result<Amount, Self::Error>;
}

/// Broadcasts signed transactions.
#[async_trait]
pub trait Broadcaster: NodeClient {
    /// Broadcasts `signed_hex`.
    ///
    /// Returns `None` when the node already knows the transaction.
    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<Option<String>, Self::Error>;

    /// Returns the hash `signed_hex` is broadcast as.
    fn tx_hash(&self, signed_hex: &str) -> Result<String, Self::Error>;
}

/// Inspects broadcast transactions.
#[async_trait]
pub trait TxInspector: NodeClient {
    /// Returns the confirmation count of transaction `hash`.
    async fn confirmations(&self, hash: &str) -> Result<u64, Self::Error>;
}

/// Manages the node's watch-only address book.
#[async_trait]
pub trait AddressBook: NodeClient {
    /// Imports `address` under the label of `account`.
    async fn import_address(
        &self,
        address: &str,
        account: AccountKind,
        rescan: bool,
    ) -> Result<(), Self::Error>;

    /// Returns the account the address is labelled with, if known.
    async fn account_of(&self, address: &str) -> Result<Option<AccountKind>, Self::Error>;

    /// Whether `address` is a valid address for the node's network.
    async fn validate_address(&self, address: &str) -> Result<bool, Self::Error>;
}

/// Creates multisig addresses.
#[async_trait]
pub trait MultisigNode: NodeClient {
    /// Creates a `required`-of-`keys.len()` address from `keys` and stores it under
    /// `label`.
    async fn add_multisig_address(
        &self,
        required: u8,
        keys: &[String],
        label: &str,
    ) -> Result<MultisigAddress, Self::Error>;
}

/// Everything the online watch role asks of its node.
pub trait WatchNode:
    UnspentSource + RawTxBuilder + FeeEstimator + Broadcaster + TxInspector + AddressBook
{
}

impl<T> WatchNode for T where
    T: UnspentSource + RawTxBuilder + FeeEstimator + Broadcaster + TxInspector + AddressBook
{
}

impl RawTxInput {
    /// Returns the source transaction id.
    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// Returns the source output index.
    pub fn vout(&self) -> u32 {
        self.vout
    }
}

impl RawTxOutput {
    /// Returns the destination address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the output amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }
}

impl RawTx {
    /// Wraps a hex encoded transaction.
    pub fn new(hex: String) -> Self {
        Self { hex }
    }

    /// Returns the hex encoding.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Returns the serialized size in bytes.
    pub fn size(&self) -> usize {
        self.hex.len() / 2
    }

    /// Returns the hex encoding, consuming the transaction.
    pub fn into_hex(self) -> String {
        self.hex
    }
}

impl From<&Unspent> for RawTxInput {
    fn from(unspent: &Unspent) -> Self {
        Self { txid: unspent.txid().to_owned(), vout: unspent.vout() }
    }
}
