//! Response shapes of the bitcoind RPC methods the client calls.

use bitcoin::Amount as BtcAmount;
use serde::Deserialize;

/// An entry of `listunspent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListUnspentEntry {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
    pub script_pub_key: String,
    #[serde(default)]
    pub redeem_script: Option<String>,
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    pub amount: BtcAmount,
    pub confirmations: u64,
    #[serde(default)]
    pub spendable: bool,
}

/// The result of `estimatesmartfee`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SmartFeeEstimate {
    #[serde(default, with = "bitcoin::amount::serde::as_btc::opt")]
    pub feerate: Option<BtcAmount>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// The part of `getnetworkinfo` the client reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NetworkInfo {
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    pub relayfee: BtcAmount,
}

/// The part of `gettransaction` the client reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WalletTransaction {
    /// Negative while the transaction conflicts with the best chain.
    pub confirmations: i64,
}

/// The part of `getaddressinfo` the client reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AddressInfo {
    #[serde(default)]
    pub labels: Vec<String>,
}

/// The result of `validateaddress`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AddressValidation {
    pub isvalid: bool,
}

/// The result of `addmultisigaddress`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedMultisig {
    pub address: String,
    pub redeem_script: String,
}

/// The part of `getblockchaininfo` the client reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BlockchainInfo {
    /// `main`, `test`, `signet` or `regtest`
    pub chain: String,
}
