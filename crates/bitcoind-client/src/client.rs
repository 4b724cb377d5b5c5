use core::{str::FromStr, time::Duration};

use async_trait::async_trait;
use base64::Engine;
use bitcoin::{Network, Transaction, consensus::encode::deserialize_hex};
use bon::Builder;
use custody_domain::{
    account::AccountKind,
    address::Unspent,
    amount::{Amount, FeeRate},
    multisig::MultisigAddress,
};
use custody_engine::node::{
    AddressBook, Broadcaster, FeeEstimator, MultisigNode, NodeClient, RawTx, RawTxBuilder,
    RawTxInput, RawTxOutput, TxInspector, UnspentSource,
};
use jsonrpsee::{
    core::{ClientError, client::ClientT, params::ArrayParams},
    http_client::{HeaderMap, HeaderValue, HttpClient, HttpClientBuilder},
    rpc_params,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use url::Url;

use crate::{
    error::{BitcoindClientError, Result},
    types::{
        AddressInfo, AddressValidation, BlockchainInfo, CreatedMultisig, ListUnspentEntry,
        NetworkInfo, SmartFeeEstimate, WalletTransaction,
    },
};

/// Confirmation target, in blocks, of fee estimation.
pub const FEE_CONF_TARGET: u16 = 6;

/// Upper bound passed to `listunspent`.
const MAX_CONFIRMATIONS: u64 = 9_999_999;

/// Address type requested for multisig addresses.
const MULTISIG_ADDRESS_TYPE: &str = "p2sh-segwit";

/// `RPC_VERIFY_ALREADY_IN_CHAIN`
const ALREADY_IN_CHAIN_CODE: i32 = -27;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings of a bitcoind wallet RPC endpoint.
#[derive(Debug, Clone, Builder)]
pub struct BitcoindConfig {
    /// RPC endpoint, including the wallet path when several wallets are loaded.
    url: Url,
    /// RPC user.
    user: String,
    /// RPC password.
    password: String,
    /// Per-request timeout.
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
}

/// A bitcoind wallet RPC client.
///
/// Wallet labels carry the [`AccountKind`] of each watched address, so every account query
/// is a label filter on the node side.
#[derive(Debug)]
pub struct BitcoindClient {
    client: HttpClient,
}

impl BitcoindClient {
    /// Connects to the endpoint in `config`.
    ///
    /// No request is made; an unreachable node only shows up on the first call.
    pub fn new(config: &BitcoindConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", basic_auth(&config.user, &config.password)?);

        let client = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(config.timeout)
            .build(config.url.as_str())?;

        Ok(Self { client })
    }

    async fn call<R>(&self, method: &'static str, params: ArrayParams) -> Result<R>
    where
        R: DeserializeOwned,
    {
        tracing::trace!(method, "bitcoind request");

        self.client.request(method, params).await.map_err(Into::into)
    }

    /// Fails unless the node runs on `expected`.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_network(&self, expected: Network) -> Result<()> {
        let info: BlockchainInfo = self.call("getblockchaininfo", rpc_params![]).await?;

        match Network::from_core_arg(&info.chain) {
            Ok(actual) if actual == expected => Ok(()),
            _ => Err(BitcoindClientError::NetworkMismatch { expected, actual: info.chain }),
        }
    }

    async fn list_unspent(&self, min_conf: u64) -> Result<Vec<ListUnspentEntry>> {
        self.call("listunspent", rpc_params![min_conf, MAX_CONFIRMATIONS]).await
    }
}

impl BitcoindConfig {
    /// Returns the endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl NodeClient for BitcoindClient {
    type Error = BitcoindClientError;
}

#[async_trait]
impl UnspentSource for BitcoindClient {
    async fn list_unspent_by_account(
        &self,
        account: AccountKind,
        min_conf: u64,
    ) -> Result<Vec<Unspent>> {
        let entries = self.list_unspent(min_conf).await?;

        Ok(entries.into_iter().filter_map(|entry| to_unspent(entry, account)).collect())
    }

    async fn balance_by_account(&self, account: AccountKind, min_conf: u64) -> Result<Amount> {
        let unspents = self.list_unspent_by_account(account, min_conf).await?;

        Amount::checked_sum(unspents.iter().map(Unspent::amount))
            .map_err(|e| BitcoindClientError::invalid_response("listunspent", e.to_string()))
    }
}

#[async_trait]
impl RawTxBuilder for BitcoindClient {
    async fn create_raw_transaction(
        &self,
        inputs: &[RawTxInput],
        outputs: &[RawTxOutput],
    ) -> Result<RawTx> {
        let inputs: Vec<Value> = inputs
            .iter()
            .map(|input| json!({ "txid": input.txid(), "vout": input.vout() }))
            .collect();

        let hex: String = self
            .call("createrawtransaction", rpc_params![inputs, outputs_param(outputs)])
            .await?;

        Ok(RawTx::new(hex))
    }
}

#[async_trait]
impl FeeEstimator for BitcoindClient {
    async fn estimate_fee_rate(&self) -> Result<FeeRate> {
        let estimate: SmartFeeEstimate =
            self.call("estimatesmartfee", rpc_params![FEE_CONF_TARGET]).await?;

        to_fee_rate(estimate)
    }

    async fn min_relay_fee(&self) -> Result<Amount> {
        let info: NetworkInfo = self.call("getnetworkinfo", rpc_params![]).await?;

        to_relay_fee(&info)
    }
}

#[async_trait]
impl Broadcaster for BitcoindClient {
    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<Option<String>> {
        match self.call::<String>("sendrawtransaction", rpc_params![signed_hex]).await {
            Ok(hash) => Ok(Some(hash)),
            Err(BitcoindClientError::Rpc(e)) if is_already_known(&e) => {
                tracing::info!(error = %e, "tx is already known to the node");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    fn tx_hash(&self, signed_hex: &str) -> Result<String> {
        decode_txid(signed_hex)
    }
}

#[async_trait]
impl TxInspector for BitcoindClient {
    async fn confirmations(&self, hash: &str) -> Result<u64> {
        let tx: WalletTransaction = self.call("gettransaction", rpc_params![hash]).await?;

        // conflicted transactions report negative counts
        Ok(u64::try_from(tx.confirmations).unwrap_or_default())
    }
}

#[async_trait]
impl AddressBook for BitcoindClient {
    async fn import_address(
        &self,
        address: &str,
        account: AccountKind,
        rescan: bool,
    ) -> Result<()> {
        self.call::<Value>("importaddress", rpc_params![address, account.label(), rescan])
            .await
            .map(|_| ())
    }

    async fn account_of(&self, address: &str) -> Result<Option<AccountKind>> {
        let info: AddressInfo = self.call("getaddressinfo", rpc_params![address]).await?;

        Ok(info.labels.first().and_then(|label| AccountKind::from_str(label).ok()))
    }

    async fn validate_address(&self, address: &str) -> Result<bool> {
        let validation: AddressValidation =
            self.call("validateaddress", rpc_params![address]).await?;

        Ok(validation.isvalid)
    }
}

#[async_trait]
impl MultisigNode for BitcoindClient {
    async fn add_multisig_address(
        &self,
        required: u8,
        keys: &[String],
        label: &str,
    ) -> Result<MultisigAddress> {
        let created: CreatedMultisig = self
            .call(
                "addmultisigaddress",
                rpc_params![required, keys, label, MULTISIG_ADDRESS_TYPE],
            )
            .await?;

        Ok(MultisigAddress::builder()
            .address(created.address)
            .redeem_script(created.redeem_script)
            .build())
    }
}

fn basic_auth(user: &str, password: &str) -> Result<HeaderValue> {
    let credentials =
        base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));

    let mut value = HeaderValue::from_str(&format!("Basic {credentials}"))
        .map_err(|_| BitcoindClientError::InvalidCredentials)?;
    value.set_sensitive(true);

    Ok(value)
}

/// Maps a `listunspent` entry to an output of `account`, dropping outputs of other labels.
fn to_unspent(entry: ListUnspentEntry, account: AccountKind) -> Option<Unspent> {
    let label = AccountKind::from_str(entry.label.as_deref()?).ok()?;
    if label != account {
        return None;
    }

    Some(
        Unspent::builder()
            .txid(entry.txid)
            .vout(entry.vout)
            .address(entry.address)
            .account(label)
            .script_pub_key(entry.script_pub_key)
            .maybe_redeem_script(entry.redeem_script)
            .amount(Amount::from_sat(entry.amount.to_sat()))
            .confirmations(entry.confirmations)
            .build(),
    )
}

/// Outputs as a list of single-address objects, which keeps their order.
fn outputs_param(outputs: &[RawTxOutput]) -> Value {
    outputs
        .iter()
        .map(|output| {
            let mut entry = Map::new();
            entry.insert(output.address().to_owned(), Value::String(output.amount().to_string()));
            Value::Object(entry)
        })
        .collect()
}

fn to_fee_rate(estimate: SmartFeeEstimate) -> Result<FeeRate> {
    if !estimate.errors.is_empty() {
        return Err(BitcoindClientError::FeeEstimate(estimate.errors.join(", ")));
    }

    let feerate = estimate
        .feerate
        .ok_or_else(|| BitcoindClientError::FeeEstimate("no fee rate returned".into()))?;

    Ok(FeeRate::from_sat_per_kb(feerate.to_sat()))
}

fn to_relay_fee(info: &NetworkInfo) -> Result<Amount> {
    if info.relayfee.to_sat() == 0 {
        return Err(BitcoindClientError::invalid_response("getnetworkinfo", "relay fee is zero"));
    }

    Ok(Amount::from_sat(info.relayfee.to_sat()))
}

fn decode_txid(signed_hex: &str) -> Result<String> {
    let tx: Transaction =
        deserialize_hex(signed_hex).map_err(|e| BitcoindClientError::InvalidTx(e.to_string()))?;

    Ok(tx.compute_txid().to_string())
}

fn is_already_known(err: &ClientError) -> bool {
    match err {
        ClientError::Call(err) => {
            err.code() == ALREADY_IN_CHAIN_CODE
                || err.message().contains("already in block chain")
                || err.message().contains("already known")
                || err.message().contains("txn-already")
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use custody_domain::{
        account::AccountKind,
        amount::{Amount, FeeRate},
    };
    use bitcoin::{
        ScriptBuf, Transaction, TxIn, TxOut, absolute::LockTime, consensus::encode::serialize_hex,
        transaction::Version,
    };
    use custody_engine::node::RawTxOutput;
    use jsonrpsee::{core::ClientError, types::ErrorObjectOwned};
    use rstest::rstest;
    use serde_json::json;

    use super::{
        basic_auth, decode_txid, is_already_known, outputs_param, to_fee_rate, to_relay_fee,
        to_unspent,
    };
    use crate::{
        error::BitcoindClientError,
        types::{ListUnspentEntry, NetworkInfo, SmartFeeEstimate},
    };

    fn entry(label: Option<&str>) -> ListUnspentEntry {
        serde_json::from_value(json!({
            "txid": "ab".repeat(32),
            "vout": 1,
            "address": "2N8hwP1WmJrFF5QWABn38y63uYLhnJYJYTF",
            "label": label,
            "scriptPubKey": "a914aa87",
            "redeemScript": "5221aa21bb52ae",
            "amount": 0.0209,
            "confirmations": 7,
            "spendable": false,
        }))
        .unwrap()
    }

    #[test]
    fn unspent_keeps_exact_satoshis() {
        let unspent = to_unspent(entry(Some("client")), AccountKind::Client).unwrap();

        assert_eq!(unspent.amount(), Amount::from_sat(2_090_000));
        assert_eq!(unspent.vout(), 1);
        assert_eq!(unspent.confirmations(), 7);
        assert_eq!(unspent.account(), AccountKind::Client);
    }

    #[rstest]
    #[case(Some("deposit"))]
    #[case(Some("unknown"))]
    #[case(None)]
    fn unspent_of_other_label_is_dropped(#[case] label: Option<&str>) {
        assert!(to_unspent(entry(label), AccountKind::Client).is_none());
    }

    #[test]
    fn receipt_label_is_deposit() {
        assert!(to_unspent(entry(Some("receipt")), AccountKind::Deposit).is_some());
    }

    #[test]
    fn fee_rate_is_converted_to_sat_per_kb() {
        let estimate: SmartFeeEstimate =
            serde_json::from_value(json!({ "feerate": 0.00012, "blocks": 6 })).unwrap();

        assert_eq!(to_fee_rate(estimate).unwrap(), FeeRate::from_sat_per_kb(12_000));
    }

    #[rstest]
    #[case(json!({ "errors": ["Insufficient data or no feerate found"], "blocks": 0 }))]
    #[case(json!({ "blocks": 0 }))]
    fn missing_fee_rate_is_an_error(#[case] response: serde_json::Value) {
        let estimate: SmartFeeEstimate = serde_json::from_value(response).unwrap();

        assert!(matches!(to_fee_rate(estimate), Err(BitcoindClientError::FeeEstimate(_))));
    }

    #[test]
    fn zero_relay_fee_is_rejected() {
        let info: NetworkInfo = serde_json::from_value(json!({ "relayfee": 0.0 })).unwrap();
        assert!(to_relay_fee(&info).is_err());

        let info: NetworkInfo = serde_json::from_value(json!({ "relayfee": 0.00001 })).unwrap();
        assert_eq!(to_relay_fee(&info).unwrap(), Amount::from_sat(1_000));
    }

    #[test]
    fn outputs_keep_order_and_exact_amounts() {
        let outputs = [
            RawTxOutput::builder().address("b".into()).amount(Amount::from_sat(15_000_000)).build(),
            RawTxOutput::builder().address("a".into()).amount(Amount::from_sat(1)).build(),
        ];

        assert_eq!(
            outputs_param(&outputs),
            json!([{ "b": "0.15000000" }, { "a": "0.00000001" }])
        );
    }

    #[rstest]
    #[case(-27, "Transaction already in block chain", true)]
    #[case(-26, "txn-already-known", true)]
    #[case(-26, "bad-txns-inputs-missingorspent", false)]
    fn already_known_broadcasts_are_recognized(
        #[case] code: i32,
        #[case] message: &str,
        #[case] expected: bool,
    ) {
        let err = ClientError::Call(ErrorObjectOwned::owned(code, message, None::<()>));

        assert_eq!(is_already_known(&err), expected);
    }

    #[test]
    fn txid_is_decoded_from_signed_hex() {
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn::default()],
            output: vec![TxOut {
                value: bitcoin::Amount::from_sat(5_000),
                script_pubkey: ScriptBuf::new(),
            }],
        };

        assert_eq!(decode_txid(&serialize_hex(&tx)).unwrap(), tx.compute_txid().to_string());
        assert!(matches!(decode_txid("02000000ff"), Err(BitcoindClientError::InvalidTx(_))));
    }

    #[test]
    fn credentials_are_base64_encoded() {
        let header = basic_auth("user", "pass").unwrap();

        assert!(header.is_sensitive());
        assert_eq!(header.to_str().unwrap(), "Basic dXNlcjpwYXNz");
    }
}
