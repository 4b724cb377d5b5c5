use std::{
    collections::{HashMap, HashSet},
    fmt::Write,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
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

/// Errors returned by [`MockNode`].
#[derive(Debug, thiserror::Error)]
pub enum MockNodeError {
    /// The call was refused as configured by the test.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The node does not know the transaction.
    #[error("unknown tx {0}")]
    UnknownTx(String),

    /// The queried value was not configured.
    #[error("{0} is not available")]
    Unavailable(&'static str),
}

/// An in-memory coin node.
///
/// Raw transactions are a deterministic hex serialization of their inputs and outputs, so
/// the same inputs and outputs always give the same hex and the size grows with the number
/// of inputs and outputs. Broadcasting does not spend anything.
#[derive(Debug)]
pub struct MockNode {
    state: Mutex<NodeState>,
}

#[derive(Debug)]
struct NodeState {
    unspents: Vec<Unspent>,
    fee_rate: FeeRate,
    min_relay_fee: Option<Amount>,
    broadcast_rejection: Option<String>,
    broadcasts: Vec<String>,
    confirmations: HashMap<String, u64>,
    address_book: HashMap<String, AccountKind>,
    rejected_keys: HashSet<String>,
    multisig_count: u32,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            state: Mutex::new(NodeState {
                unspents: Vec::new(),
                fee_rate: FeeRate::from_sat_per_kb(10_000),
                min_relay_fee: Some(Amount::from_sat(1_000)),
                broadcast_rejection: None,
                broadcasts: Vec::new(),
                confirmations: HashMap::new(),
                address_book: HashMap::new(),
                rejected_keys: HashSet::new(),
                multisig_count: 0,
            }),
        }
    }
}

impl MockNode {
    /// Creates a node with a 10000 sat/kB fee rate, a 1000 sat relay fee and no outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spendable output.
    pub fn with_unspent(self, unspent: Unspent) -> Self {
        self.add_unspent(unspent);
        self
    }

    /// Adds a spendable output.
    pub fn add_unspent(&self, unspent: Unspent) {
        self.state().unspents.push(unspent);
    }

    /// Removes every spendable output.
    pub fn clear_unspents(&self) {
        self.state().unspents.clear();
    }

    /// Sets the fee rate estimate.
    pub fn set_fee_rate(&self, fee_rate: FeeRate) {
        self.state().fee_rate = fee_rate;
    }

    /// Sets the relay fee, or makes the query fail with `None`.
    pub fn set_min_relay_fee(&self, fee: Option<Amount>) {
        self.state().min_relay_fee = fee;
    }

    /// Makes every broadcast fail with `reason`, or accepts them again with `None`.
    pub fn reject_broadcasts(&self, reason: Option<&str>) {
        self.state().broadcast_rejection = reason.map(ToOwned::to_owned);
    }

    /// Sets the confirmation count of a broadcast transaction.
    pub fn set_confirmations(&self, hash: &str, confirmations: u64) {
        self.state().confirmations.insert(hash.to_owned(), confirmations);
    }

    /// Makes multisig creation fail for any key set containing `key`.
    pub fn reject_key(&self, key: &str) {
        self.state().rejected_keys.insert(key.to_owned());
    }

    /// Returns the hex of every accepted broadcast, in order.
    pub fn broadcasts(&self) -> Vec<String> {
        self.state().broadcasts.clone()
    }

    /// Returns the account an address was imported under.
    pub fn imported_account(&self, address: &str) -> Option<AccountKind> {
        self.state().address_book.get(address).copied()
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NodeClient for MockNode {
    type Error = MockNodeError;
}

#[async_trait]
impl UnspentSource for MockNode {
    async fn list_unspent_by_account(
        &self,
        account: AccountKind,
        min_conf: u64,
    ) -> Result<Vec<Unspent>, Self::Error> {
        Ok(self
            .state()
            .unspents
            .iter()
            .filter(|unspent| unspent.account() == account && unspent.confirmations() >= min_conf)
            .cloned()
            .collect())
    }

    async fn balance_by_account(
        &self,
        account: AccountKind,
        min_conf: u64,
    ) -> Result<Amount, Self::Error> {
        let unspents = self.list_unspent_by_account(account, min_conf).await?;

        Amount::checked_sum(unspents.iter().map(Unspent::amount))
            .map_err(|e| MockNodeError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl RawTxBuilder for MockNode {
    async fn create_raw_transaction(
        &self,
        inputs: &[RawTxInput],
        outputs: &[RawTxOutput],
    ) -> Result<RawTx, Self::Error> {
        if inputs.is_empty() || outputs.is_empty() {
            return Err(MockNodeError::Rejected("tx without inputs or outputs".into()));
        }

        let mut hex = String::from("02000000");

        for input in inputs {
            push_hex(&mut hex, input.txid().as_bytes());
            push_hex(&mut hex, &input.vout().to_le_bytes());
        }

        for output in outputs {
            push_hex(&mut hex, output.address().as_bytes());
            push_hex(&mut hex, &output.amount().to_sat().to_le_bytes());
        }

        Ok(RawTx::new(hex))
    }
}

#[async_trait]
impl FeeEstimator for MockNode {
    async fn estimate_fee_rate(&self) -> Result<FeeRate, Self::Error> {
        Ok(self.state().fee_rate)
    }

    async fn min_relay_fee(&self) -> Result<Amount, Self::Error> {
        self.state().min_relay_fee.ok_or(MockNodeError::Unavailable("relay fee"))
    }
}

#[async_trait]
impl Broadcaster for MockNode {
    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<Option<String>, Self::Error> {
        let mut state = self.state();

        if let Some(reason) = &state.broadcast_rejection {
            return Err(MockNodeError::Rejected(reason.clone()));
        }

        if state.broadcasts.iter().any(|hex| hex == signed_hex) {
            return Ok(None);
        }

        state.broadcasts.push(signed_hex.to_owned());

        Ok(Some(broadcast_hash(state.broadcasts.len() - 1)))
    }

    fn tx_hash(&self, signed_hex: &str) -> Result<String, Self::Error> {
        self.state()
            .broadcasts
            .iter()
            .position(|hex| hex == signed_hex)
            .map(broadcast_hash)
            .ok_or_else(|| MockNodeError::UnknownTx(signed_hex.to_owned()))
    }
}

#[async_trait]
impl TxInspector for MockNode {
    async fn confirmations(&self, hash: &str) -> Result<u64, Self::Error> {
        self.state()
            .confirmations
            .get(hash)
            .copied()
            .ok_or_else(|| MockNodeError::UnknownTx(hash.to_owned()))
    }
}

#[async_trait]
impl AddressBook for MockNode {
    async fn import_address(
        &self,
        address: &str,
        account: AccountKind,
        _rescan: bool,
    ) -> Result<(), Self::Error> {
        if address.is_empty() {
            return Err(MockNodeError::Rejected("empty address".into()));
        }

        self.state().address_book.insert(address.to_owned(), account);

        Ok(())
    }

    async fn account_of(&self, address: &str) -> Result<Option<AccountKind>, Self::Error> {
        Ok(self.imported_account(address))
    }

    async fn validate_address(&self, address: &str) -> Result<bool, Self::Error> {
        Ok(!address.is_empty())
    }
}

#[async_trait]
impl MultisigNode for MockNode {
    async fn add_multisig_address(
        &self,
        required: u8,
        keys: &[String],
        label: &str,
    ) -> Result<MultisigAddress, Self::Error> {
        let mut state = self.state();

        if let Some(key) = keys.iter().find(|key| state.rejected_keys.contains(*key)) {
            return Err(MockNodeError::Rejected(format!("invalid key {key}")));
        }

        if usize::from(required) > keys.len() {
            return Err(MockNodeError::Rejected(format!(
                "{required} signatures required from {} keys",
                keys.len()
            )));
        }

        state.multisig_count += 1;

        let mut redeem_script = format!("5{required}");
        for key in keys {
            push_hex(&mut redeem_script, key.as_bytes());
        }
        let _ = write!(redeem_script, "5{}ae", keys.len());

        let address = format!("2N-{label}-{}", state.multisig_count);
        state.address_book.insert(address.clone(), AccountKind::Authorization);

        Ok(MultisigAddress::builder().address(address).redeem_script(redeem_script).build())
    }
}

fn broadcast_hash(position: usize) -> String {
    format!("{:064x}", position + 1)
}

fn push_hex(hex: &mut String, bytes: &[u8]) {
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
}

#[cfg(test)]
mod tests {
    use custody_domain::{account::AccountKind, amount::Amount};
    use custody_engine::node::{
        Broadcaster, MultisigNode, RawTxBuilder, RawTxInput, RawTxOutput, UnspentSource,
    };

    use super::{MockNode, MockNodeError};
    use crate::unspent;

    #[tokio::test]
    async fn raw_tx_is_deterministic() {
        let node = MockNode::new();
        let inputs = [RawTxInput::builder().txid("aa".into()).vout(0).build()];
        let outputs =
            [RawTxOutput::builder().address("x".into()).amount(Amount::from_sat(5)).build()];

        let first = node.create_raw_transaction(&inputs, &outputs).await.unwrap();
        let second = node.create_raw_transaction(&inputs, &outputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.size(), 4 + 2 + 4 + 1 + 8);
    }

    #[tokio::test]
    async fn lists_confirmed_outputs_of_account() {
        let node = MockNode::new()
            .with_unspent(unspent("a1", "c-1", AccountKind::Client, Amount::from_sat(10)))
            .with_unspent(unspent("a2", "d-1", AccountKind::Deposit, Amount::from_sat(20)));

        let listed = node.list_unspent_by_account(AccountKind::Client, 6).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(node.list_unspent_by_account(AccountKind::Client, 11).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_broadcast_is_already_known() {
        let node = MockNode::new();

        let hash = node.send_raw_transaction("00ff").await.unwrap().unwrap();
        assert!(node.send_raw_transaction("00ff").await.unwrap().is_none());
        assert_eq!(node.tx_hash("00ff").unwrap(), hash);
        assert!(node.tx_hash("0100").is_err());

        node.reject_broadcasts(Some("missing inputs"));
        assert!(matches!(
            node.send_raw_transaction("0100").await,
            Err(MockNodeError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn rejected_key_fails_multisig_creation() {
        let node = MockNode::new();
        node.reject_key("bad");

        assert!(node.add_multisig_address(2, &["bad".into(), "ok".into()], "l").await.is_err());

        let created =
            node.add_multisig_address(2, &["good".into(), "ok".into()], "l").await.unwrap();
        assert!(created.validate().is_ok());
    }
}
