use std::{
    borrow::Cow,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use custody_domain::{
    Timestamps,
    account::AccountKind,
    address::{AddressRecord, AddressRecordDissolved},
    amount::Amount,
    multisig::{MultisigAddress, MultisigHistory},
    payment::{PaymentRequest, PaymentRequestDissolved},
    tx::{ActionType, TxId, TxInput, TxOutput, TxRecord, TxStatus, UnsignedTx},
};
use custody_engine::repository::{
    AddressRepository, MultisigRepository, PaymentRepository, Repository, TxRepository,
};

/// Errors returned by [`MemoryRepository`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryRepositoryError {
    /// The write would break a record invariant.
    #[error("validation error: {0}")]
    Validation(Cow<'static, str>),

    /// The record does not exist.
    #[error("not found error: {0}")]
    NotFound(Cow<'static, str>),

    /// A write failed as configured by the test.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

type Result<T> = core::result::Result<T, MemoryRepositoryError>;

/// An in-memory repository enforcing the same record invariants as the SQL store: unique
/// unsigned hex per action among records that are not cancelled, forward-only status moves
/// and immutable multisig addresses.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<RepoState>,
}

#[derive(Debug, Default)]
struct RepoState {
    addresses: Vec<AddressRow>,
    txs: Vec<TxRow>,
    payments: Vec<PaymentRow>,
    histories: Vec<HistoryRow>,
    write_failure: Option<String>,
}

#[derive(Debug, Clone)]
struct AddressRow {
    coin: String,
    account: AccountKind,
    p2pkh_address: String,
    p2sh_segwit_address: String,
    bech32_address: String,
    full_public_key: String,
    multisig_address: Option<String>,
    redeem_script: Option<String>,
    key_index: u32,
    is_allocated: bool,
    is_exported: bool,
}

#[derive(Debug, Clone)]
struct TxRow {
    id: TxId,
    action: ActionType,
    status: TxStatus,
    unsigned_hex: String,
    signed_hex: Option<String>,
    sent_hash: Option<String>,
    total_input: Amount,
    total_output: Amount,
    fee: Amount,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone)]
struct PaymentRow {
    id: i64,
    sender_address: String,
    sender_account: AccountKind,
    receiver_address: String,
    amount: Amount,
    payment_id: Option<TxId>,
    is_done: bool,
}

#[derive(Debug, Clone)]
struct HistoryRow {
    id: i64,
    account: AccountKind,
    full_public_key: String,
    auth_address1: Option<String>,
    multisig_address: Option<String>,
    redeem_script: Option<String>,
    is_exported: bool,
}

impl MemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores address records, skipping keys already stored.
    pub fn with_addresses(self, records: impl IntoIterator<Item = AddressRecord<()>>) -> Self {
        {
            let mut state = self.state();
            for record in records {
                state.insert_address(record);
            }
        }
        self
    }

    /// Queues payment requests. Their ids are kept as given.
    pub fn with_payment_requests(
        self,
        requests: impl IntoIterator<Item = PaymentRequest<()>>,
    ) -> Self {
        {
            let mut state = self.state();
            for request in requests {
                let PaymentRequestDissolved {
                    id,
                    sender_address,
                    sender_account,
                    receiver_address,
                    amount,
                    payment_id,
                    is_done,
                    aux: (),
                } = request.dissolve();

                state.payments.push(PaymentRow {
                    id,
                    sender_address,
                    sender_account,
                    receiver_address,
                    amount,
                    payment_id,
                    is_done,
                });
            }
        }
        self
    }

    /// Makes the next write fail with `reason`. Reads are unaffected.
    pub fn fail_next_write(&self, reason: &str) {
        self.state().write_failure = Some(reason.to_owned());
    }

    /// Returns every stored address record, in insertion order.
    pub fn addresses(&self) -> Vec<AddressRecord> {
        self.state().addresses.iter().map(AddressRow::to_record).collect()
    }

    /// Returns every transaction record, in insertion order.
    pub fn txs(&self) -> Vec<TxRecord> {
        self.state().txs.iter().map(TxRow::to_record).collect()
    }

    /// Returns every payment request, in insertion order.
    pub fn payment_requests(&self) -> Vec<PaymentRequest> {
        self.state().payments.iter().map(PaymentRow::to_request).collect()
    }

    /// Returns every multisig history, in insertion order.
    pub fn multisig_histories(&self) -> Vec<MultisigHistory> {
        self.state().histories.iter().map(HistoryRow::to_history).collect()
    }

    fn state(&self) -> MutexGuard<'_, RepoState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> Result<MutexGuard<'_, RepoState>> {
        let mut state = self.state();

        match state.write_failure.take() {
            Some(reason) => Err(MemoryRepositoryError::WriteFailed(reason)),
            None => Ok(state),
        }
    }
}

impl RepoState {
    fn insert_address(&mut self, record: AddressRecord<()>) -> bool {
        if self.addresses.iter().any(|row| row.full_public_key == record.full_public_key()) {
            return false;
        }

        let AddressRecordDissolved {
            coin,
            account,
            p2pkh_address,
            p2sh_segwit_address,
            bech32_address,
            full_public_key,
            multisig_address,
            redeem_script,
            key_index,
            is_allocated,
            is_exported,
            aux: (),
        } = record.dissolve();

        self.addresses.push(AddressRow {
            coin,
            account,
            p2pkh_address,
            p2sh_segwit_address,
            bech32_address,
            full_public_key,
            multisig_address,
            redeem_script,
            key_index,
            is_allocated,
            is_exported,
        });

        true
    }

    fn tx_mut(&mut self, id: TxId) -> Result<&mut TxRow> {
        self.txs
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(MemoryRepositoryError::NotFound("tx id not found".into()))
    }

    fn tx_by_hash_mut(&mut self, action: ActionType, sent_hash: &str) -> Result<&mut TxRow> {
        self.txs
            .iter_mut()
            .find(|row| row.action == action && row.sent_hash.as_deref() == Some(sent_hash))
            .ok_or(MemoryRepositoryError::NotFound("tx hash not found".into()))
    }
}

impl AddressRow {
    fn owns(&self, address: &str) -> bool {
        self.p2sh_segwit_address == address
            || self.multisig_address.as_deref() == Some(address)
            || self.bech32_address == address
            || self.p2pkh_address == address
    }

    fn to_record(&self) -> AddressRecord {
        AddressRecord::builder()
            .coin(self.coin.clone())
            .account(self.account)
            .p2pkh_address(self.p2pkh_address.clone())
            .p2sh_segwit_address(self.p2sh_segwit_address.clone())
            .bech32_address(self.bech32_address.clone())
            .full_public_key(self.full_public_key.clone())
            .maybe_multisig_address(self.multisig_address.clone())
            .maybe_redeem_script(self.redeem_script.clone())
            .key_index(self.key_index)
            .is_allocated(self.is_allocated)
            .is_exported(self.is_exported)
            .aux(timestamps())
            .build()
    }
}

impl TxRow {
    fn to_record(&self) -> TxRecord {
        TxRecord::builder()
            .id(self.id)
            .action(self.action)
            .status(self.status)
            .unsigned_hex(self.unsigned_hex.clone())
            .maybe_signed_hex(self.signed_hex.clone())
            .maybe_sent_hash(self.sent_hash.clone())
            .total_input(self.total_input)
            .total_output(self.total_output)
            .fee(self.fee)
            .aux(timestamps())
            .build()
    }

    fn holds(&self, action: ActionType, unsigned_hex: &str) -> bool {
        self.action == action
            && self.unsigned_hex == unsigned_hex
            && self.status != TxStatus::Cancel
    }

    fn transition(&mut self, to: TxStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(MemoryRepositoryError::Validation(
                format!("tx status cannot move from {} to {to}", self.status).into(),
            ));
        }

        self.status = to;

        Ok(())
    }
}

impl PaymentRow {
    fn to_request(&self) -> PaymentRequest {
        PaymentRequest::builder()
            .id(self.id)
            .sender_address(self.sender_address.clone())
            .sender_account(self.sender_account)
            .receiver_address(self.receiver_address.clone())
            .amount(self.amount)
            .maybe_payment_id(self.payment_id)
            .is_done(self.is_done)
            .aux(timestamps())
            .build()
    }
}

impl HistoryRow {
    fn to_history(&self) -> MultisigHistory {
        MultisigHistory::builder()
            .id(self.id)
            .account(self.account)
            .full_public_key(self.full_public_key.clone())
            .maybe_auth_address1(self.auth_address1.clone())
            .maybe_multisig_address(self.multisig_address.clone())
            .maybe_redeem_script(self.redeem_script.clone())
            .is_exported(self.is_exported)
            .aux(timestamps())
            .build()
    }

    fn is_complete(&self) -> bool {
        self.multisig_address.as_deref().is_some_and(|address| !address.is_empty())
    }
}

fn timestamps() -> Timestamps {
    let now = Utc::now();
    Timestamps::builder().created_at(now).updated_at(now).build()
}

impl Repository for MemoryRepository {
    type Error = MemoryRepositoryError;
}

#[async_trait]
impl AddressRepository for MemoryRepository {
    async fn fetch_unallocated_address(
        &self,
        account: AccountKind,
    ) -> Result<Option<AddressRecord>> {
        Ok(self
            .state()
            .addresses
            .iter()
            .find(|row| row.account == account && !row.is_allocated)
            .map(AddressRow::to_record))
    }

    async fn mark_address_allocated(&self, address: &str) -> Result<bool> {
        let mut state = self.write_state()?;
        let mut found = false;

        for row in state.addresses.iter_mut().filter(|row| row.owns(address)) {
            row.is_allocated = true;
            found = true;
        }

        Ok(found)
    }

    async fn save_addresses(&self, records: &[AddressRecord<()>]) -> Result<usize> {
        let mut state = self.write_state()?;

        Ok(records
            .iter()
            .cloned()
            .map(|record| state.insert_address(record))
            .filter(|inserted| *inserted)
            .count())
    }

    async fn fetch_addresses(&self, account: AccountKind) -> Result<Vec<AddressRecord>> {
        Ok(self
            .state()
            .addresses
            .iter()
            .filter(|row| row.account == account)
            .map(AddressRow::to_record)
            .collect())
    }

    async fn fetch_unexported_pubkeys(&self, account: AccountKind) -> Result<Vec<AddressRecord>> {
        Ok(self
            .state()
            .addresses
            .iter()
            .filter(|row| row.account == account && !row.is_exported)
            .map(AddressRow::to_record)
            .collect())
    }

    async fn mark_pubkeys_exported(&self, full_public_keys: &[String]) -> Result<usize> {
        let mut state = self.write_state()?;
        let mut count = 0;

        for row in
            state.addresses.iter_mut().filter(|row| full_public_keys.contains(&row.full_public_key))
        {
            row.is_exported = true;
            count += 1;
        }

        Ok(count)
    }

    async fn update_multisig_address(
        &self,
        full_public_key: &str,
        multisig: &MultisigAddress,
    ) -> Result<()> {
        let mut state = self.write_state()?;

        let row = state
            .addresses
            .iter_mut()
            .find(|row| row.full_public_key == full_public_key)
            .ok_or(MemoryRepositoryError::NotFound("no address owns the full public key".into()))?;

        match row.multisig_address.as_deref() {
            None | Some("") => {},
            Some(current) if current == multisig.address() => {},
            Some(_) => {
                return Err(MemoryRepositoryError::Validation(
                    "multisig address is already set to a different value".into(),
                ));
            },
        }

        row.multisig_address = Some(multisig.address().to_owned());
        row.redeem_script = Some(multisig.redeem_script().to_owned());

        Ok(())
    }
}

#[async_trait]
impl TxRepository for MemoryRepository {
    async fn count_by_unsigned_hex(&self, action: ActionType, unsigned_hex: &str) -> Result<u64> {
        Ok(self
            .state()
            .txs
            .iter()
            .filter(|row| row.holds(action, unsigned_hex))
            .count() as u64)
    }

    async fn create_unsigned_tx(
        &self,
        tx: &UnsignedTx,
        inputs: &[TxInput],
        outputs: &[TxOutput],
        payment_ids: &[i64],
    ) -> Result<TxId> {
        let mut state = self.write_state()?;

        if state.txs.iter().any(|row| row.holds(tx.action(), tx.unsigned_hex())) {
            return Err(MemoryRepositoryError::Validation("duplicate unsigned hex".into()));
        }

        let pending = state
            .payments
            .iter()
            .filter(|row| payment_ids.contains(&row.id) && row.payment_id.is_none())
            .count();

        if pending != payment_ids.len() {
            return Err(MemoryRepositoryError::Validation(
                format!(
                    "linked {pending} of {} payment requests, some are already bundled",
                    payment_ids.len()
                )
                .into(),
            ));
        }

        let id = TxId::from(state.txs.len() as i64 + 1);

        for row in state.payments.iter_mut().filter(|row| payment_ids.contains(&row.id)) {
            row.payment_id = Some(id);
        }

        state.txs.push(TxRow {
            id,
            action: tx.action(),
            status: TxStatus::Unsigned,
            unsigned_hex: tx.unsigned_hex().to_owned(),
            signed_hex: None,
            sent_hash: None,
            total_input: tx.total_input(),
            total_output: tx.total_output(),
            fee: tx.fee(),
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        });

        Ok(id)
    }

    async fn fetch_tx(&self, action: ActionType, id: TxId) -> Result<Option<TxRecord>> {
        Ok(self
            .state()
            .txs
            .iter()
            .find(|row| row.action == action && row.id == id)
            .map(TxRow::to_record))
    }

    async fn update_signed(&self, id: TxId, signed_hex: &str) -> Result<()> {
        let mut state = self.write_state()?;
        let row = state.tx_mut(id)?;

        if row.status != TxStatus::Signed {
            row.transition(TxStatus::Signed)?;
        }
        row.signed_hex = Some(signed_hex.to_owned());

        Ok(())
    }

    async fn update_sent(&self, id: TxId, signed_hex: &str, sent_hash: &str) -> Result<()> {
        let mut state = self.write_state()?;
        let row = state.tx_mut(id)?;

        row.transition(TxStatus::Sent)?;
        row.signed_hex = Some(signed_hex.to_owned());
        row.sent_hash = Some(sent_hash.to_owned());

        Ok(())
    }

    async fn fetch_hashes_by_status(
        &self,
        action: ActionType,
        status: TxStatus,
    ) -> Result<Vec<String>> {
        Ok(self
            .state()
            .txs
            .iter()
            .filter(|row| row.action == action && row.status == status)
            .filter_map(|row| row.sent_hash.clone())
            .collect())
    }

    async fn fetch_tx_id_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
    ) -> Result<Option<TxId>> {
        Ok(self
            .state()
            .txs
            .iter()
            .find(|row| row.action == action && row.sent_hash.as_deref() == Some(sent_hash))
            .map(|row| row.id))
    }

    async fn update_status_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
        status: TxStatus,
    ) -> Result<()> {
        self.write_state()?.tx_by_hash_mut(action, sent_hash)?.transition(status)
    }

    async fn cancel_tx(&self, id: TxId) -> Result<usize> {
        let mut state = self.write_state()?;
        state.tx_mut(id)?.transition(TxStatus::Cancel)?;

        let mut released = 0;
        for row in
            state.payments.iter_mut().filter(|row| row.payment_id == Some(id) && !row.is_done)
        {
            row.payment_id = None;
            released += 1;
        }

        Ok(released)
    }

    async fn fetch_outputs(&self, id: TxId) -> Result<Vec<TxOutput>> {
        Ok(self.state().tx_mut(id)?.outputs.clone())
    }

    async fn fetch_inputs(&self, id: TxId) -> Result<Vec<TxInput>> {
        Ok(self.state().tx_mut(id)?.inputs.clone())
    }

    async fn complete_payment(&self, id: TxId) -> Result<usize> {
        let mut state = self.write_state()?;
        state.tx_mut(id)?.transition(TxStatus::Notified)?;

        let mut completed = 0;
        for row in state.payments.iter_mut().filter(|row| row.payment_id == Some(id)) {
            row.is_done = true;
            completed += 1;
        }

        Ok(completed)
    }
}

#[async_trait]
impl PaymentRepository for MemoryRepository {
    async fn fetch_pending_payment_requests(&self) -> Result<Vec<PaymentRequest>> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|row| row.payment_id.is_none() && !row.is_done)
            .map(PaymentRow::to_request)
            .collect())
    }

    async fn fetch_payment_requests_by_payment_id(&self, id: TxId) -> Result<Vec<PaymentRequest>> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|row| row.payment_id == Some(id))
            .map(PaymentRow::to_request)
            .collect())
    }
}

#[async_trait]
impl MultisigRepository for MemoryRepository {
    async fn save_multisig_histories(
        &self,
        account: AccountKind,
        full_public_keys: &[String],
    ) -> Result<usize> {
        let mut state = self.write_state()?;
        let mut saved = 0;

        for key in full_public_keys {
            let known = state
                .histories
                .iter()
                .any(|row| row.account == account && &row.full_public_key == key);

            if known {
                continue;
            }

            let id = state.histories.len() as i64 + 1;
            state.histories.push(HistoryRow {
                id,
                account,
                full_public_key: key.clone(),
                auth_address1: None,
                multisig_address: None,
                redeem_script: None,
                is_exported: false,
            });
            saved += 1;
        }

        Ok(saved)
    }

    async fn fetch_pending_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>> {
        Ok(self
            .state()
            .histories
            .iter()
            .filter(|row| row.account == account && !row.is_complete())
            .map(HistoryRow::to_history)
            .collect())
    }

    async fn update_multisig_history(
        &self,
        id: i64,
        auth_address: &str,
        multisig: &MultisigAddress,
    ) -> Result<bool> {
        let mut state = self.write_state()?;

        let Some(row) = state.histories.iter_mut().find(|row| row.id == id && !row.is_complete())
        else {
            return Ok(false);
        };

        row.auth_address1 = Some(auth_address.to_owned());
        row.multisig_address = Some(multisig.address().to_owned());
        row.redeem_script = Some(multisig.redeem_script().to_owned());

        Ok(true)
    }

    async fn fetch_unexported_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>> {
        Ok(self
            .state()
            .histories
            .iter()
            .filter(|row| row.account == account && row.is_complete() && !row.is_exported)
            .map(HistoryRow::to_history)
            .collect())
    }

    async fn mark_multisig_histories_exported(&self, ids: &[i64]) -> Result<usize> {
        let mut state = self.write_state()?;
        let mut count = 0;

        for row in state.histories.iter_mut().filter(|row| ids.contains(&row.id)) {
            row.is_exported = true;
            count += 1;
        }

        Ok(count)
    }
}
