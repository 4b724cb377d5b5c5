//! Persistence layer for the custody wallet.
//!
//! This crate stores addresses, transaction records with their inputs and outputs,
//! multisig exchange histories and payment requests in PostgreSQL. It is the data access
//! layer of the online watch role and of the offline roles' local databases.
//!
//! # Architecture
//!
//! The store is built on top of [diesel](https://diesel.rs) with async PostgreSQL support:
//! - Connection pooling via deadpool, with TLS through rustls and the native root store
//! - Database transactions for every write that spans more than one row
//! - Custom `ToSql`/`FromSql` mappings for the `tx_status` and `action_type` enums
//!
//! Status updates are compare-and-set: the current status is read under a row lock and
//! the write is refused unless the lifecycle permits the move.
//!
//! # Usage
//!
//! ```ignore
//! let pool = establish_pool(database_url, max_connections).await?;
//! let store = CustodyStore::new(pool);
//!
//! let address = store.fetch_unallocated_address(AccountKind::Deposit).await?;
//! ```

mod error;
mod persistence;

pub use self::{
    error::CustodyStoreError,
    persistence::pool::{DbConn, DbPool, PoolError, establish_pool},
};

use core::str::FromStr;

use custody_domain::{
    Timestamps,
    account::AccountKind,
    address::{AddressRecord, AddressRecordDissolved},
    amount::Amount,
    multisig::{MultisigAddress, MultisigHistory},
    payment::PaymentRequest,
    tx::{
        ActionType, TxId, TxInput, TxOutput, TxRecord, TxStatus, UnsignedTx, UnsignedTxDissolved,
    },
};
use diesel_async::AsyncConnection;

use self::{
    error::Result,
    persistence::{
        record::{
            insert::{
                NewAddressRecord, NewMultisigHistoryRecord, NewTxInputRecord, NewTxOutputRecord,
                NewTxRecord,
            },
            select::{
                StoredAddressRecord, StoredAddressRecordDissolved, StoredMultisigHistoryRecord,
                StoredMultisigHistoryRecordDissolved, StoredPaymentRequestRecord,
                StoredPaymentRequestRecordDissolved, StoredTxInputRecord,
                StoredTxInputRecordDissolved, StoredTxOutputRecord, StoredTxOutputRecordDissolved,
                StoredTxRecord, StoredTxRecordDissolved,
            },
        },
        store,
    },
};

/// The main store interface for custody persistence operations.
pub struct CustodyStore {
    pool: DbPool,
}

impl CustodyStore {
    /// Creates a new `CustodyStore` over the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        CustodyStore { pool }
    }
}

// addresses
impl CustodyStore {
    /// Returns the oldest address of `account` that has not received funds yet.
    #[tracing::instrument(skip(self), fields(%account))]
    pub async fn fetch_unallocated_address(
        &self,
        account: AccountKind,
    ) -> Result<Option<AddressRecord>> {
        store::fetch_unallocated_address_by_account(&mut self.get_conn().await?, account.label())
            .await?
            .map(make_address_record)
            .transpose()
    }

    /// Flags the address record owning `address` as allocated.
    ///
    /// Returns `false` when no record owns the address.
    #[tracing::instrument(skip(self))]
    pub async fn mark_address_allocated(&self, address: &str) -> Result<bool> {
        store::update_allocated_by_address(&mut self.get_conn().await?, address)
            .await
            .map_err(From::from)
    }

    /// Persists generated address records, skipping keys that are already stored.
    ///
    /// Returns the number of newly inserted records.
    #[tracing::instrument(skip_all, fields(count = records.len()))]
    pub async fn save_addresses<AUX>(&self, records: &[AddressRecord<AUX>]) -> Result<usize>
    where
        AUX: Clone,
    {
        let dissolved: Vec<_> = records.iter().cloned().map(AddressRecord::dissolve).collect();

        let mut new_addresses = Vec::with_capacity(dissolved.len());
        for AddressRecordDissolved {
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
            ..
        } in &dissolved
        {
            let new_address = NewAddressRecord::builder()
                .coin(coin)
                .account(account.label())
                .p2pkh_address(p2pkh_address)
                .p2sh_segwit_address(p2sh_segwit_address)
                .bech32_address(bech32_address)
                .full_public_key(full_public_key)
                .maybe_multisig_address(multisig_address.as_deref())
                .maybe_redeem_script(redeem_script.as_deref())
                .key_index(i64::from(*key_index))
                .is_allocated(*is_allocated)
                .is_exported(*is_exported)
                .build();

            new_addresses.push(new_address);
        }

        store::save_new_addresses(&mut self.get_conn().await?, &new_addresses)
            .await
            .map_err(From::from)
    }

    /// Returns every address record of `account`.
    #[tracing::instrument(skip(self), fields(%account))]
    pub async fn fetch_addresses(&self, account: AccountKind) -> Result<Vec<AddressRecord>> {
        store::fetch_addresses_by_account(&mut self.get_conn().await?, account.label())
            .await?
            .into_iter()
            .map(make_address_record)
            .collect()
    }

    /// Returns the address records of `account` whose public key has not been exported.
    #[tracing::instrument(skip(self), fields(%account))]
    pub async fn fetch_unexported_pubkeys(
        &self,
        account: AccountKind,
    ) -> Result<Vec<AddressRecord>> {
        store::fetch_unexported_addresses_by_account(&mut self.get_conn().await?, account.label())
            .await?
            .into_iter()
            .map(make_address_record)
            .collect()
    }

    /// Flags the address records owning `full_public_keys` as exported.
    #[tracing::instrument(skip_all, fields(count = full_public_keys.len()))]
    pub async fn mark_pubkeys_exported(&self, full_public_keys: &[String]) -> Result<usize> {
        store::update_exported_by_full_public_keys(&mut self.get_conn().await?, full_public_keys)
            .await
            .map_err(From::from)
    }

    /// Attaches a multisig address to the record owning `full_public_key`.
    ///
    /// A multisig address is immutable once set: replacing it with a different one is
    /// refused with a validation error. Re-applying the same address is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns an error if no record owns the key, or if it already carries a different
    /// multisig address.
    #[tracing::instrument(skip_all, fields(multisig_address = %multisig.address()))]
    pub async fn update_multisig_address(
        &self,
        full_public_key: &str,
        multisig: &MultisigAddress,
    ) -> Result<()> {
        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let updated = store::update_multisig_address_by_full_public_key(
                        conn,
                        full_public_key,
                        multisig.address(),
                        multisig.redeem_script(),
                    )
                    .await?;

                    if updated {
                        return Ok(());
                    }

                    match store::fetch_address_by_full_public_key(conn, full_public_key).await? {
                        Some(_) => Err(CustodyStoreError::Validation(
                            "multisig address is already set to a different value".into(),
                        )),
                        None => Err(CustodyStoreError::NotFound(
                            "no address owns the full public key".into(),
                        )),
                    }
                })
            })
            .await
    }
}

// transactions
impl CustodyStore {
    /// Returns how many records of `action` carry exactly this unsigned hex.
    #[tracing::instrument(skip_all, fields(%action))]
    pub async fn count_by_unsigned_hex(
        &self,
        action: ActionType,
        unsigned_hex: &str,
    ) -> Result<u64> {
        let count = store::count_txs_by_action_and_unsigned_hex(
            &mut self.get_conn().await?,
            action.into(),
            unsigned_hex,
        )
        .await?;

        u64::try_from(count).map_err(|_| CustodyStoreError::invalid_value("negative count"))
    }

    /// Inserts a new unsigned transaction record together with its input and output
    /// records, and links the given payment requests to it, as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails, including a uniqueness violation when the
    /// same unsigned hex was recorded concurrently; nothing is persisted in that case.
    #[tracing::instrument(
        skip_all,
        fields(
            action = %tx.action(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            payments = payment_ids.len(),
        ),
    )]
    pub async fn create_unsigned_tx(
        &self,
        tx: &UnsignedTx,
        inputs: &[TxInput],
        outputs: &[TxOutput],
        payment_ids: &[i64],
    ) -> Result<TxId> {
        let UnsignedTxDissolved { action, unsigned_hex, total_input, total_output, fee } =
            tx.clone().dissolve();

        let total_input = to_db_amount(total_input)?;
        let total_output = to_db_amount(total_output)?;
        let fee = to_db_amount(fee)?;

        let inputs: Vec<_> = inputs.iter().cloned().map(TxInput::dissolve).collect();
        let outputs: Vec<_> = outputs.iter().cloned().map(TxOutput::dissolve).collect();

        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let new_tx = NewTxRecord::builder()
                        .action(action.into())
                        .status(TxStatus::Unsigned.into())
                        .unsigned_hex(&unsigned_hex)
                        .total_input(total_input)
                        .total_output(total_output)
                        .fee(fee)
                        .build();

                    let tx_id = store::save_new_tx(conn, new_tx).await?;

                    let new_inputs = inputs
                        .iter()
                        .map(|input| {
                            Ok(NewTxInputRecord::builder()
                                .tx_id(tx_id)
                                .input_txid(&input.input_txid)
                                .input_vout(i64::from(input.input_vout))
                                .input_address(&input.input_address)
                                .input_account(input.input_account.label())
                                .input_amount(to_db_amount(input.input_amount)?)
                                .input_confirmations(
                                    i64::try_from(input.input_confirmations).map_err(|_| {
                                        CustodyStoreError::invalid_value("confirmations overflow")
                                    })?,
                                )
                                .build())
                        })
                        .collect::<Result<Vec<_>>>()?;

                    store::save_new_tx_inputs(conn, &new_inputs).await?;

                    let new_outputs = outputs
                        .iter()
                        .map(|output| {
                            Ok(NewTxOutputRecord::builder()
                                .tx_id(tx_id)
                                .output_address(&output.output_address)
                                .output_account(output.output_account.label())
                                .output_amount(to_db_amount(output.output_amount)?)
                                .is_change(output.is_change)
                                .build())
                        })
                        .collect::<Result<Vec<_>>>()?;

                    store::save_new_tx_outputs(conn, &new_outputs).await?;

                    if !payment_ids.is_empty() {
                        let linked =
                            store::update_payment_id_by_ids(conn, payment_ids, tx_id).await?;

                        if linked != payment_ids.len() {
                            return Err(CustodyStoreError::Validation(
                                format!(
                                    "linked {linked} of {} payment requests, \
                                     some are already bundled",
                                    payment_ids.len()
                                )
                                .into(),
                            ));
                        }
                    }

                    Ok(TxId::from(tx_id))
                })
            })
            .await
    }

    /// Returns the transaction record `id` of kind `action`.
    #[tracing::instrument(skip(self), fields(%action, %id))]
    pub async fn fetch_tx(&self, action: ActionType, id: TxId) -> Result<Option<TxRecord>> {
        store::fetch_tx_by_action_and_id(&mut self.get_conn().await?, action.into(), id.into())
            .await?
            .map(make_tx_record)
            .transpose()
    }

    /// Stores the signed hex of record `id` and advances it to `signed`.
    ///
    /// A record already in `signed` keeps its status and takes the new hex, so a signer
    /// can re-emit a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or already past `signed`.
    #[tracing::instrument(skip(self, signed_hex), fields(%id))]
    pub async fn update_signed(&self, id: TxId, signed_hex: &str) -> Result<()> {
        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let current = fetch_status_for_update(conn, id).await?;

                    if current != TxStatus::Signed {
                        check_transition(current, TxStatus::Signed)?;
                    }

                    store::update_signed_hex_by_id(
                        conn,
                        id.into(),
                        signed_hex,
                        TxStatus::Signed.into(),
                    )
                    .await?;

                    Ok(())
                })
            })
            .await
    }

    /// Records the broadcast hash of record `id` and advances it to `sent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or not in `signed`.
    #[tracing::instrument(skip(self, signed_hex), fields(%id, %sent_hash))]
    pub async fn update_sent(&self, id: TxId, signed_hex: &str, sent_hash: &str) -> Result<()> {
        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let current = fetch_status_for_update(conn, id).await?;
                    check_transition(current, TxStatus::Sent)?;

                    store::update_sent_by_id(
                        conn,
                        id.into(),
                        signed_hex,
                        sent_hash,
                        TxStatus::Sent.into(),
                    )
                    .await?;

                    Ok(())
                })
            })
            .await
    }

    /// Returns the broadcast hashes of all `action` records currently in `status`.
    #[tracing::instrument(skip(self), fields(%action, %status))]
    pub async fn fetch_hashes_by_status(
        &self,
        action: ActionType,
        status: TxStatus,
    ) -> Result<Vec<String>> {
        store::fetch_sent_hashes_by_action_and_status(
            &mut self.get_conn().await?,
            action.into(),
            status.into(),
        )
        .await
        .map_err(From::from)
    }

    /// Returns the id of the `action` record broadcast as `sent_hash`.
    #[tracing::instrument(skip(self), fields(%action))]
    pub async fn fetch_tx_id_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
    ) -> Result<Option<TxId>> {
        store::fetch_tx_id_by_action_and_hash(&mut self.get_conn().await?, action.into(), sent_hash)
            .await
            .map(|id| id.map(TxId::from))
            .map_err(From::from)
    }

    /// Moves the `action` record broadcast as `sent_hash` to `new_status`.
    ///
    /// # Errors
    ///
    /// Returns an error if no record carries the hash or the move is not permitted.
    #[tracing::instrument(skip(self), fields(%action, %new_status))]
    pub async fn update_status_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
        new_status: TxStatus,
    ) -> Result<()> {
        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let (id, current) = store::fetch_tx_id_and_status_by_action_and_hash_for_update(
                        conn,
                        action.into(),
                        sent_hash,
                    )
                    .await?
                    .ok_or(CustodyStoreError::NotFound("tx hash not found".into()))?;

                    check_transition(current.into_inner(), new_status)?;

                    store::update_status_by_id(conn, id, new_status.into()).await?;

                    Ok(())
                })
            })
            .await
    }

    /// Returns the input records of transaction `id`, in insertion order.
    #[tracing::instrument(skip(self), fields(%id))]
    pub async fn fetch_inputs(&self, id: TxId) -> Result<Vec<TxInput>> {
        store::fetch_tx_inputs_by_tx_id(&mut self.get_conn().await?, id.into())
            .await?
            .into_iter()
            .map(make_tx_input)
            .collect()
    }

    /// Returns the output records of transaction `id`, in insertion order.
    #[tracing::instrument(skip(self), fields(%id))]
    pub async fn fetch_outputs(&self, id: TxId) -> Result<Vec<TxOutput>> {
        store::fetch_tx_outputs_by_tx_id(&mut self.get_conn().await?, id.into())
            .await?
            .into_iter()
            .map(make_tx_output)
            .collect()
    }

    /// Moves payment transaction `id` to `notified` and marks every payment request it
    /// pays as done, atomically.
    ///
    /// Returns the number of payment requests completed.
    #[tracing::instrument(skip(self), fields(%id))]
    pub async fn complete_payment(&self, id: TxId) -> Result<usize> {
        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let current = fetch_status_for_update(conn, id).await?;
                    check_transition(current, TxStatus::Notified)?;

                    store::update_status_by_id(conn, id.into(), TxStatus::Notified.into()).await?;

                    store::update_done_by_payment_id(conn, id.into()).await.map_err(From::from)
                })
            })
            .await
    }

    /// Moves transaction `id` to `cancel` and releases the payment requests it bundled, so
    /// the next payment run picks them up again, atomically.
    ///
    /// Returns the number of payment requests released.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or can no longer be cancelled.
    #[tracing::instrument(skip(self), fields(%id))]
    pub async fn cancel_tx(&self, id: TxId) -> Result<usize> {
        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let current = fetch_status_for_update(conn, id).await?;
                    check_transition(current, TxStatus::Cancel)?;

                    store::update_status_by_id(conn, id.into(), TxStatus::Cancel.into()).await?;

                    store::release_payment_requests_by_payment_id(conn, id.into())
                        .await
                        .map_err(From::from)
                })
            })
            .await
    }
}

// payment requests
impl CustodyStore {
    /// Returns the payment requests not yet bundled into a transaction.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_pending_payment_requests(&self) -> Result<Vec<PaymentRequest>> {
        store::fetch_pending_payment_requests(&mut self.get_conn().await?)
            .await?
            .into_iter()
            .map(make_payment_request)
            .collect()
    }

    /// Returns the payment requests paid by transaction `id`.
    #[tracing::instrument(skip(self), fields(%id))]
    pub async fn fetch_payment_requests_by_payment_id(
        &self,
        id: TxId,
    ) -> Result<Vec<PaymentRequest>> {
        store::fetch_payment_requests_by_payment_id(&mut self.get_conn().await?, id.into())
            .await?
            .into_iter()
            .map(make_payment_request)
            .collect()
    }
}

// multisig histories
impl CustodyStore {
    /// Stores an exchange history record for every imported public key, skipping keys
    /// already imported for `account`.
    #[tracing::instrument(skip_all, fields(%account, count = full_public_keys.len()))]
    pub async fn save_multisig_histories(
        &self,
        account: AccountKind,
        full_public_keys: &[String],
    ) -> Result<usize> {
        let new_histories: Vec<_> = full_public_keys
            .iter()
            .map(|key| {
                NewMultisigHistoryRecord::builder()
                    .account(account.label())
                    .full_public_key(key)
                    .build()
            })
            .collect();

        store::save_new_multisig_histories(&mut self.get_conn().await?, &new_histories)
            .await
            .map_err(From::from)
    }

    /// Returns the histories of `account` still waiting for their multisig address.
    #[tracing::instrument(skip(self), fields(%account))]
    pub async fn fetch_pending_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>> {
        store::fetch_pending_multisig_histories_by_account(
            &mut self.get_conn().await?,
            account.label(),
        )
        .await?
        .into_iter()
        .map(make_multisig_history)
        .collect()
    }

    /// Completes history `id` with the authorizer's address and the created multisig
    /// address.
    ///
    /// Returns `false` when the history is missing or already completed.
    #[tracing::instrument(skip_all, fields(%id, multisig_address = %multisig.address()))]
    pub async fn update_multisig_history(
        &self,
        id: i64,
        auth_address: &str,
        multisig: &MultisigAddress,
    ) -> Result<bool> {
        store::update_multisig_history_by_id(
            &mut self.get_conn().await?,
            id,
            auth_address,
            multisig.address(),
            multisig.redeem_script(),
        )
        .await
        .map_err(From::from)
    }

    /// Returns the completed histories of `account` not yet exported.
    #[tracing::instrument(skip(self), fields(%account))]
    pub async fn fetch_unexported_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>> {
        store::fetch_unexported_multisig_histories_by_account(
            &mut self.get_conn().await?,
            account.label(),
        )
        .await?
        .into_iter()
        .map(make_multisig_history)
        .collect()
    }

    /// Flags the given histories as exported.
    #[tracing::instrument(skip_all, fields(count = ids.len()))]
    pub async fn mark_multisig_histories_exported(&self, ids: &[i64]) -> Result<usize> {
        store::update_exported_by_multisig_history_ids(&mut self.get_conn().await?, ids)
            .await
            .map_err(From::from)
    }
}

impl CustodyStore {
    async fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().await.map_err(|_| CustodyStoreError::Pool)
    }
}

async fn fetch_status_for_update(conn: &mut DbConn, id: TxId) -> Result<TxStatus> {
    store::fetch_tx_status_by_id_for_update(conn, id.into())
        .await?
        .map(|status| status.into_inner())
        .ok_or(CustodyStoreError::NotFound("tx id not found".into()))
}

fn check_transition(from: TxStatus, to: TxStatus) -> Result<()> {
    if !from.can_transition_to(to) {
        return Err(CustodyStoreError::Validation(
            format!("tx status cannot move from {from} to {to}").into(),
        ));
    }

    Ok(())
}

fn to_db_amount(amount: Amount) -> Result<i64> {
    i64::try_from(amount).map_err(|_| CustodyStoreError::invalid_value("amount overflow"))
}

fn from_db_amount(sat: i64) -> Result<Amount> {
    Amount::try_from(sat).map_err(|_| CustodyStoreError::invalid_value("negative amount"))
}

fn parse_account(label: &str) -> Result<AccountKind> {
    AccountKind::from_str(label)
        .map_err(|_| CustodyStoreError::invalid_value(format!("unknown account {label}")))
}

fn make_address_record(record: StoredAddressRecord) -> Result<AddressRecord> {
    let StoredAddressRecordDissolved {
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
        created_at,
        updated_at,
    } = record.dissolve();

    let key_index = u32::try_from(key_index)
        .map_err(|_| CustodyStoreError::invalid_value("key index out of range"))?;

    let address = AddressRecord::builder()
        .coin(coin)
        .account(parse_account(&account)?)
        .p2pkh_address(p2pkh_address)
        .p2sh_segwit_address(p2sh_segwit_address)
        .bech32_address(bech32_address)
        .full_public_key(full_public_key)
        .maybe_multisig_address(multisig_address)
        .maybe_redeem_script(redeem_script)
        .key_index(key_index)
        .is_allocated(is_allocated)
        .is_exported(is_exported)
        .aux(Timestamps::builder().created_at(created_at).updated_at(updated_at).build())
        .build();

    Ok(address)
}

fn make_tx_record(record: StoredTxRecord) -> Result<TxRecord> {
    let StoredTxRecordDissolved {
        id,
        action,
        status,
        unsigned_hex,
        signed_hex,
        sent_hash,
        total_input,
        total_output,
        fee,
        created_at,
        updated_at,
    } = record.dissolve();

    let tx = TxRecord::builder()
        .id(id.into())
        .action(action.into_inner())
        .status(status.into_inner())
        .unsigned_hex(unsigned_hex)
        .maybe_signed_hex(signed_hex)
        .maybe_sent_hash(sent_hash)
        .total_input(from_db_amount(total_input)?)
        .total_output(from_db_amount(total_output)?)
        .fee(from_db_amount(fee)?)
        .aux(Timestamps::builder().created_at(created_at).updated_at(updated_at).build())
        .build();

    Ok(tx)
}

fn make_tx_input(record: StoredTxInputRecord) -> Result<TxInput> {
    let StoredTxInputRecordDissolved {
        input_txid,
        input_vout,
        input_address,
        input_account,
        input_amount,
        input_confirmations,
    } = record.dissolve();

    let input = TxInput::builder()
        .input_txid(input_txid)
        .input_vout(
            u32::try_from(input_vout)
                .map_err(|_| CustodyStoreError::invalid_value("vout out of range"))?,
        )
        .input_address(input_address)
        .input_account(parse_account(&input_account)?)
        .input_amount(from_db_amount(input_amount)?)
        .input_confirmations(
            u64::try_from(input_confirmations)
                .map_err(|_| CustodyStoreError::invalid_value("negative confirmations"))?,
        )
        .build();

    Ok(input)
}

fn make_tx_output(record: StoredTxOutputRecord) -> Result<TxOutput> {
    let StoredTxOutputRecordDissolved { output_address, output_account, output_amount, is_change } =
        record.dissolve();

    let output = TxOutput::builder()
        .output_address(output_address)
        .output_account(parse_account(&output_account)?)
        .output_amount(from_db_amount(output_amount)?)
        .is_change(is_change)
        .build();

    Ok(output)
}

fn make_multisig_history(record: StoredMultisigHistoryRecord) -> Result<MultisigHistory> {
    let StoredMultisigHistoryRecordDissolved {
        id,
        account,
        full_public_key,
        auth_address1,
        auth_address2,
        multisig_address,
        redeem_script,
        is_exported,
        created_at,
        updated_at,
    } = record.dissolve();

    let history = MultisigHistory::builder()
        .id(id)
        .account(parse_account(&account)?)
        .full_public_key(full_public_key)
        .maybe_auth_address1(auth_address1)
        .maybe_auth_address2(auth_address2)
        .maybe_multisig_address(multisig_address)
        .maybe_redeem_script(redeem_script)
        .is_exported(is_exported)
        .aux(Timestamps::builder().created_at(created_at).updated_at(updated_at).build())
        .build();

    Ok(history)
}

fn make_payment_request(record: StoredPaymentRequestRecord) -> Result<PaymentRequest> {
    let StoredPaymentRequestRecordDissolved {
        id,
        sender_address,
        sender_account,
        receiver_address,
        amount,
        payment_id,
        is_done,
        created_at,
        updated_at,
    } = record.dissolve();

    let request = PaymentRequest::builder()
        .id(id)
        .sender_address(sender_address)
        .sender_account(parse_account(&sender_account)?)
        .receiver_address(receiver_address)
        .amount(from_db_amount(amount)?)
        .maybe_payment_id(payment_id.map(TxId::from))
        .is_done(is_done)
        .aux(Timestamps::builder().created_at(created_at).updated_at(updated_at).build())
        .build();

    Ok(request)
}
