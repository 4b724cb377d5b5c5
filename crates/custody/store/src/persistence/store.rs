mod error;

pub use self::error::StoreError;

use chrono::Utc;
use custody_domain::tx::TxStatus as DomainTxStatus;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, NullableExpressionMethods, QueryDsl,
    SelectableHelper,
    result::OptionalExtension,
};
use diesel_async::RunQueryDsl;

use super::{
    pool::DbConn,
    record::{
        ActionType, TxStatus,
        insert::{
            NewAddressRecord, NewMultisigHistoryRecord, NewTxInputRecord, NewTxOutputRecord,
            NewTxRecord,
        },
        select::{
            StoredAddressRecord, StoredMultisigHistoryRecord, StoredPaymentRequestRecord,
            StoredTxInputRecord, StoredTxOutputRecord, StoredTxRecord,
        },
    },
    schema,
};

use self::error::Result;

pub async fn fetch_unallocated_address_by_account(
    conn: &mut DbConn,
    account: &str,
) -> Result<Option<StoredAddressRecord>> {
    schema::address::table
        .filter(schema::address::account.eq(account))
        .filter(schema::address::is_allocated.eq(false))
        .order_by(schema::address::id.asc())
        .select(StoredAddressRecord::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(From::from)
}

pub async fn fetch_addresses_by_account(
    conn: &mut DbConn,
    account: &str,
) -> Result<Vec<StoredAddressRecord>> {
    schema::address::table
        .filter(schema::address::account.eq(account))
        .order_by(schema::address::id.asc())
        .select(StoredAddressRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_unexported_addresses_by_account(
    conn: &mut DbConn,
    account: &str,
) -> Result<Vec<StoredAddressRecord>> {
    schema::address::table
        .filter(schema::address::account.eq(account))
        .filter(schema::address::is_exported.eq(false))
        .order_by(schema::address::id.asc())
        .select(StoredAddressRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_address_by_full_public_key(
    conn: &mut DbConn,
    full_public_key: &str,
) -> Result<Option<StoredAddressRecord>> {
    schema::address::table
        .filter(schema::address::full_public_key.eq(full_public_key))
        .select(StoredAddressRecord::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(From::from)
}

pub async fn save_new_addresses(
    conn: &mut DbConn,
    new_addresses: &[NewAddressRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::address::table)
        .values(new_addresses)
        .on_conflict(schema::address::full_public_key)
        .do_nothing()
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn update_allocated_by_address(conn: &mut DbConn, address: &str) -> Result<bool> {
    let affected = diesel::update(
        schema::address::table.filter(
            schema::address::p2sh_segwit_address
                .eq(address)
                .or(schema::address::multisig_address.eq(address))
                .or(schema::address::bech32_address.eq(address))
                .or(schema::address::p2pkh_address.eq(address)),
        ),
    )
    .set((schema::address::is_allocated.eq(true), schema::address::updated_at.eq(Utc::now())))
    .execute(conn)
    .await?;

    Ok(affected >= 1)
}

pub async fn update_exported_by_full_public_keys(
    conn: &mut DbConn,
    full_public_keys: &[String],
) -> Result<usize> {
    diesel::update(
        schema::address::table.filter(schema::address::full_public_key.eq_any(full_public_keys)),
    )
    .set((schema::address::is_exported.eq(true), schema::address::updated_at.eq(Utc::now())))
    .execute(conn)
    .await
    .map_err(From::from)
}

pub async fn update_multisig_address_by_full_public_key(
    conn: &mut DbConn,
    full_public_key: &str,
    multisig_address: &str,
    redeem_script: &str,
) -> Result<bool> {
    let affected = diesel::update(
        schema::address::table
            .filter(schema::address::full_public_key.eq(full_public_key))
            .filter(
                schema::address::multisig_address
                    .is_null()
                    .or(schema::address::multisig_address.eq(""))
                    .or(schema::address::multisig_address.eq(multisig_address)),
            ),
    )
    .set((
        schema::address::multisig_address.eq(multisig_address),
        schema::address::redeem_script.eq(redeem_script),
        schema::address::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;

    assert!(affected <= 1, "duplicate full public key must not exist");

    Ok(affected == 1)
}

pub async fn count_txs_by_action_and_unsigned_hex(
    conn: &mut DbConn,
    action: ActionType,
    unsigned_hex: &str,
) -> Result<i64> {
    schema::tx::table
        .filter(schema::tx::action.eq(action))
        .filter(schema::tx::unsigned_hex.eq(unsigned_hex))
        .filter(schema::tx::status.ne(TxStatus::from(DomainTxStatus::Cancel)))
        .count()
        .get_result(conn)
        .await
        .map_err(From::from)
}

pub async fn save_new_tx(conn: &mut DbConn, new_tx: NewTxRecord<'_>) -> Result<i64> {
    diesel::insert_into(schema::tx::table)
        .values(new_tx)
        .returning(schema::tx::id)
        .get_result(conn)
        .await
        .map_err(From::from)
}

pub async fn save_new_tx_inputs(
    conn: &mut DbConn,
    new_inputs: &[NewTxInputRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::tx_input::table)
        .values(new_inputs)
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn save_new_tx_outputs(
    conn: &mut DbConn,
    new_outputs: &[NewTxOutputRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::tx_output::table)
        .values(new_outputs)
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_tx_by_action_and_id(
    conn: &mut DbConn,
    action: ActionType,
    id: i64,
) -> Result<Option<StoredTxRecord>> {
    schema::tx::table
        .filter(schema::tx::id.eq(id))
        .filter(schema::tx::action.eq(action))
        .select(StoredTxRecord::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(From::from)
}

pub async fn fetch_tx_status_by_id_for_update(
    conn: &mut DbConn,
    id: i64,
) -> Result<Option<TxStatus>> {
    schema::tx::table
        .filter(schema::tx::id.eq(id))
        .select(schema::tx::status)
        .for_update()
        .first(conn)
        .await
        .optional()
        .map_err(From::from)
}

pub async fn fetch_tx_id_and_status_by_action_and_hash_for_update(
    conn: &mut DbConn,
    action: ActionType,
    sent_hash: &str,
) -> Result<Option<(i64, TxStatus)>> {
    schema::tx::table
        .filter(schema::tx::action.eq(action))
        .filter(schema::tx::sent_hash.eq(sent_hash))
        .select((schema::tx::id, schema::tx::status))
        .for_update()
        .first(conn)
        .await
        .optional()
        .map_err(From::from)
}

pub async fn fetch_tx_id_by_action_and_hash(
    conn: &mut DbConn,
    action: ActionType,
    sent_hash: &str,
) -> Result<Option<i64>> {
    schema::tx::table
        .filter(schema::tx::action.eq(action))
        .filter(schema::tx::sent_hash.eq(sent_hash))
        .select(schema::tx::id)
        .first(conn)
        .await
        .optional()
        .map_err(From::from)
}

pub async fn fetch_sent_hashes_by_action_and_status(
    conn: &mut DbConn,
    action: ActionType,
    status: TxStatus,
) -> Result<Vec<String>> {
    schema::tx::table
        .filter(schema::tx::action.eq(action))
        .filter(schema::tx::status.eq(status))
        .filter(schema::tx::sent_hash.is_not_null())
        .order_by(schema::tx::id.asc())
        .select(schema::tx::sent_hash.assume_not_null())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn update_status_by_id(
    conn: &mut DbConn,
    id: i64,
    new_status: TxStatus,
) -> Result<bool> {
    let affected = diesel::update(schema::tx::table.filter(schema::tx::id.eq(id)))
        .set((schema::tx::status.eq(new_status), schema::tx::updated_at.eq(Utc::now())))
        .execute(conn)
        .await?;

    assert!(affected <= 1, "duplicate tx id must not exist");

    Ok(affected == 1)
}

pub async fn update_signed_hex_by_id(
    conn: &mut DbConn,
    id: i64,
    signed_hex: &str,
    new_status: TxStatus,
) -> Result<bool> {
    let affected = diesel::update(schema::tx::table.filter(schema::tx::id.eq(id)))
        .set((
            schema::tx::signed_hex.eq(signed_hex),
            schema::tx::status.eq(new_status),
            schema::tx::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await?;

    assert!(affected <= 1, "duplicate tx id must not exist");

    Ok(affected == 1)
}

pub async fn update_sent_by_id(
    conn: &mut DbConn,
    id: i64,
    signed_hex: &str,
    sent_hash: &str,
    new_status: TxStatus,
) -> Result<bool> {
    let affected = diesel::update(schema::tx::table.filter(schema::tx::id.eq(id)))
        .set((
            schema::tx::signed_hex.eq(signed_hex),
            schema::tx::sent_hash.eq(sent_hash),
            schema::tx::status.eq(new_status),
            schema::tx::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await?;

    assert!(affected <= 1, "duplicate tx id must not exist");

    Ok(affected == 1)
}

pub async fn fetch_tx_inputs_by_tx_id(
    conn: &mut DbConn,
    tx_id: i64,
) -> Result<Vec<StoredTxInputRecord>> {
    schema::tx_input::table
        .filter(schema::tx_input::tx_id.eq(tx_id))
        .order_by(schema::tx_input::id.asc())
        .select(StoredTxInputRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_tx_outputs_by_tx_id(
    conn: &mut DbConn,
    tx_id: i64,
) -> Result<Vec<StoredTxOutputRecord>> {
    schema::tx_output::table
        .filter(schema::tx_output::tx_id.eq(tx_id))
        .order_by(schema::tx_output::id.asc())
        .select(StoredTxOutputRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_pending_payment_requests(
    conn: &mut DbConn,
) -> Result<Vec<StoredPaymentRequestRecord>> {
    schema::payment_request::table
        .filter(schema::payment_request::payment_id.is_null())
        .filter(schema::payment_request::is_done.eq(false))
        .order_by(schema::payment_request::id.asc())
        .select(StoredPaymentRequestRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_payment_requests_by_payment_id(
    conn: &mut DbConn,
    payment_id: i64,
) -> Result<Vec<StoredPaymentRequestRecord>> {
    schema::payment_request::table
        .filter(schema::payment_request::payment_id.eq(payment_id))
        .order_by(schema::payment_request::id.asc())
        .select(StoredPaymentRequestRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn update_payment_id_by_ids(
    conn: &mut DbConn,
    ids: &[i64],
    payment_id: i64,
) -> Result<usize> {
    diesel::update(
        schema::payment_request::table
            .filter(schema::payment_request::id.eq_any(ids))
            .filter(schema::payment_request::payment_id.is_null()),
    )
    .set((
        schema::payment_request::payment_id.eq(payment_id),
        schema::payment_request::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await
    .map_err(From::from)
}

pub async fn update_done_by_payment_id(conn: &mut DbConn, payment_id: i64) -> Result<usize> {
    diesel::update(
        schema::payment_request::table.filter(schema::payment_request::payment_id.eq(payment_id)),
    )
    .set((
        schema::payment_request::is_done.eq(true),
        schema::payment_request::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await
    .map_err(From::from)
}

pub async fn release_payment_requests_by_payment_id(
    conn: &mut DbConn,
    payment_id: i64,
) -> Result<usize> {
    diesel::update(
        schema::payment_request::table
            .filter(schema::payment_request::payment_id.eq(payment_id))
            .filter(schema::payment_request::is_done.eq(false)),
    )
    .set((
        schema::payment_request::payment_id.eq(None::<i64>),
        schema::payment_request::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await
    .map_err(From::from)
}

pub async fn save_new_multisig_histories(
    conn: &mut DbConn,
    new_histories: &[NewMultisigHistoryRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::multisig_history::table)
        .values(new_histories)
        .on_conflict((schema::multisig_history::account, schema::multisig_history::full_public_key))
        .do_nothing()
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_pending_multisig_histories_by_account(
    conn: &mut DbConn,
    account: &str,
) -> Result<Vec<StoredMultisigHistoryRecord>> {
    schema::multisig_history::table
        .filter(schema::multisig_history::account.eq(account))
        .filter(
            schema::multisig_history::multisig_address
                .is_null()
                .or(schema::multisig_history::multisig_address.eq("")),
        )
        .order_by(schema::multisig_history::id.asc())
        .select(StoredMultisigHistoryRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_unexported_multisig_histories_by_account(
    conn: &mut DbConn,
    account: &str,
) -> Result<Vec<StoredMultisigHistoryRecord>> {
    schema::multisig_history::table
        .filter(schema::multisig_history::account.eq(account))
        .filter(schema::multisig_history::multisig_address.is_not_null())
        .filter(schema::multisig_history::multisig_address.ne(""))
        .filter(schema::multisig_history::is_exported.eq(false))
        .order_by(schema::multisig_history::id.asc())
        .select(StoredMultisigHistoryRecord::as_select())
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn update_multisig_history_by_id(
    conn: &mut DbConn,
    id: i64,
    auth_address: &str,
    multisig_address: &str,
    redeem_script: &str,
) -> Result<bool> {
    let affected = diesel::update(
        schema::multisig_history::table.filter(schema::multisig_history::id.eq(id)).filter(
            schema::multisig_history::multisig_address
                .is_null()
                .or(schema::multisig_history::multisig_address.eq("")),
        ),
    )
    .set((
        schema::multisig_history::auth_address1.eq(auth_address),
        schema::multisig_history::multisig_address.eq(multisig_address),
        schema::multisig_history::redeem_script.eq(redeem_script),
        schema::multisig_history::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;

    assert!(affected <= 1, "duplicate multisig history id must not exist");

    Ok(affected == 1)
}

pub async fn update_exported_by_multisig_history_ids(
    conn: &mut DbConn,
    ids: &[i64],
) -> Result<usize> {
    diesel::update(
        schema::multisig_history::table
            .filter(schema::multisig_history::id.eq_any(ids))
            .filter(schema::multisig_history::is_exported.eq(false)),
    )
    .set((
        schema::multisig_history::is_exported.eq(true),
        schema::multisig_history::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await
    .map_err(From::from)
}
