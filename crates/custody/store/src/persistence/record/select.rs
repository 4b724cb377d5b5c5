use chrono::{DateTime, Utc};
use diesel::{
    pg::Pg,
    prelude::{Queryable, Selectable},
};
use dissolve_derive::Dissolve;

use crate::persistence::{
    record::{ActionType, TxStatus},
    schema,
};

#[derive(Debug, Dissolve, Queryable, Selectable)]
#[diesel(table_name = schema::address, check_for_backend(Pg))]
pub struct StoredAddressRecord {
    coin: String,
    account: String,
    p2pkh_address: String,
    p2sh_segwit_address: String,
    bech32_address: String,
    full_public_key: String,
    multisig_address: Option<String>,
    redeem_script: Option<String>,
    key_index: i64,
    is_allocated: bool,
    is_exported: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Dissolve, Queryable, Selectable)]
#[diesel(table_name = schema::tx, check_for_backend(Pg))]
pub struct StoredTxRecord {
    id: i64,
    action: ActionType,
    status: TxStatus,
    unsigned_hex: String,
    signed_hex: Option<String>,
    sent_hash: Option<String>,
    total_input: i64,
    total_output: i64,
    fee: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Dissolve, Queryable, Selectable)]
#[diesel(table_name = schema::tx_input, check_for_backend(Pg))]
pub struct StoredTxInputRecord {
    input_txid: String,
    input_vout: i64,
    input_address: String,
    input_account: String,
    input_amount: i64,
    input_confirmations: i64,
}

#[derive(Debug, Dissolve, Queryable, Selectable)]
#[diesel(table_name = schema::tx_output, check_for_backend(Pg))]
pub struct StoredTxOutputRecord {
    output_address: String,
    output_account: String,
    output_amount: i64,
    is_change: bool,
}

#[derive(Debug, Dissolve, Queryable, Selectable)]
#[diesel(table_name = schema::multisig_history, check_for_backend(Pg))]
pub struct StoredMultisigHistoryRecord {
    id: i64,
    account: String,
    full_public_key: String,
    auth_address1: Option<String>,
    auth_address2: Option<String>,
    multisig_address: Option<String>,
    redeem_script: Option<String>,
    is_exported: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Dissolve, Queryable, Selectable)]
#[diesel(table_name = schema::payment_request, check_for_backend(Pg))]
pub struct StoredPaymentRequestRecord {
    id: i64,
    sender_address: String,
    sender_account: String,
    receiver_address: String,
    amount: i64,
    payment_id: Option<i64>,
    is_done: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
