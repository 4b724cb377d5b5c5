use bon::Builder;
use diesel::prelude::Insertable;

use crate::persistence::{
    record::{ActionType, TxStatus},
    schema,
};

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::address)]
pub struct NewAddressRecord<'a> {
    coin: &'a str,
    account: &'a str,
    p2pkh_address: &'a str,
    p2sh_segwit_address: &'a str,
    bech32_address: &'a str,
    full_public_key: &'a str,
    multisig_address: Option<&'a str>,
    redeem_script: Option<&'a str>,
    key_index: i64,
    is_allocated: bool,
    is_exported: bool,
}

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::tx)]
pub struct NewTxRecord<'a> {
    action: ActionType,
    status: TxStatus,
    unsigned_hex: &'a str,
    total_input: i64,
    total_output: i64,
    fee: i64,
}

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::tx_input)]
pub struct NewTxInputRecord<'a> {
    tx_id: i64,
    input_txid: &'a str,
    input_vout: i64,
    input_address: &'a str,
    input_account: &'a str,
    input_amount: i64,
    input_confirmations: i64,
}

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::tx_output)]
pub struct NewTxOutputRecord<'a> {
    tx_id: i64,
    output_address: &'a str,
    output_account: &'a str,
    output_amount: i64,
    is_change: bool,
}

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::multisig_history)]
pub struct NewMultisigHistoryRecord<'a> {
    account: &'a str,
    full_public_key: &'a str,
}
