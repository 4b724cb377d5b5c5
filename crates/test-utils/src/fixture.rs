use custody_domain::{
    account::AccountKind,
    address::{AddressRecord, Unspent},
    amount::Amount,
    payment::PaymentRequest,
};

/// Confirmation count given to fixture outputs.
const FIXTURE_CONFIRMATIONS: u64 = 10;

/// Returns a deterministic compressed public key for `account` and `key_index`.
pub fn public_key(account: AccountKind, key_index: u32) -> String {
    format!("02{:064x}", u64::from(account.code()) * 1_000_000 + u64::from(key_index))
}

/// Returns an address record of `account` without multisig address.
///
/// The receiving address is `{account}-{key_index}`.
pub fn address_record(account: AccountKind, key_index: u32) -> AddressRecord<()> {
    AddressRecord::builder()
        .coin("btc".into())
        .account(account)
        .p2pkh_address(format!("1{account}-{key_index}"))
        .p2sh_segwit_address(format!("{account}-{key_index}"))
        .bech32_address(format!("bc1{account}-{key_index}"))
        .full_public_key(public_key(account, key_index))
        .key_index(key_index)
        .aux(())
        .build()
}

/// Returns a confirmed output of `amount` held by `address`.
pub fn unspent(txid: &str, address: &str, account: AccountKind, amount: Amount) -> Unspent {
    Unspent::builder()
        .txid(txid.to_owned())
        .vout(0)
        .address(address.to_owned())
        .account(account)
        .script_pub_key(format!("a914{:0>40}87", txid))
        .amount(amount)
        .confirmations(FIXTURE_CONFIRMATIONS)
        .build()
}

/// Returns a pending payment request of a client.
pub fn payment_request(id: i64, receiver_address: &str, amount: Amount) -> PaymentRequest<()> {
    PaymentRequest::builder()
        .id(id)
        .sender_address(format!("client-sender-{id}"))
        .sender_account(AccountKind::Client)
        .receiver_address(receiver_address.to_owned())
        .amount(amount)
        .aux(())
        .build()
}
