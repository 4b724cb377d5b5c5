//! integration tests for custody-store
//!
//! These tests need a docker daemon; run them with `cargo test -- --ignored`.

use core::num::NonZeroUsize;

use std::sync::{LazyLock, Mutex};

use custody_domain::{
    account::AccountKind,
    address::AddressRecord,
    amount::Amount,
    multisig::MultisigAddress,
    tx::{ActionType, TxInput, TxOutput, TxStatus, UnsignedTx},
};
use custody_store::{CustodyStore, CustodyStoreError};
use diesel::{Connection, PgConnection, RunQueryDsl};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

const MIGRATIONS: EmbeddedMigrations = diesel_migrations::embed_migrations!("./migrations");

static POSTGRES_CONTAINER: OnceCell<ContainerAsync<Postgres>> = OnceCell::const_new();

static DB_COUNTER: LazyLock<Mutex<u32>> = LazyLock::new(|| Mutex::new(0));

async fn pg_container() -> &'static ContainerAsync<Postgres> {
    POSTGRES_CONTAINER
        .get_or_init(|| async {
            Postgres::default()
                .with_tag("18-alpine")
                .start()
                .await
                .expect("failed to start postgres container")
        })
        .await
}

async fn setup_db() -> String {
    let container = pg_container().await;

    let db_name = {
        let mut counter = DB_COUNTER.lock().unwrap();
        *counter += 1;
        format!("custody_test_db_{}", *counter)
    };

    let host = container.get_host().await.expect("failed to get host");

    let port = container.get_host_port_ipv4(5432).await.expect("failed to get port");

    let admin_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let mut admin_conn =
        PgConnection::establish(&admin_url).expect("failed to connect to postgres");

    diesel::sql_query(format!("CREATE DATABASE {db_name}"))
        .execute(&mut admin_conn)
        .expect("failed to create test database");

    let db_url = format!("postgres://postgres:postgres@{host}:{port}/{db_name}");

    PgConnection::establish(&db_url)
        .expect("failed to connect to test database")
        .run_pending_migrations(MIGRATIONS)
        .expect("failed to run migrations");

    db_url
}

async fn setup_store() -> CustodyStore {
    store_at(setup_db().await).await
}

async fn store_at(db_url: String) -> CustodyStore {
    custody_store::establish_pool(db_url, NonZeroUsize::MIN)
        .await
        .map(CustodyStore::new)
        .expect("failed to initialize custody store")
}

fn address(account: AccountKind, index: u32) -> AddressRecord<()> {
    AddressRecord::builder()
        .coin("btc".into())
        .account(account)
        .p2sh_segwit_address(format!("2N{account}{index}"))
        .full_public_key(format!("02{:064x}", u64::from(index) + 1000 * u64::from(account.code())))
        .key_index(index)
        .aux(())
        .build()
}

fn unsigned_tx(hex: &str) -> (UnsignedTx, Vec<TxInput>, Vec<TxOutput>) {
    unsigned_tx_of(ActionType::Deposit, hex)
}

fn unsigned_tx_of(action: ActionType, hex: &str) -> (UnsignedTx, Vec<TxInput>, Vec<TxOutput>) {
    let tx = UnsignedTx::builder()
        .action(action)
        .unsigned_hex(hex.into())
        .total_input(Amount::from_sat(10_000_000))
        .total_output(Amount::from_sat(9_990_000))
        .fee(Amount::from_sat(10_000))
        .build();

    let inputs = vec![
        TxInput::builder()
            .input_txid("aa".repeat(32))
            .input_vout(0)
            .input_address("2Nclient0".into())
            .input_account(AccountKind::Client)
            .input_amount(Amount::from_sat(10_000_000))
            .input_confirmations(6)
            .build(),
    ];

    let outputs = vec![
        TxOutput::builder()
            .output_address("2Ndeposit0".into())
            .output_account(AccountKind::Deposit)
            .output_amount(Amount::from_sat(9_990_000))
            .is_change(false)
            .build(),
    ];

    (tx, inputs, outputs)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn unallocated_address_is_not_returned_after_allocation() {
    // Arrange
    let store = setup_store().await;
    let records = [address(AccountKind::Deposit, 0), address(AccountKind::Deposit, 1)];
    assert_eq!(store.save_addresses(&records).await.unwrap(), 2);

    // Act
    let first = store.fetch_unallocated_address(AccountKind::Deposit).await.unwrap().unwrap();
    assert!(store.mark_address_allocated(first.wallet_address()).await.unwrap());
    let second = store.fetch_unallocated_address(AccountKind::Deposit).await.unwrap().unwrap();

    // Assert
    assert_ne!(first.wallet_address(), second.wallet_address());
    assert_eq!(store.save_addresses(&records).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn unsigned_tx_is_recorded_once_with_inputs_and_outputs() {
    // Arrange
    let store = setup_store().await;
    let (tx, inputs, outputs) = unsigned_tx("0200aabb");

    // Act
    let id = store.create_unsigned_tx(&tx, &inputs, &outputs, &[]).await.unwrap();
    let duplicate = store.create_unsigned_tx(&tx, &inputs, &outputs, &[]).await;

    // Assert
    assert!(duplicate.is_err());
    assert_eq!(store.count_by_unsigned_hex(ActionType::Deposit, "0200aabb").await.unwrap(), 1);
    assert_eq!(store.fetch_inputs(id).await.unwrap(), inputs);
    assert_eq!(store.fetch_outputs(id).await.unwrap(), outputs);

    let record = store.fetch_tx(ActionType::Deposit, id).await.unwrap().unwrap();
    assert_eq!(record.status(), TxStatus::Unsigned);
    assert!(store.fetch_tx(ActionType::Payment, id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn status_moves_forward_only() {
    // Arrange
    let store = setup_store().await;
    let (tx, inputs, outputs) = unsigned_tx("0200ccdd");
    let id = store.create_unsigned_tx(&tx, &inputs, &outputs, &[]).await.unwrap();

    // Act
    let skip = store.update_sent(id, "0200ccdd-signed", "hash").await;
    store.update_signed(id, "0200ccdd-signed").await.unwrap();
    store.update_sent(id, "0200ccdd-signed", "hash").await.unwrap();
    let cancel = store.cancel_tx(id).await;
    store.update_status_by_hash(ActionType::Deposit, "hash", TxStatus::Done).await.unwrap();

    // Assert
    assert!(matches!(skip, Err(CustodyStoreError::Validation(_))));
    assert!(matches!(cancel, Err(CustodyStoreError::Validation(_))));
    assert_eq!(
        store.fetch_hashes_by_status(ActionType::Deposit, TxStatus::Done).await.unwrap(),
        vec!["hash".to_string()]
    );
    assert_eq!(store.fetch_tx_id_by_hash(ActionType::Deposit, "hash").await.unwrap(), Some(id));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn cancelled_tx_frees_its_hex_for_a_rebuild() {
    // Arrange
    let store = setup_store().await;
    let (tx, inputs, outputs) = unsigned_tx("0200eeff");
    let cancelled = store.create_unsigned_tx(&tx, &inputs, &outputs, &[]).await.unwrap();

    // Act
    assert_eq!(store.cancel_tx(cancelled).await.unwrap(), 0);
    let count = store.count_by_unsigned_hex(ActionType::Deposit, "0200eeff").await.unwrap();
    let rebuilt = store.create_unsigned_tx(&tx, &inputs, &outputs, &[]).await.unwrap();

    // Assert
    assert_eq!(count, 0);
    assert_ne!(rebuilt, cancelled);
    assert_eq!(store.count_by_unsigned_hex(ActionType::Deposit, "0200eeff").await.unwrap(), 1);
    assert!(store.cancel_tx(cancelled).await.is_err());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn cancelled_payment_releases_its_requests() {
    // Arrange
    let db_url = setup_db().await;
    let mut conn = PgConnection::establish(&db_url).expect("failed to connect to test database");
    diesel::sql_query(
        "INSERT INTO payment_request (sender_address, sender_account, receiver_address, amount) \
         VALUES ('2Nsender0', 'client', '2Nreceiver0', 5000000), \
                ('2Nsender1', 'client', '2Nreceiver1', 7000000)",
    )
    .execute(&mut conn)
    .unwrap();

    let store = store_at(db_url).await;
    let pending = store.fetch_pending_payment_requests().await.unwrap();
    let ids = pending.iter().map(|request| request.id()).collect::<Vec<_>>();

    let (tx, inputs, outputs) = unsigned_tx_of(ActionType::Payment, "0200f00d");
    let id = store.create_unsigned_tx(&tx, &inputs, &outputs, &ids).await.unwrap();
    assert!(store.fetch_pending_payment_requests().await.unwrap().is_empty());

    // Act
    let released = store.cancel_tx(id).await.unwrap();

    // Assert
    assert_eq!(released, 2);
    assert!(store.fetch_payment_requests_by_payment_id(id).await.unwrap().is_empty());
    let pending_again = store.fetch_pending_payment_requests().await.unwrap();
    assert_eq!(pending_again.iter().map(|request| request.id()).collect::<Vec<_>>(), ids);
    assert!(pending_again.iter().all(|request| request.payment_id().is_none()));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn multisig_address_is_immutable_once_set() {
    // Arrange
    let store = setup_store().await;
    let record = address(AccountKind::Payment, 0);
    store.save_addresses(std::slice::from_ref(&record)).await.unwrap();

    let first = MultisigAddress::builder()
        .address("2Nmulti-a".into())
        .redeem_script("5221".repeat(10))
        .build();
    let second = MultisigAddress::builder()
        .address("2Nmulti-b".into())
        .redeem_script("5221".repeat(10))
        .build();

    // Act
    store.update_multisig_address(record.full_public_key(), &first).await.unwrap();
    let same = store.update_multisig_address(record.full_public_key(), &first).await;
    let other = store.update_multisig_address(record.full_public_key(), &second).await;

    // Assert
    assert!(same.is_ok());
    assert!(matches!(other, Err(CustodyStoreError::Validation(_))));

    let stored = store.fetch_addresses(AccountKind::Payment).await.unwrap();
    assert_eq!(stored[0].multisig_address(), Some("2Nmulti-a"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn multisig_histories_complete_and_export_once() {
    // Arrange
    let store = setup_store().await;
    let key = "03".repeat(33);
    store.save_multisig_histories(AccountKind::Deposit, &[key.clone(), key]).await.unwrap();

    let pending = store.fetch_pending_multisig_histories(AccountKind::Deposit).await.unwrap();
    assert_eq!(pending.len(), 1);

    let multisig = MultisigAddress::builder()
        .address("2Nmulti".into())
        .redeem_script("5221".repeat(10))
        .build();

    // Act
    assert!(store.update_multisig_history(pending[0].id(), "2Nauth", &multisig).await.unwrap());
    let unexported = store.fetch_unexported_multisig_histories(AccountKind::Deposit).await.unwrap();
    let exported = store
        .mark_multisig_histories_exported(&unexported.iter().map(|h| h.id()).collect::<Vec<_>>())
        .await
        .unwrap();

    // Assert
    assert_eq!(exported, 1);
    assert!(store.fetch_pending_multisig_histories(AccountKind::Deposit).await.unwrap().is_empty());
    assert!(
        store.fetch_unexported_multisig_histories(AccountKind::Deposit).await.unwrap().is_empty()
    );
}
