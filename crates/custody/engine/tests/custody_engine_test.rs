//! integration tests for custody-engine

use std::path::{Path, PathBuf};

use custody_domain::{
    account::AccountKind,
    amount::{Amount, FeeAdjustmentRange},
    tx::{ActionType, TxId, TxStatus},
};
use custody_engine::{
    CustodyEngine, CustodyEngineErrorKind, EngineSettings,
    keyfile::AddressLine,
    repository::TxRepository,
    request::{
        AddMultisigAddressesRequest, CancelTxRequest, CreateDepositTxRequest,
        CreatePaymentTxRequest, CreateTransferTxRequest,
    },
    response::{CreatedTx, SentTx},
};
use custody_test_utils::{
    MemoryRepository, MockNode, address_record, payment_request, public_key, unspent,
};
use tempfile::TempDir;

type TestEngine = CustodyEngine<MockNode, MemoryRepository>;

const SIGNATURE: &str = "473044022000";

fn btc(value: &str) -> Amount {
    Amount::from_coin_str(value).unwrap()
}

fn setup_engine(dir: &Path, node: MockNode, repo: MemoryRepository) -> TestEngine {
    let settings = EngineSettings::builder()
        .fee_range(FeeAdjustmentRange::new(0.5, 5.0).unwrap())
        .file_dir(dir)
        .build();

    CustodyEngine::new(node, repo, settings)
}

fn deposit_engine(dir: &Path) -> TestEngine {
    let node = MockNode::new()
        .with_unspent(unspent("a1", "client-0", AccountKind::Client, btc("0.02")))
        .with_unspent(unspent("a2", "client-1", AccountKind::Client, btc("0.03")))
        .with_unspent(unspent("a3", "client-2", AccountKind::Client, btc("0.05")));

    let repo = MemoryRepository::new().with_addresses([
        address_record(AccountKind::Deposit, 0),
        address_record(AccountKind::Deposit, 1),
    ]);

    setup_engine(dir, node, repo)
}

fn created(result: CreatedTx) -> (TxId, String, PathBuf) {
    match result {
        CreatedTx::Created { tx_id, hex, path } => (tx_id, hex, path),
        other => panic!("expected a created tx, got {other:?}"),
    }
}

/// Plays the offline signer: appends a fake signature and hands the file back.
fn sign_all(engine: &TestEngine, unsigned_path: &Path) -> PathBuf {
    let file = engine.read_unsigned_tx(unsigned_path).unwrap();
    let signed_hex = format!("{}{SIGNATURE}", file.hex());

    engine.write_signed_tx(&file, signed_hex, engine.settings().policy().required()).unwrap()
}

async fn status_of(engine: &TestEngine, action: ActionType, tx_id: TxId) -> TxStatus {
    engine.repo().fetch_tx(action, tx_id).await.unwrap().unwrap().status()
}

#[tokio::test]
async fn deposit_sweeps_every_client_output_into_one_address() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    // Act
    let (tx_id, hex, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());

    // Assert
    let record = engine.repo().fetch_tx(ActionType::Deposit, tx_id).await.unwrap().unwrap();
    assert_eq!(record.status(), TxStatus::Unsigned);
    assert_eq!(record.unsigned_hex(), hex);
    assert_eq!(record.total_input(), btc("0.1"));
    // the fake tx is far below 1 kB, so the relay fee floor applies
    assert_eq!(record.fee(), Amount::from_sat(1_000));
    assert_eq!(record.total_output(), btc("0.09999"));

    let inputs = engine.repo().fetch_inputs(tx_id).await.unwrap();
    assert_eq!(inputs.len(), 3);

    let outputs = engine.repo().fetch_outputs(tx_id).await.unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].output_address(), "deposit-0");
    assert_eq!(outputs[0].output_account(), AccountKind::Deposit);
    assert_eq!(outputs[0].output_amount(), btc("0.09999"));

    let file_name = path.file_name().unwrap().to_str().unwrap();
    assert!(file_name.starts_with(&format!("deposit_{tx_id}_unsigned_0_")));
    assert!(path.starts_with(dir.path().join("tx")));
}

#[tokio::test]
async fn rerun_with_same_outputs_is_a_duplicate() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (_, hex, _) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());

    // Act
    let rerun = engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap();

    // Assert
    assert_eq!(rerun, CreatedTx::Duplicate { hex });
    assert_eq!(engine.repo().txs().len(), 1);
    assert_eq!(std::fs::read_dir(dir.path().join("tx")).unwrap().count(), 1);
}

#[tokio::test]
async fn nothing_to_sweep_is_a_no_op() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(
        dir.path(),
        MockNode::new(),
        MemoryRepository::new().with_addresses([address_record(AccountKind::Deposit, 0)]),
    );

    // Act
    let result = engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap();

    // Assert
    assert_eq!(result, CreatedTx::NothingToDo);
    assert!(engine.repo().txs().is_empty());
}

#[tokio::test]
async fn fee_above_holdings_is_refused_without_side_effects() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("a1", "client-0", AccountKind::Client, btc("0.0001")));
    node.set_min_relay_fee(Some(btc("0.0002")));

    let engine = setup_engine(
        dir.path(),
        node,
        MemoryRepository::new().with_addresses([address_record(AccountKind::Deposit, 0)]),
    );

    // Act
    let err = engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::InsufficientFee { .. }));
    assert!(engine.repo().txs().is_empty());
    assert!(!dir.path().join("tx").exists());
}

#[tokio::test]
async fn out_of_range_adjustment_is_refused() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    // Act
    let err = engine
        .create_deposit_tx(CreateDepositTxRequest::builder().adjustment(9.0).build())
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::FeeAdjustment(_)));
}

#[tokio::test]
async fn adjustment_scales_the_fee() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    // Act
    let (tx_id, _, _) = created(
        engine
            .create_deposit_tx(CreateDepositTxRequest::builder().adjustment(1.5).build())
            .await
            .unwrap(),
    );

    // Assert
    let record = engine.repo().fetch_tx(ActionType::Deposit, tx_id).await.unwrap().unwrap();
    assert_eq!(record.fee(), Amount::from_sat(1_500));
}

#[tokio::test]
async fn payment_batch_pays_every_pending_request_with_change() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("p1", "payment-0", AccountKind::Payment, btc("0.5")))
        .with_unspent(unspent("p2", "payment-1", AccountKind::Payment, btc("0.3")));

    let repo = MemoryRepository::new().with_payment_requests([
        payment_request(1, "ext-a", btc("0.1")),
        payment_request(2, "ext-b", btc("0.2")),
        payment_request(3, "ext-a", btc("0.05")),
    ]);

    let engine = setup_engine(dir.path(), node, repo);

    // Act
    let (tx_id, _, _) =
        created(engine.create_payment_tx(CreatePaymentTxRequest::default()).await.unwrap());

    // Assert
    let inputs = engine.repo().fetch_inputs(tx_id).await.unwrap();
    assert_eq!(inputs.len(), 1, "the first output already exceeds the requests");

    let outputs = engine.repo().fetch_outputs(tx_id).await.unwrap();
    let summary: Vec<_> = outputs
        .iter()
        .map(|o| (o.output_address(), o.output_account(), o.output_amount(), o.is_change()))
        .collect();

    assert_eq!(
        summary,
        [
            ("ext-a", AccountKind::Anonymous, btc("0.15"), false),
            ("ext-b", AccountKind::Anonymous, btc("0.2"), false),
            ("payment-0", AccountKind::Payment, btc("0.14999"), true),
        ]
    );

    assert!(
        engine.repo().payment_requests().iter().all(|request| request.payment_id() == Some(tx_id))
    );
}

#[tokio::test]
async fn payment_without_pending_requests_is_a_no_op() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("p1", "payment-0", AccountKind::Payment, btc("0.5")));
    let engine = setup_engine(dir.path(), node, MemoryRepository::new());

    // Act
    let result = engine.create_payment_tx(CreatePaymentTxRequest::default()).await.unwrap();

    // Assert
    assert_eq!(result, CreatedTx::NothingToDo);
}

#[tokio::test]
async fn payment_with_insufficient_balance_is_a_no_op() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("p1", "payment-0", AccountKind::Payment, btc("0.1")));
    let repo =
        MemoryRepository::new().with_payment_requests([payment_request(1, "ext-a", btc("0.1"))]);
    let engine = setup_engine(dir.path(), node, repo);

    // Act
    let result = engine.create_payment_tx(CreatePaymentTxRequest::default()).await.unwrap();

    // Assert
    assert_eq!(result, CreatedTx::NothingToDo);
    assert!(engine.repo().payment_requests()[0].is_pending());
}

#[tokio::test]
async fn transfer_never_spends_more_than_the_sender_holds() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("p1", "payment-0", AccountKind::Payment, btc("0.5")));
    let repo = MemoryRepository::new().with_addresses([address_record(AccountKind::Stored, 0)]);
    let engine = setup_engine(dir.path(), node, repo);

    let request = CreateTransferTxRequest::builder()
        .sender(AccountKind::Payment)
        .receiver(AccountKind::Stored)
        .amount(btc("0.5"))
        .build()
        .unwrap();

    // Act
    let err = engine.create_transfer_tx(request).await.unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::InsufficientFunds { .. }));
    assert!(engine.repo().txs().is_empty());
}

#[tokio::test]
async fn transfer_returns_change_to_the_first_input_address() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("p1", "payment-0", AccountKind::Payment, btc("0.2")))
        .with_unspent(unspent("p2", "payment-1", AccountKind::Payment, btc("0.2")));
    let repo = MemoryRepository::new().with_addresses([address_record(AccountKind::Stored, 0)]);
    let engine = setup_engine(dir.path(), node, repo);

    let request = CreateTransferTxRequest::builder()
        .sender(AccountKind::Payment)
        .receiver(AccountKind::Stored)
        .amount(btc("0.3"))
        .build()
        .unwrap();

    // Act
    let (tx_id, _, _) = created(engine.create_transfer_tx(request).await.unwrap());

    // Assert
    let outputs = engine.repo().fetch_outputs(tx_id).await.unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].output_address(), "stored-0");
    assert_eq!(outputs[0].output_amount(), btc("0.3"));
    assert_eq!(outputs[1].output_address(), "payment-0");
    assert!(outputs[1].is_change());
    assert_eq!(outputs[1].output_amount(), btc("0.09999"));
}

#[tokio::test]
async fn signed_file_round_trip_sends_and_allocates_the_receiver() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (tx_id, hex, unsigned_path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());

    let unsigned = engine.read_unsigned_tx(&unsigned_path).unwrap();
    let context = unsigned.context().unwrap();
    assert_eq!(unsigned.hex(), hex);
    assert_eq!(context.sender_account(), AccountKind::Client);
    assert_eq!(context.prev_txs().len(), 3);

    let signed_path = sign_all(&engine, &unsigned_path);

    // Act
    let sent = engine.send_tx(&signed_path).await.unwrap();

    // Assert
    let SentTx::Sent { tx_id: sent_id, hash } = sent else {
        panic!("expected a broadcast");
    };
    assert_eq!(sent_id, tx_id);

    let record = engine.repo().fetch_tx(ActionType::Deposit, tx_id).await.unwrap().unwrap();
    assert_eq!(record.status(), TxStatus::Sent);
    assert_eq!(record.sent_hash(), Some(hash.as_str()));
    assert_eq!(record.signed_hex(), Some(format!("{hex}{SIGNATURE}").as_str()));

    let allocated: Vec<_> = engine
        .repo()
        .addresses()
        .into_iter()
        .filter(|address| address.is_allocated())
        .map(|address| address.wallet_address().to_owned())
        .collect();
    assert_eq!(allocated, ["deposit-0"]);
}

#[tokio::test]
async fn allocated_address_is_never_reused() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (_, _, first) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    engine.send_tx(sign_all(&engine, &first)).await.unwrap();

    engine.node().clear_unspents();
    engine.node().add_unspent(unspent("b1", "client-3", AccountKind::Client, btc("0.04")));

    // Act
    let (tx_id, _, _) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());

    // Assert
    let outputs = engine.repo().fetch_outputs(tx_id).await.unwrap();
    assert_eq!(outputs[0].output_address(), "deposit-1");
}

#[tokio::test]
async fn deposit_without_free_address_is_refused() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("a1", "client-0", AccountKind::Client, btc("0.02")));
    let engine = setup_engine(dir.path(), node, MemoryRepository::new());

    // Act
    let err = engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::NotFound(_)));
}

#[tokio::test]
async fn unchanged_hex_is_not_signed() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (_, hex, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    let unsigned = engine.read_unsigned_tx(&path).unwrap();

    // Act
    let err = engine.write_signed_tx(&unsigned, hex, 2).unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::NotSigned));
}

#[tokio::test]
async fn partially_signed_file_is_handed_to_the_next_signer() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (tx_id, hex, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    let unsigned = engine.read_unsigned_tx(&path).unwrap();
    let first_path = engine.write_signed_tx(&unsigned, format!("{hex}01"), 1).unwrap();

    // Act
    let partial = engine.read_unsigned_tx(&first_path).unwrap();
    let second_path = engine.write_signed_tx(&partial, format!("{hex}0102"), 2).unwrap();

    // Assert
    assert_eq!(partial.name().signed_count(), 1);
    assert_eq!(partial.context(), unsigned.context());
    assert!(engine.read_unsigned_tx(&second_path).is_err());

    assert_eq!(engine.import_signed_tx(&second_path).await.unwrap(), tx_id);
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Signed);
}

#[tokio::test]
async fn unsigned_file_cannot_be_sent() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (_, _, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());

    // Act
    let err = engine.send_tx(&path).await.unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::FileProtocol(_)));
    assert!(engine.node().broadcasts().is_empty());
}

#[tokio::test]
async fn rejected_broadcast_keeps_the_tx_retryable() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (tx_id, _, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    let signed_path = sign_all(&engine, &path);

    engine.node().reject_broadcasts(Some("missing inputs"));

    // Act
    let err = engine.send_tx(&signed_path).await.unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::Broadcast(_)));
    assert!(err.to_string().contains("missing inputs"));
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Signed);
    assert!(engine.repo().addresses().iter().all(|address| !address.is_allocated()));

    engine.node().reject_broadcasts(None);

    assert!(matches!(engine.send_tx(&signed_path).await.unwrap(), SentTx::Sent { .. }));
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Sent);
}

#[tokio::test]
async fn resend_records_a_broadcast_whose_recording_failed() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (tx_id, _, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    let signed_path = sign_all(&engine, &path);
    engine.import_signed_tx(&signed_path).await.unwrap();

    engine.repo().fail_next_write("connection reset");

    let err = engine.send_tx(&signed_path).await.unwrap_err();
    let CustodyEngineErrorKind::PostBroadcast { hash, .. } = err.kind() else {
        panic!("expected a post-broadcast error, got {err}");
    };
    let hash = hash.clone();

    assert_eq!(engine.node().broadcasts().len(), 1);
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Signed);
    assert!(engine.repo().addresses().iter().all(|address| !address.is_allocated()));

    // Act
    let resent = engine.send_tx(&signed_path).await.unwrap();

    // Assert
    assert_eq!(resent, SentTx::AlreadySent { tx_id, hash: hash.clone() });
    assert_eq!(engine.node().broadcasts().len(), 1);

    let record = engine.repo().fetch_tx(ActionType::Deposit, tx_id).await.unwrap().unwrap();
    assert_eq!(record.status(), TxStatus::Sent);
    assert_eq!(record.sent_hash(), Some(hash.as_str()));
    assert!(engine.repo().addresses()[0].is_allocated());
}

#[tokio::test]
async fn sent_tx_cannot_be_sent_twice() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (_, _, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    let signed_path = sign_all(&engine, &path);
    engine.send_tx(&signed_path).await.unwrap();

    // Act
    let err = engine.send_tx(&signed_path).await.unwrap_err();

    // Assert
    assert!(matches!(
        err.kind(),
        CustodyEngineErrorKind::InvalidStatusTransition { from: TxStatus::Sent, to: TxStatus::Sent }
    ));
    assert_eq!(engine.node().broadcasts().len(), 1);
}

#[tokio::test]
async fn monitor_moves_confirmed_txs_to_notified() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (tx_id, _, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    let SentTx::Sent { hash, .. } = engine.send_tx(sign_all(&engine, &path)).await.unwrap() else {
        panic!("expected a broadcast");
    };

    engine.node().set_confirmations(&hash, 2);
    let early = engine.monitor_txs().await.unwrap();
    assert!(early.done_hashes().is_empty());
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Sent);

    engine.node().set_confirmations(&hash, 6);

    // Act
    let report = engine.monitor_txs().await.unwrap();

    // Assert
    assert_eq!(report.done_hashes(), [(ActionType::Deposit, hash.clone())]);
    assert_eq!(report.notified_hashes(), [(ActionType::Deposit, hash)]);
    assert!(report.failed().is_empty());
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Notified);
}

#[tokio::test]
async fn monitor_skips_unknown_hashes() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (tx_id, _, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    engine.send_tx(sign_all(&engine, &path)).await.unwrap();

    // Act
    let report = engine.monitor_txs().await.unwrap();

    // Assert
    assert_eq!(report.failed().len(), 1);
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Sent);
}

#[tokio::test]
async fn notified_payment_completes_its_requests() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("p1", "payment-0", AccountKind::Payment, btc("0.5")));
    let repo = MemoryRepository::new().with_payment_requests([
        payment_request(1, "ext-a", btc("0.1")),
        payment_request(2, "ext-b", btc("0.2")),
    ]);
    let engine = setup_engine(dir.path(), node, repo);

    let (tx_id, _, path) =
        created(engine.create_payment_tx(CreatePaymentTxRequest::default()).await.unwrap());
    let SentTx::Sent { hash, .. } = engine.send_tx(sign_all(&engine, &path)).await.unwrap() else {
        panic!("expected a broadcast");
    };
    engine.node().set_confirmations(&hash, 10);

    // Act
    let report = engine.monitor_txs().await.unwrap();

    // Assert
    assert_eq!(report.notified_hashes(), [(ActionType::Payment, hash)]);
    assert_eq!(status_of(&engine, ActionType::Payment, tx_id).await, TxStatus::Notified);
    assert!(engine.repo().payment_requests().iter().all(|request| request.is_done()));
}

#[tokio::test]
async fn balances_cover_every_custody_account() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    // Act
    let balances = engine.monitor_balances().await.unwrap();

    // Assert
    let summary: Vec<_> = balances.iter().map(|b| (b.account(), b.balance())).collect();
    assert_eq!(
        summary,
        [
            (AccountKind::Client, btc("0.1")),
            (AccountKind::Deposit, Amount::ZERO),
            (AccountKind::Payment, Amount::ZERO),
            (AccountKind::Stored, Amount::ZERO),
        ]
    );
}

#[tokio::test]
async fn cancel_is_only_allowed_before_broadcast() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (first_id, _, _) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());

    let cancel =
        |tx_id| CancelTxRequest::builder().action(ActionType::Deposit).tx_id(tx_id).build();

    // Act
    engine.cancel_tx(cancel(first_id)).await.unwrap();
    let again = engine.cancel_tx(cancel(first_id)).await.unwrap_err();

    // Assert
    assert_eq!(status_of(&engine, ActionType::Deposit, first_id).await, TxStatus::Cancel);
    assert!(matches!(again.kind(), CustodyEngineErrorKind::InvalidStatusTransition { .. }));

    engine.node().add_unspent(unspent("b1", "client-3", AccountKind::Client, btc("0.01")));
    let (second_id, _, path) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    engine.send_tx(sign_all(&engine, &path)).await.unwrap();

    let sent = engine.cancel_tx(cancel(second_id)).await.unwrap_err();
    assert!(matches!(
        sent.kind(),
        CustodyEngineErrorKind::InvalidStatusTransition { from: TxStatus::Sent, .. }
    ));

    let missing = engine.cancel_tx(cancel(TxId::from(99))).await.unwrap_err();
    assert!(matches!(missing.kind(), CustodyEngineErrorKind::NotFound(_)));
}

#[tokio::test]
async fn cancelled_deposit_is_rebuilt_from_the_same_outputs() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = deposit_engine(dir.path());

    let (cancelled_id, cancelled_hex, _) =
        created(engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap());
    let request =
        CancelTxRequest::builder().action(ActionType::Deposit).tx_id(cancelled_id).build();
    engine.cancel_tx(request).await.unwrap();

    // Act
    let rebuilt = engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap();

    // Assert
    let (tx_id, hex, _) = created(rebuilt);
    assert_ne!(tx_id, cancelled_id);
    assert_eq!(hex, cancelled_hex);
    assert_eq!(status_of(&engine, ActionType::Deposit, tx_id).await, TxStatus::Unsigned);

    let again = engine.create_deposit_tx(CreateDepositTxRequest::default()).await.unwrap();
    assert!(matches!(again, CreatedTx::Duplicate { .. }));
}

#[tokio::test]
async fn cancelled_payment_requests_are_bundled_again() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let node = MockNode::new()
        .with_unspent(unspent("p1", "payment-0", AccountKind::Payment, btc("0.5")));
    let repo = MemoryRepository::new().with_payment_requests([
        payment_request(1, "ext-a", btc("0.1")),
        payment_request(2, "ext-b", btc("0.2")),
    ]);
    let engine = setup_engine(dir.path(), node, repo);

    let (cancelled_id, _, _) =
        created(engine.create_payment_tx(CreatePaymentTxRequest::default()).await.unwrap());
    let request =
        CancelTxRequest::builder().action(ActionType::Payment).tx_id(cancelled_id).build();

    // Act
    engine.cancel_tx(request).await.unwrap();

    // Assert
    assert!(engine.repo().payment_requests().iter().all(|request| request.payment_id().is_none()));

    let (tx_id, _, _) =
        created(engine.create_payment_tx(CreatePaymentTxRequest::default()).await.unwrap());
    assert_ne!(tx_id, cancelled_id);
    assert!(
        engine.repo().payment_requests().iter().all(|request| request.payment_id() == Some(tx_id))
    );
}

#[tokio::test]
async fn multisig_exchange_attaches_addresses_across_roles() {
    // Arrange
    let dir = TempDir::new().unwrap();

    let keygen = setup_engine(
        &dir.path().join("keygen"),
        MockNode::new(),
        MemoryRepository::new()
            .with_addresses((0..3).map(|i| address_record(AccountKind::Deposit, i))),
    );
    let sign = setup_engine(&dir.path().join("sign"), MockNode::new(), MemoryRepository::new());

    let rejected_key = public_key(AccountKind::Deposit, 1);
    sign.node().reject_key(&rejected_key);

    // Act
    let pubkey_file = keygen.export_pubkeys(AccountKind::Deposit).await.unwrap().unwrap();
    let imported = sign.import_pubkeys(&pubkey_file, AccountKind::Deposit).await.unwrap();

    let request = AddMultisigAddressesRequest::builder()
        .account(AccountKind::Deposit)
        .auth_address("auth-0".into())
        .build()
        .unwrap();
    let created = sign.add_multisig_addresses(request).await.unwrap();

    let multisig_file =
        sign.export_multisig_addresses(AccountKind::Deposit).await.unwrap().unwrap();
    let attached =
        keygen.import_multisig_addresses(&multisig_file, AccountKind::Deposit).await.unwrap();

    // Assert
    assert_eq!(imported, 3);
    assert_eq!(created.succeeded(), [1, 3]);
    assert_eq!(created.failed().len(), 1);
    assert_eq!(created.failed()[0].0, 2);
    assert_eq!(attached.succeeded(), [1, 2]);

    assert!(keygen.export_pubkeys(AccountKind::Deposit).await.unwrap().is_none());
    assert!(sign.export_multisig_addresses(AccountKind::Deposit).await.unwrap().is_none());

    let addresses = keygen.repo().addresses();
    assert!(addresses[0].multisig_address().is_some_and(|a| a.starts_with("2N-multi_deposit")));
    assert_eq!(addresses[1].multisig_address(), None);
    assert_eq!(addresses[1].wallet_address(), "deposit-1");
    assert!(addresses[2].multisig_address().is_some());

    let histories = sign.repo().multisig_histories();
    assert!(
        histories
            .iter()
            .filter(|h| h.is_complete())
            .all(|h| h.full_public_key() != rejected_key)
    );
}

#[tokio::test]
async fn failed_history_update_skips_only_that_record() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let keygen = setup_engine(
        &dir.path().join("keygen"),
        MockNode::new(),
        MemoryRepository::new()
            .with_addresses((0..3).map(|i| address_record(AccountKind::Deposit, i))),
    );
    let sign = setup_engine(&dir.path().join("sign"), MockNode::new(), MemoryRepository::new());

    let pubkey_file = keygen.export_pubkeys(AccountKind::Deposit).await.unwrap().unwrap();
    sign.import_pubkeys(&pubkey_file, AccountKind::Deposit).await.unwrap();

    let request = || {
        AddMultisigAddressesRequest::builder()
            .account(AccountKind::Deposit)
            .auth_address("auth-0".into())
            .build()
            .unwrap()
    };

    sign.repo().fail_next_write("connection reset");

    // Act
    let first = sign.add_multisig_addresses(request()).await.unwrap();
    let retry = sign.add_multisig_addresses(request()).await.unwrap();

    // Assert
    assert_eq!(first.succeeded(), [2, 3]);
    assert_eq!(first.failed().len(), 1);
    assert_eq!(first.failed()[0].0, 1);
    assert!(first.failed()[0].1.contains("connection reset"));

    assert_eq!(retry.succeeded(), [1]);
    assert!(sign.repo().multisig_histories().iter().all(|history| history.is_complete()));
}

#[tokio::test]
async fn reimported_pubkeys_are_skipped() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let keygen = setup_engine(
        &dir.path().join("keygen"),
        MockNode::new(),
        MemoryRepository::new().with_addresses([address_record(AccountKind::Deposit, 0)]),
    );
    let sign = setup_engine(&dir.path().join("sign"), MockNode::new(), MemoryRepository::new());

    let path = keygen.export_pubkeys(AccountKind::Deposit).await.unwrap().unwrap();
    sign.import_pubkeys(&path, AccountKind::Deposit).await.unwrap();

    // Act
    let again = sign.import_pubkeys(&path, AccountKind::Deposit).await.unwrap();

    // Assert
    assert_eq!(again, 0);
    assert_eq!(sign.repo().multisig_histories().len(), 1);
}

#[tokio::test]
async fn key_file_of_another_account_is_refused() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let keygen = setup_engine(
        &dir.path().join("keygen"),
        MockNode::new(),
        MemoryRepository::new().with_addresses([address_record(AccountKind::Payment, 0)]),
    );
    let sign = setup_engine(&dir.path().join("sign"), MockNode::new(), MemoryRepository::new());

    let path = keygen.export_pubkeys(AccountKind::Payment).await.unwrap().unwrap();

    // Act
    let err = sign.import_pubkeys(&path, AccountKind::Deposit).await.unwrap_err();

    // Assert
    assert!(matches!(err.kind(), CustodyEngineErrorKind::InvalidRequest(_)));
    assert!(sign.repo().multisig_histories().is_empty());
}

#[tokio::test]
async fn watch_role_imports_generated_addresses() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let engine = setup_engine(dir.path(), MockNode::new(), MemoryRepository::new());

    let lines: Vec<AddressLine> =
        (0..2).map(|i| AddressLine::from(address_record(AccountKind::Client, i))).collect();
    let path = engine.key_files().write(AccountKind::Client, &lines).unwrap();

    // Act
    let report = engine.import_addresses(&path, AccountKind::Client).await.unwrap();

    // Assert
    assert_eq!(report.succeeded(), [0, 1]);
    assert_eq!(engine.repo().addresses().len(), 2);
    assert_eq!(engine.node().imported_account("client-1"), Some(AccountKind::Client));
}
