//! Persistence capabilities the engine needs.
//!
//! [`CustodyStore`](custody_store::CustodyStore) implements every trait here; tests use an
//! in-memory repository.

mod custody_store;

use async_trait::async_trait;
use custody_domain::{
    account::AccountKind,
    address::AddressRecord,
    multisig::{MultisigAddress, MultisigHistory},
    payment::PaymentRequest,
    tx::{ActionType, TxId, TxInput, TxOutput, TxRecord, TxStatus, UnsignedTx},
};

/// Base trait of every repository capability.
pub trait Repository: Send + Sync {
    /// The error returned by repository calls.
    type Error: std::error::Error + Send + Sync + 'static;
}

/// Address records.
#[async_trait]
pub trait AddressRepository: Repository {
    /// Returns an address of `account` that has not received funds yet.
    async fn fetch_unallocated_address(
        &self,
        account: AccountKind,
    ) -> Result<Option<AddressRecord>, Self::Error>;

    /// Flags the record owning `address` as allocated. Returns `false` if none owns it.
    async fn mark_address_allocated(&self, address: &str) -> Result<bool, Self::Error>;

    /// Persists address records, skipping stored keys. Returns the number inserted.
    async fn save_addresses(&self, records: &[AddressRecord<()>]) -> Result<usize, Self::Error>;

    /// Returns every address record of `account`.
    async fn fetch_addresses(&self, account: AccountKind)
    -> Result<Vec<AddressRecord>, Self::Error>;

    /// Returns the records of `account` whose public key has not been exported.
    async fn fetch_unexported_pubkeys(
        &self,
        account: AccountKind,
    ) -> Result<Vec<AddressRecord>, Self::Error>;

    /// Flags the records owning `full_public_keys` as exported.
    async fn mark_pubkeys_exported(&self, full_public_keys: &[String])
    -> Result<usize, Self::Error>;

    /// Attaches a multisig address to the record owning `full_public_key`, refusing to
    /// replace a different one.
    async fn update_multisig_address(
        &self,
        full_public_key: &str,
        multisig: &MultisigAddress,
    ) -> Result<(), Self::Error>;
}

/// Transaction records.
#[async_trait]
pub trait TxRepository: Repository {
    /// Returns how many `action` records carry this unsigned hex.
    async fn count_by_unsigned_hex(
        &self,
        action: ActionType,
        unsigned_hex: &str,
    ) -> Result<u64, Self::Error>;

    /// Inserts the record, its inputs and outputs, and links `payment_ids`, atomically.
    async fn create_unsigned_tx(
        &self,
        tx: &UnsignedTx,
        inputs: &[TxInput],
        outputs: &[TxOutput],
        payment_ids: &[i64],
    ) -> Result<TxId, Self::Error>;

    /// Returns record `id` of kind `action`.
    async fn fetch_tx(&self, action: ActionType, id: TxId)
    -> Result<Option<TxRecord>, Self::Error>;

    /// Stores the signed hex and advances to `signed`.
    async fn update_signed(&self, id: TxId, signed_hex: &str) -> Result<(), Self::Error>;

    /// Stores the broadcast hash and advances to `sent`.
    async fn update_sent(
        &self,
        id: TxId,
        signed_hex: &str,
        sent_hash: &str,
    ) -> Result<(), Self::Error>;

    /// Returns the broadcast hashes of `action` records in `status`.
    async fn fetch_hashes_by_status(
        &self,
        action: ActionType,
        status: TxStatus,
    ) -> Result<Vec<String>, Self::Error>;

    /// Returns the id of the `action` record broadcast as `sent_hash`.
    async fn fetch_tx_id_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
    ) -> Result<Option<TxId>, Self::Error>;

    /// Moves the record broadcast as `sent_hash` to `status`.
    async fn update_status_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
        status: TxStatus,
    ) -> Result<(), Self::Error>;

    /// Moves record `id` to `cancel` and releases the payment requests it bundled,
    /// atomically. Returns the number of requests released.
    async fn cancel_tx(&self, id: TxId) -> Result<usize, Self::Error>;

    /// Returns the output records of `id`.
    async fn fetch_outputs(&self, id: TxId) -> Result<Vec<TxOutput>, Self::Error>;

    /// Returns the input records of `id`.
    async fn fetch_inputs(&self, id: TxId) -> Result<Vec<TxInput>, Self::Error>;

    /// Moves payment `id` to `notified` and completes its payment requests, atomically.
    async fn complete_payment(&self, id: TxId) -> Result<usize, Self::Error>;
}

/// Payment requests.
#[async_trait]
pub trait PaymentRepository: Repository {
    /// Returns the requests not yet bundled into a transaction.
    async fn fetch_pending_payment_requests(&self) -> Result<Vec<PaymentRequest>, Self::Error>;

    /// Returns the requests paid by transaction `id`.
    async fn fetch_payment_requests_by_payment_id(
        &self,
        id: TxId,
    ) -> Result<Vec<PaymentRequest>, Self::Error>;
}

/// Multisig exchange histories.
#[async_trait]
pub trait MultisigRepository: Repository {
    /// Stores a history record per imported key. Returns the number inserted.
    async fn save_multisig_histories(
        &self,
        account: AccountKind,
        full_public_keys: &[String],
    ) -> Result<usize, Self::Error>;

    /// Returns the histories of `account` without a multisig address.
    async fn fetch_pending_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>, Self::Error>;

    /// Completes history `id`. Returns `false` if it is missing or already complete.
    async fn update_multisig_history(
        &self,
        id: i64,
        auth_address: &str,
        multisig: &MultisigAddress,
    ) -> Result<bool, Self::Error>;

    /// Returns the completed histories of `account` not yet exported.
    async fn fetch_unexported_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>, Self::Error>;

    /// Flags histories as exported.
    async fn mark_multisig_histories_exported(&self, ids: &[i64]) -> Result<usize, Self::Error>;
}

/// Everything the online watch role persists.
pub trait WatchRepository: AddressRepository + TxRepository + PaymentRepository {}

impl<T> WatchRepository for T where T: AddressRepository + TxRepository + PaymentRepository {}
