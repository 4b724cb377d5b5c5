use async_trait::async_trait;
use custody_domain::{
    account::AccountKind,
    address::AddressRecord,
    multisig::{MultisigAddress, MultisigHistory},
    payment::PaymentRequest,
    tx::{ActionType, TxId, TxInput, TxOutput, TxRecord, TxStatus, UnsignedTx},
};
use custody_store::{CustodyStore, CustodyStoreError};

use super::{
    AddressRepository, MultisigRepository, PaymentRepository, Repository, TxRepository,
};

impl Repository for CustodyStore {
    type Error = CustodyStoreError;
}

#[async_trait]
impl AddressRepository for CustodyStore {
    async fn fetch_unallocated_address(
        &self,
        account: AccountKind,
    ) -> Result<Option<AddressRecord>, Self::Error> {
        CustodyStore::fetch_unallocated_address(self, account).await
    }

    async fn mark_address_allocated(&self, address: &str) -> Result<bool, Self::Error> {
        CustodyStore::mark_address_allocated(self, address).await
    }

    async fn save_addresses(&self, records: &[AddressRecord<()>]) -> Result<usize, Self::Error> {
        CustodyStore::save_addresses(self, records).await
    }

    async fn fetch_addresses(
        &self,
        account: AccountKind,
    ) -> Result<Vec<AddressRecord>, Self::Error> {
        CustodyStore::fetch_addresses(self, account).await
    }

    async fn fetch_unexported_pubkeys(
        &self,
        account: AccountKind,
    ) -> Result<Vec<AddressRecord>, Self::Error> {
        CustodyStore::fetch_unexported_pubkeys(self, account).await
    }

    async fn mark_pubkeys_exported(
        &self,
        full_public_keys: &[String],
    ) -> Result<usize, Self::Error> {
        CustodyStore::mark_pubkeys_exported(self, full_public_keys).await
    }

    async fn update_multisig_address(
        &self,
        full_public_key: &str,
        multisig: &MultisigAddress,
    ) -> Result<(), Self::Error> {
        CustodyStore::update_multisig_address(self, full_public_key, multisig).await
    }
}

#[async_trait]
impl TxRepository for CustodyStore {
    async fn count_by_unsigned_hex(
        &self,
        action: ActionType,
        unsigned_hex: &str,
    ) -> Result<u64, Self::Error> {
        CustodyStore::count_by_unsigned_hex(self, action, unsigned_hex).await
    }

    async fn create_unsigned_tx(
        &self,
        tx: &UnsignedTx,
        inputs: &[TxInput],
        outputs: &[TxOutput],
        payment_ids: &[i64],
    ) -> Result<TxId, Self::Error> {
        CustodyStore::create_unsigned_tx(self, tx, inputs, outputs, payment_ids).await
    }

    async fn fetch_tx(
        &self,
        action: ActionType,
        id: TxId,
    ) -> Result<Option<TxRecord>, Self::Error> {
        CustodyStore::fetch_tx(self, action, id).await
    }

    async fn update_signed(&self, id: TxId, signed_hex: &str) -> Result<(), Self::Error> {
        CustodyStore::update_signed(self, id, signed_hex).await
    }

    async fn update_sent(
        &self,
        id: TxId,
        signed_hex: &str,
        sent_hash: &str,
    ) -> Result<(), Self::Error> {
        CustodyStore::update_sent(self, id, signed_hex, sent_hash).await
    }

    async fn fetch_hashes_by_status(
        &self,
        action: ActionType,
        status: TxStatus,
    ) -> Result<Vec<String>, Self::Error> {
        CustodyStore::fetch_hashes_by_status(self, action, status).await
    }

    async fn fetch_tx_id_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
    ) -> Result<Option<TxId>, Self::Error> {
        CustodyStore::fetch_tx_id_by_hash(self, action, sent_hash).await
    }

    async fn update_status_by_hash(
        &self,
        action: ActionType,
        sent_hash: &str,
        status: TxStatus,
    ) -> Result<(), Self::Error> {
        CustodyStore::update_status_by_hash(self, action, sent_hash, status).await
    }

    async fn cancel_tx(&self, id: TxId) -> Result<usize, Self::Error> {
        CustodyStore::cancel_tx(self, id).await
    }

    async fn fetch_outputs(&self, id: TxId) -> Result<Vec<TxOutput>, Self::Error> {
        CustodyStore::fetch_outputs(self, id).await
    }

    async fn fetch_inputs(&self, id: TxId) -> Result<Vec<TxInput>, Self::Error> {
        CustodyStore::fetch_inputs(self, id).await
    }

    async fn complete_payment(&self, id: TxId) -> Result<usize, Self::Error> {
        CustodyStore::complete_payment(self, id).await
    }
}

#[async_trait]
impl PaymentRepository for CustodyStore {
    async fn fetch_pending_payment_requests(&self) -> Result<Vec<PaymentRequest>, Self::Error> {
        CustodyStore::fetch_pending_payment_requests(self).await
    }

    async fn fetch_payment_requests_by_payment_id(
        &self,
        id: TxId,
    ) -> Result<Vec<PaymentRequest>, Self::Error> {
        CustodyStore::fetch_payment_requests_by_payment_id(self, id).await
    }
}

#[async_trait]
impl MultisigRepository for CustodyStore {
    async fn save_multisig_histories(
        &self,
        account: AccountKind,
        full_public_keys: &[String],
    ) -> Result<usize, Self::Error> {
        CustodyStore::save_multisig_histories(self, account, full_public_keys).await
    }

    async fn fetch_pending_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>, Self::Error> {
        CustodyStore::fetch_pending_multisig_histories(self, account).await
    }

    async fn update_multisig_history(
        &self,
        id: i64,
        auth_address: &str,
        multisig: &MultisigAddress,
    ) -> Result<bool, Self::Error> {
        CustodyStore::update_multisig_history(self, id, auth_address, multisig).await
    }

    async fn fetch_unexported_multisig_histories(
        &self,
        account: AccountKind,
    ) -> Result<Vec<MultisigHistory>, Self::Error> {
        CustodyStore::fetch_unexported_multisig_histories(self, account).await
    }

    async fn mark_multisig_histories_exported(&self, ids: &[i64]) -> Result<usize, Self::Error> {
        CustodyStore::mark_multisig_histories_exported(self, ids).await
    }
}
