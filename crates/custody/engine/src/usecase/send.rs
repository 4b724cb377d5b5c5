use std::path::Path;

use custody_domain::tx::{ActionType, TxId, TxRecord, TxStatus};

use crate::{
    CustodyEngine,
    error::{CustodyEngineErrorKind, Result},
    file::TxFileName,
    node::Broadcaster,
    repository::{AddressRepository, TxRepository},
    types::{
        request::{CancelTxRequest, CancelTxRequestDissolved},
        response::SentTx,
    },
};

const MANUAL_CORRECTION: &str = "tx was broadcast, manual correction required";

impl<N, R> CustodyEngine<N, R>
where
    R: TxRepository,
{
    /// Records the signed hex of a hand-back file and advances the record to `signed`.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn import_signed_tx(&self, path: impl AsRef<Path>) -> Result<TxId> {
        let (name, body) = self
            .tx_files
            .read(path, TxStatus::Signed)
            .map_err(CustodyEngineErrorKind::from)?;

        let record = self.fetch_tx_record(&name).await?;
        self.store_signed(&record, body.hex()).await?;

        Ok(record.id())
    }

    /// Abandons a transaction that has not been broadcast.
    ///
    /// The unsigned hex is no longer a duplicate afterwards and the payment requests of a
    /// cancelled payment are pending again, so the next create run rebuilds the work.
    #[tracing::instrument(skip_all)]
    pub async fn cancel_tx(&self, request: CancelTxRequest) -> Result<()> {
        let CancelTxRequestDissolved { action, tx_id } = request.dissolve();

        let record = self
            .repo
            .fetch_tx(action, tx_id)
            .await
            .map_err(CustodyEngineErrorKind::repository)?
            .ok_or_else(|| CustodyEngineErrorKind::not_found(format!("{action} tx {tx_id}")))?;

        if !record.status().can_transition_to(TxStatus::Cancel) {
            return Err(CustodyEngineErrorKind::InvalidStatusTransition {
                from: record.status(),
                to: TxStatus::Cancel,
            }
            .into());
        }

        let released =
            self.repo.cancel_tx(tx_id).await.map_err(CustodyEngineErrorKind::repository)?;

        tracing::info!(%action, %tx_id, released, "tx cancelled");

        Ok(())
    }

    async fn fetch_tx_record(&self, name: &TxFileName) -> Result<TxRecord> {
        let record = self
            .repo
            .fetch_tx(name.action(), name.tx_id())
            .await
            .map_err(CustodyEngineErrorKind::repository)?
            .ok_or_else(|| CustodyEngineErrorKind::not_found(format!("tx of file {name}")))?;

        Ok(record)
    }

    async fn store_signed(&self, record: &TxRecord, signed_hex: &str) -> Result<()> {
        match record.status() {
            TxStatus::Unsigned | TxStatus::Signed => {},
            status => {
                return Err(CustodyEngineErrorKind::InvalidStatusTransition {
                    from: status,
                    to: TxStatus::Signed,
                }
                .into());
            },
        }

        if record.unsigned_hex() == signed_hex {
            return Err(CustodyEngineErrorKind::NotSigned.into());
        }

        self.repo
            .update_signed(record.id(), signed_hex)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        tracing::info!(tx_id = %record.id(), action = %record.action(), "signed tx imported");

        Ok(())
    }
}

impl<N, R> CustodyEngine<N, R>
where
    N: Broadcaster,
    R: TxRepository + AddressRepository,
{
    /// Broadcasts the signed transaction of a hand-back file.
    ///
    /// A node rejection leaves the record untouched so the send can be retried. Once the
    /// node accepted the transaction any failure to record it is a
    /// [`PostBroadcast`](CustodyEngineErrorKind::PostBroadcast) error. A transaction the
    /// node already knows is recorded under its decoded hash, which completes a send whose
    /// recording failed before.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn send_tx(&self, path: impl AsRef<Path>) -> Result<SentTx> {
        let (name, body) = self
            .tx_files
            .read(path, TxStatus::Signed)
            .map_err(CustodyEngineErrorKind::from)?;

        let record = self.fetch_tx_record(&name).await?;
        let tx_id = record.id();
        let signed_hex = body.hex();

        match record.status() {
            TxStatus::Unsigned => self.store_signed(&record, signed_hex).await?,
            TxStatus::Signed if record.unsigned_hex() == signed_hex => {
                return Err(CustodyEngineErrorKind::NotSigned.into());
            },
            TxStatus::Signed => {},
            status => {
                return Err(CustodyEngineErrorKind::InvalidStatusTransition {
                    from: status,
                    to: TxStatus::Sent,
                }
                .into());
            },
        }

        let (hash, already_known) = match self.node.send_raw_transaction(signed_hex).await {
            Ok(Some(hash)) => (hash, false),
            Ok(None) => {
                let hash = self.node.tx_hash(signed_hex).map_err(|e| {
                    tracing::error!(%tx_id, error = %e, "{MANUAL_CORRECTION}");
                    CustodyEngineErrorKind::post_broadcast("unknown", e)
                })?;
                tracing::info!(%tx_id, %hash, "tx is already known to the node");
                (hash, true)
            },
            Err(e) => return Err(CustodyEngineErrorKind::broadcast(e).into()),
        };

        self.record_sent(name.action(), tx_id, signed_hex, &hash).await?;

        if already_known {
            return Ok(SentTx::AlreadySent { tx_id, hash });
        }

        tracing::info!(%tx_id, %hash, "tx sent");

        Ok(SentTx::Sent { tx_id, hash })
    }

    async fn record_sent(
        &self,
        action: ActionType,
        tx_id: TxId,
        signed_hex: &str,
        hash: &str,
    ) -> Result<()> {
        if let Err(e) = self.repo.update_sent(tx_id, signed_hex, hash).await {
            tracing::error!(%tx_id, %hash, error = %e, "{MANUAL_CORRECTION}");
            return Err(CustodyEngineErrorKind::post_broadcast(hash, e).into());
        }

        if matches!(action, ActionType::Deposit | ActionType::Transfer) {
            self.allocate_receiver(tx_id, hash).await?;
        }

        Ok(())
    }

    async fn allocate_receiver(&self, tx_id: TxId, hash: &str) -> Result<()> {
        let outputs = self.repo.fetch_outputs(tx_id).await.map_err(|e| {
            tracing::error!(%tx_id, %hash, error = %e, "{MANUAL_CORRECTION}");
            CustodyEngineErrorKind::post_broadcast(hash, e)
        })?;

        let Some(receiver) = outputs.first() else {
            return Ok(());
        };

        match self.repo.mark_address_allocated(receiver.output_address()).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(address = receiver.output_address(), "receiver address not found");
                Ok(())
            },
            Err(e) => {
                tracing::error!(%tx_id, %hash, error = %e, "{MANUAL_CORRECTION}");
                Err(CustodyEngineErrorKind::post_broadcast(hash, e).into())
            },
        }
    }
}
