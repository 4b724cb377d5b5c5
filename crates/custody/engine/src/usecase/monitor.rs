use custody_domain::{
    account::AccountKind,
    tx::{ActionType, TxStatus},
};

use crate::{
    CustodyEngine,
    error::{CustodyEngineErrorKind, Result},
    node::{TxInspector, UnspentSource},
    repository::TxRepository,
    types::response::{AccountBalance, MonitorReport},
};

const MONITORED_ACCOUNTS: [AccountKind; 4] =
    [AccountKind::Client, AccountKind::Deposit, AccountKind::Payment, AccountKind::Stored];

impl<N, R> CustodyEngine<N, R>
where
    N: TxInspector,
    R: TxRepository,
{
    /// Moves sent transactions with enough confirmations to `done`, then every `done`
    /// transaction to `notified`.
    ///
    /// A hash that cannot be processed is logged and skipped.
    #[tracing::instrument(skip_all)]
    pub async fn monitor_txs(&self) -> Result<MonitorReport> {
        let mut report = MonitorReport::default();

        for action in ActionType::ALL {
            self.confirm_sent(action, &mut report).await?;
        }

        for action in ActionType::ALL {
            self.notify_done(action, &mut report).await?;
        }

        Ok(report)
    }

    #[tracing::instrument(skip_all, fields(%action))]
    async fn confirm_sent(&self, action: ActionType, report: &mut MonitorReport) -> Result<()> {
        let hashes = self
            .repo
            .fetch_hashes_by_status(action, TxStatus::Sent)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        let threshold = self.settings.confirmation_num();

        for hash in hashes {
            let confirmations = match self.node.confirmations(&hash).await {
                Ok(confirmations) => confirmations,
                Err(e) => {
                    tracing::warn!(%hash, error = %e, "failed to fetch confirmations");
                    report.failure(action, hash, e);
                    continue;
                },
            };

            if confirmations < threshold {
                tracing::debug!(%hash, confirmations, threshold, "not yet confirmed");
                continue;
            }

            match self.repo.update_status_by_hash(action, &hash, TxStatus::Done).await {
                Ok(()) => {
                    tracing::info!(%hash, confirmations, "tx done");
                    report.done(action, hash);
                },
                Err(e) => {
                    tracing::error!(%hash, error = %e, "failed to mark tx done");
                    report.failure(action, hash, e);
                },
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(%action))]
    async fn notify_done(&self, action: ActionType, report: &mut MonitorReport) -> Result<()> {
        let hashes = self
            .repo
            .fetch_hashes_by_status(action, TxStatus::Done)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        for hash in hashes {
            let notified = match action {
                ActionType::Payment => self.complete_payment(action, &hash).await,
                _ => self
                    .repo
                    .update_status_by_hash(action, &hash, TxStatus::Notified)
                    .await
                    .map_err(|e| CustodyEngineErrorKind::repository(e).into()),
            };

            match notified {
                Ok(()) => {
                    tracing::info!(%hash, "tx notified");
                    report.notified(action, hash);
                },
                Err(e) => {
                    tracing::error!(%hash, error = %e, "failed to notify tx");
                    report.failure(action, hash, e);
                },
            }
        }

        Ok(())
    }

    async fn complete_payment(&self, action: ActionType, hash: &str) -> Result<()> {
        let tx_id = self
            .repo
            .fetch_tx_id_by_hash(action, hash)
            .await
            .map_err(CustodyEngineErrorKind::repository)?
            .ok_or_else(|| CustodyEngineErrorKind::not_found(format!("payment tx {hash}")))?;

        let completed = self
            .repo
            .complete_payment(tx_id)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        tracing::info!(%tx_id, completed, "payment requests completed");

        Ok(())
    }
}

impl<N, R> CustodyEngine<N, R>
where
    N: UnspentSource,
{
    /// Logs and returns the spendable balance of every custody account.
    #[tracing::instrument(skip_all)]
    pub async fn monitor_balances(&self) -> Result<Vec<AccountBalance>> {
        let mut balances = Vec::with_capacity(MONITORED_ACCOUNTS.len());

        for account in MONITORED_ACCOUNTS {
            let balance = self
                .node
                .balance_by_account(account, self.settings.confirmation_num())
                .await
                .map_err(CustodyEngineErrorKind::node)?;

            tracing::info!(%account, %balance, "balance");
            balances.push(AccountBalance::new(account, balance));
        }

        Ok(balances)
    }
}
