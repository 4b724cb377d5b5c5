//! The multisig key exchange between the keygen and sign roles, and the watch role's
//! address import.

use std::path::{Path, PathBuf};

use custody_domain::{
    account::AccountKind,
    address::AddressRecord,
    multisig::{MultisigAddress, validate_public_key},
};

use crate::{
    CustodyEngine,
    error::{CustodyEngineErrorKind, Result},
    keyfile::{AddressLine, KeyLine, MultisigLine, PubkeyLine},
    node::{AddressBook, MultisigNode},
    repository::{AddressRepository, MultisigRepository},
    types::{
        request::{AddMultisigAddressesRequest, AddMultisigAddressesRequestDissolved},
        response::BatchReport,
    },
};

impl<N, R> CustodyEngine<N, R> {
    fn read_key_file<L: KeyLine>(
        &self,
        path: impl AsRef<Path>,
        account: AccountKind,
    ) -> Result<Vec<L>> {
        let (file_account, lines) =
            self.key_files.read::<L>(path).map_err(CustodyEngineErrorKind::from)?;

        if file_account != account {
            return Err(CustodyEngineErrorKind::invalid_request(format!(
                "file belongs to {file_account}, expected {account}"
            ))
            .into());
        }

        Ok(lines)
    }
}

impl<N, R> CustodyEngine<N, R>
where
    N: AddressBook,
    R: AddressRepository,
{
    /// Stores the addresses of a key file and adds them to the node's watch-only address
    /// book. A node failure for one address is logged and skipped.
    ///
    /// The report lists key indexes.
    #[tracing::instrument(skip_all, fields(%account))]
    pub async fn import_addresses(
        &self,
        path: impl AsRef<Path>,
        account: AccountKind,
    ) -> Result<BatchReport> {
        let records: Vec<AddressRecord<()>> = self
            .read_key_file::<AddressLine>(path, account)?
            .into_iter()
            .map(AddressLine::into_record)
            .collect();

        if let Some(record) = records.iter().find(|record| record.account() != account) {
            return Err(CustodyEngineErrorKind::invalid_request(format!(
                "address of {} in a {account} file",
                record.account()
            ))
            .into());
        }

        let inserted = self
            .repo
            .save_addresses(&records)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        tracing::info!(inserted, total = records.len(), "addresses stored");

        let mut report = BatchReport::default();

        for record in &records {
            let key_index = i64::from(record.key_index());

            match self.node.import_address(record.wallet_address(), account, false).await {
                Ok(()) => report.success(key_index),
                Err(e) => {
                    tracing::warn!(
                        address = record.wallet_address(),
                        error = %e,
                        "failed to import address"
                    );
                    report.failure(key_index, e);
                },
            }
        }

        Ok(report)
    }
}

impl<N, R> CustodyEngine<N, R>
where
    R: AddressRepository,
{
    /// Writes the public keys of `account` not exported yet and flags them exported.
    ///
    /// Returns `None` when there is nothing to export.
    #[tracing::instrument(skip_all, fields(%account))]
    pub async fn export_pubkeys(&self, account: AccountKind) -> Result<Option<PathBuf>> {
        if !account.is_multisig() {
            return Err(CustodyEngineErrorKind::invalid_request(format!(
                "{account} account does not use multisig addresses"
            ))
            .into());
        }

        let records = self
            .repo
            .fetch_unexported_pubkeys(account)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        if records.is_empty() {
            tracing::info!("no public keys to export");
            return Ok(None);
        }

        let lines: Vec<PubkeyLine> = records
            .iter()
            .map(|record| {
                PubkeyLine::builder()
                    .coin(self.settings.coin().to_owned())
                    .account(account)
                    .full_public_key(record.full_public_key().to_owned())
                    .build()
            })
            .collect();

        let path = self.key_files.write(account, &lines).map_err(CustodyEngineErrorKind::from)?;

        let keys: Vec<String> =
            records.iter().map(|record| record.full_public_key().to_owned()).collect();

        let exported = self
            .repo
            .mark_pubkeys_exported(&keys)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        tracing::info!(exported, path = %path.display(), "public keys exported");

        Ok(Some(path))
    }

    /// Attaches the multisig addresses of a file written by the sign role to the address
    /// records they were built from.
    ///
    /// A line without a multisig address, or one that would replace a different address,
    /// is logged and skipped. The report lists 1-based line numbers.
    #[tracing::instrument(skip_all, fields(%account))]
    pub async fn import_multisig_addresses(
        &self,
        path: impl AsRef<Path>,
        account: AccountKind,
    ) -> Result<BatchReport> {
        let lines = self.read_key_file::<MultisigLine>(path, account)?;

        let mut report = BatchReport::default();

        for (line_no, line) in (1..).zip(lines) {
            let (Some(address), Some(redeem_script)) =
                (line.multisig_address(), line.redeem_script())
            else {
                tracing::warn!(line_no, "multisig address not populated");
                report.failure(line_no, "multisig address not populated");
                continue;
            };

            let multisig = MultisigAddress::builder()
                .address(address.to_owned())
                .redeem_script(redeem_script.to_owned())
                .build();

            if let Err(e) = multisig.validate() {
                tracing::warn!(line_no, error = %e, "invalid multisig address");
                report.failure(line_no, e);
                continue;
            }

            match self.repo.update_multisig_address(line.full_public_key(), &multisig).await {
                Ok(()) => report.success(line_no),
                Err(e) => {
                    tracing::warn!(line_no, error = %e, "failed to store multisig address");
                    report.failure(line_no, e);
                },
            }
        }

        tracing::info!(
            imported = report.succeeded().len(),
            failed = report.failed().len(),
            "multisig addresses imported"
        );

        Ok(report)
    }
}

impl<N, R> CustodyEngine<N, R>
where
    R: MultisigRepository,
{
    /// Stores a pending multisig history for every public key of a file written by the
    /// keygen role. Returns the number of new histories.
    ///
    /// The whole file is refused if any key is malformed.
    #[tracing::instrument(skip_all, fields(%account))]
    pub async fn import_pubkeys(
        &self,
        path: impl AsRef<Path>,
        account: AccountKind,
    ) -> Result<usize> {
        let lines = self.read_key_file::<PubkeyLine>(path, account)?;

        let mut keys = Vec::with_capacity(lines.len());
        for line in &lines {
            if line.account() != account {
                return Err(CustodyEngineErrorKind::invalid_request(format!(
                    "public key of {} in a {account} file",
                    line.account()
                ))
                .into());
            }

            validate_public_key(line.full_public_key()).map_err(CustodyEngineErrorKind::from)?;
            keys.push(line.full_public_key().to_owned());
        }

        let saved = self
            .repo
            .save_multisig_histories(account, &keys)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        tracing::info!(saved, total = keys.len(), "public keys imported");

        Ok(saved)
    }

    /// Writes the completed histories of `account` not exported yet and flags them
    /// exported.
    ///
    /// Returns `None` when there is nothing to export.
    #[tracing::instrument(skip_all, fields(%account))]
    pub async fn export_multisig_addresses(&self, account: AccountKind) -> Result<Option<PathBuf>> {
        let histories = self
            .repo
            .fetch_unexported_multisig_histories(account)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        if histories.is_empty() {
            tracing::info!("no multisig addresses to export");
            return Ok(None);
        }

        let ids: Vec<i64> = histories.iter().map(|history| history.id()).collect();
        let lines: Vec<MultisigLine> = histories.into_iter().map(MultisigLine::from).collect();

        let path = self.key_files.write(account, &lines).map_err(CustodyEngineErrorKind::from)?;

        let exported = self
            .repo
            .mark_multisig_histories_exported(&ids)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        tracing::info!(exported, path = %path.display(), "multisig addresses exported");

        Ok(Some(path))
    }
}

impl<N, R> CustodyEngine<N, R>
where
    N: MultisigNode,
    R: MultisigRepository,
{
    /// Creates a multisig address on the node for every pending history of the account,
    /// from the imported key and the authorization role's own address.
    ///
    /// A rejected key or a failed history update is logged and skipped; the report lists
    /// history ids.
    #[tracing::instrument(skip_all)]
    pub async fn add_multisig_addresses(
        &self,
        request: AddMultisigAddressesRequest,
    ) -> Result<BatchReport> {
        let AddMultisigAddressesRequestDissolved { account, auth_address } = request.dissolve();

        let histories = self
            .repo
            .fetch_pending_multisig_histories(account)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        let policy = self.settings.policy();
        let label = format!("multi_{account}");

        let mut report = BatchReport::default();

        for history in histories {
            let id = history.id();
            let keys = [history.full_public_key().to_owned(), auth_address.clone()];

            let created = self.node.add_multisig_address(policy.required(), &keys, &label).await;
            let multisig = match created {
                Ok(multisig) => multisig,
                Err(e) => {
                    tracing::warn!(id, error = %e, "node refused multisig address");
                    report.failure(id, e);
                    continue;
                },
            };

            if let Err(e) = multisig.validate() {
                tracing::warn!(id, error = %e, "node returned an invalid multisig address");
                report.failure(id, e);
                continue;
            }

            match self.repo.update_multisig_history(id, &auth_address, &multisig).await {
                Ok(true) => {
                    tracing::info!(id, address = multisig.address(), "multisig address created");
                    report.success(id);
                },
                Ok(false) => report.failure(id, "history is already complete"),
                Err(e) => {
                    tracing::error!(
                        id,
                        address = multisig.address(),
                        error = %e,
                        "multisig address created but not recorded"
                    );
                    report.failure(id, e);
                },
            }
        }

        Ok(report)
    }
}
