use std::fs;

use bitcoin::Network;
use custody_bitcoind_client::BitcoindClient;
use custody_engine::{
    CustodyEngine,
    request::{
        AddMultisigAddressesRequest, CancelTxRequest, CreateDepositTxRequest,
        CreatePaymentTxRequest, CreateTransferTxRequest,
    },
    response::{BatchReport, CreatedTx, SentTx},
};
use custody_store::CustodyStore;

use crate::cli::{
    CreateCommand, KeygenCommand, KeygenExportCommand, KeygenImportCommand, MonitorCommand, Role,
    SignCommand, SignCreateCommand, SignExportCommand, SignImportCommand, TxFileCommand,
    WatchCommand, WatchImportCommand,
};

pub type Engine = CustodyEngine<BitcoindClient, CustodyStore>;

/// Runs one workflow step.
///
/// The node's chain is checked before any step that talks to it.
pub async fn run(role: Role, engine: &Engine, network: Network) -> anyhow::Result<()> {
    match role {
        Role::Watch(command) => {
            engine.node().ensure_network(network).await?;
            watch(command, engine).await
        },
        Role::Keygen(command) => keygen(command, engine).await,
        Role::Sign(command) => sign(command, engine, network).await,
    }
}

async fn watch(command: WatchCommand, engine: &Engine) -> anyhow::Result<()> {
    match command {
        WatchCommand::Create(command) => {
            let created = match command {
                CreateCommand::Deposit(args) => {
                    let request =
                        CreateDepositTxRequest::builder().maybe_adjustment(args.fee).build();
                    engine.create_deposit_tx(request).await?
                },
                CreateCommand::Payment(args) => {
                    let request =
                        CreatePaymentTxRequest::builder().maybe_adjustment(args.fee).build();
                    engine.create_payment_tx(request).await?
                },
                CreateCommand::Transfer { from, to, amount, fee } => {
                    let request = CreateTransferTxRequest::builder()
                        .sender(from)
                        .receiver(to)
                        .maybe_amount(amount)
                        .maybe_adjustment(fee.fee)
                        .build()?;
                    engine.create_transfer_tx(request).await?
                },
            };
            log_created(&created);
        },
        WatchCommand::ImportSigned { file } => {
            let tx_id = engine.import_signed_tx(&file).await?;
            tracing::info!(%tx_id, "signed tx stored");
        },
        WatchCommand::Send { file } => match engine.send_tx(&file).await? {
            SentTx::Sent { tx_id, hash } => tracing::info!(%tx_id, %hash, "tx sent"),
            SentTx::AlreadySent { tx_id, hash } => {
                tracing::info!(%tx_id, %hash, "tx was already sent");
            },
        },
        WatchCommand::Monitor(MonitorCommand::Txs) => {
            let report = engine.monitor_txs().await?;
            tracing::info!(
                done = report.done_hashes().len(),
                notified = report.notified_hashes().len(),
                failed = report.failed().len(),
                "monitor sweep finished"
            );
        },
        WatchCommand::Monitor(MonitorCommand::Balance) => {
            engine.monitor_balances().await?;
        },
        WatchCommand::Cancel { action, id } => {
            let request = CancelTxRequest::builder().action(action).tx_id(id.into()).build();
            engine.cancel_tx(request).await?;
            tracing::info!(%action, id, "tx canceled");
        },
        WatchCommand::Import(WatchImportCommand::Address(args)) => {
            let report = engine.import_addresses(&args.file, args.account).await?;
            log_report("addresses imported", &report);
        },
    }

    Ok(())
}

async fn keygen(command: KeygenCommand, engine: &Engine) -> anyhow::Result<()> {
    match command {
        KeygenCommand::Export(KeygenExportCommand::Pubkey(args)) => {
            match engine.export_pubkeys(args.account).await? {
                Some(path) => tracing::info!(path = %path.display(), "public keys exported"),
                None => tracing::info!(account = %args.account, "no public keys to export"),
            }
        },
        KeygenCommand::Import(KeygenImportCommand::Multisig(args)) => {
            let report = engine.import_multisig_addresses(&args.file, args.account).await?;
            log_report("multisig addresses imported", &report);
        },
        KeygenCommand::Tx(command) => tx_file(command, engine)?,
    }

    Ok(())
}

async fn sign(command: SignCommand, engine: &Engine, network: Network) -> anyhow::Result<()> {
    match command {
        SignCommand::Import(SignImportCommand::Pubkey(args)) => {
            let imported = engine.import_pubkeys(&args.file, args.account).await?;
            tracing::info!(imported, account = %args.account, "public keys imported");
        },
        SignCommand::Create(SignCreateCommand::Multisig { account, auth_address }) => {
            engine.node().ensure_network(network).await?;

            let request = AddMultisigAddressesRequest::builder()
                .account(account.account)
                .auth_address(auth_address)
                .build()?;
            let report = engine.add_multisig_addresses(request).await?;
            log_report("multisig addresses created", &report);
        },
        SignCommand::Export(SignExportCommand::Multisig(args)) => {
            match engine.export_multisig_addresses(args.account).await? {
                Some(path) => {
                    tracing::info!(path = %path.display(), "multisig addresses exported");
                },
                None => {
                    tracing::info!(account = %args.account, "no multisig addresses to export");
                },
            }
        },
        SignCommand::Tx(command) => tx_file(command, engine)?,
    }

    Ok(())
}

fn tx_file(command: TxFileCommand, engine: &Engine) -> anyhow::Result<()> {
    match command {
        TxFileCommand::Show { file } => {
            let unsigned = engine.read_unsigned_tx(&file)?;

            println!("{}", unsigned.hex());
            if let Some(context) = unsigned.context() {
                println!("{}", serde_json::to_string_pretty(context)?);
            }
        },
        TxFileCommand::Sign { file, signed_hex_file, signed_count } => {
            let unsigned = engine.read_unsigned_tx(&file)?;
            let signed_hex = fs::read_to_string(&signed_hex_file)?;

            let path =
                engine.write_signed_tx(&unsigned, signed_hex.trim().to_owned(), signed_count)?;
            tracing::info!(path = %path.display(), "signed tx written");
        },
    }

    Ok(())
}

fn log_created(created: &CreatedTx) {
    match created {
        CreatedTx::Created { tx_id, path, .. } => {
            tracing::info!(%tx_id, path = %path.display(), "unsigned tx created");
        },
        CreatedTx::Duplicate { .. } => tracing::info!("unsigned tx already exists"),
        CreatedTx::NothingToDo => tracing::info!("nothing to do"),
    }
}

fn log_report(message: &str, report: &BatchReport) {
    tracing::info!(
        succeeded = report.succeeded().len(),
        failed = report.failed().len(),
        "{message}"
    );

    for (id, reason) in report.failed() {
        tracing::warn!(id, %reason, "skipped");
    }
}
