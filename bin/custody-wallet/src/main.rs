//! # Custody wallet
//!
//! One binary serves the three custody roles. Each invocation runs a single workflow step
//! and exits:
//!
//! ```bash
//! # online watch role
//! custody-wallet watch create deposit --fee 1.2
//! custody-wallet watch send ./data/tx/deposit_8_signed_2_1767225600000000000
//! custody-wallet watch monitor txs
//!
//! # offline keygen role
//! custody-wallet keygen export pubkey --account deposit
//! custody-wallet keygen tx show ./deposit_8_unsigned_0_1767225600000000000
//! custody-wallet keygen tx sign ./deposit_8_unsigned_0_1767225600000000000 \
//!     --signed-hex-file signed.hex --signed-count 1
//!
//! # offline authorization role
//! custody-wallet sign import pubkey ./pubkey_deposit_1767225600000000000 --account deposit
//! custody-wallet sign create multisig --account deposit --auth-address 2N...
//! ```
//!
//! Configuration is read from the embedded base config, overridden by `CUSTODY_`
//! environment variables (see [`custody_wallet::config`]).
//!
//! # Logging
//!
//! Logging is controlled via the `RUST_LOG` environment variable. Defaults to `info` level.

use bitcoin::Network;
use clap::Parser;
use custody_bitcoind_client::{BitcoindClient, BitcoindConfig};
use custody_domain::{amount::FeeAdjustmentRange, multisig::MultisigPolicy};
use custody_engine::{CustodyEngine, EngineSettings};
use custody_store::CustodyStore;
use custody_wallet::{cli::Cli, config};
use tokio::{runtime::Builder, task};
use tracing::{Subscriber, subscriber};
use tracing_subscriber::{EnvFilter, Registry, fmt::format::FmtSpan, layer::SubscriberExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    subscriber::set_global_default(make_tracing_subscriber(env_filter))?;

    let rt = Builder::new_current_thread().enable_all().build()?;

    rt.block_on(async {
        let config = task::spawn_blocking(config::get_configuration).await??;
        let network = Network::from_core_arg(&config.bitcoind.network)?;

        let node = {
            let bitcoind_config = BitcoindConfig::builder()
                .url(config.bitcoind.url.parse()?)
                .user(config.bitcoind.user)
                .password(config.bitcoind.password)
                .timeout(config.bitcoind.timeout)
                .build();

            BitcoindClient::new(&bitcoind_config)?
        };

        let store = custody_store::establish_pool(config.db.db_url, config.db.max_conn)
            .await
            .map(CustodyStore::new)?;

        let settings = EngineSettings::builder()
            .coin(config.wallet.coin)
            .confirmation_num(config.wallet.confirmation_num)
            .fee_range(FeeAdjustmentRange::new(
                config.wallet.fee.adjustment_min,
                config.wallet.fee.adjustment_max,
            )?)
            .deposit_receiver(config.wallet.deposit_receiver)
            .payment_sender(config.wallet.payment_sender)
            .policy(
                MultisigPolicy::builder()
                    .required(config.wallet.multisig.required)
                    .total(config.wallet.multisig.total)
                    .build()?,
            )
            .file_dir(config.wallet.file_dir)
            .build();

        let engine = CustodyEngine::new(node, store, settings);

        custody_wallet::run(cli.role, &engine, network).await
    })
}

fn make_tracing_subscriber(env_filter: EnvFilter) -> impl Subscriber {
    Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_line_number(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
        )
        .with(env_filter)
}
