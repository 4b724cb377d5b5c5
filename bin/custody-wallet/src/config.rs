//! Configuration of the custody wallet binary.
//!
//! The embedded `base_config.ron` is layered under environment variables prefixed with
//! `CUSTODY_`. Nested keys are separated by double underscores, so
//! `CUSTODY_DB__DB_URL` overrides `db.db_url` and `CUSTODY_WALLET__FEE__ADJUSTMENT_MAX`
//! overrides `wallet.fee.adjustment_max`.

use core::{num::NonZeroUsize, time::Duration};
use std::path::PathBuf;

use config::{ConfigError, Environment, File, FileFormat};
use custody_domain::account::AccountKind;
use serde::Deserialize;

/// Loads the configuration from the base config and environment variables.
///
/// # Errors
///
/// If the configuration could not be loaded or parsed
pub fn get_configuration() -> Result<Config, ConfigError> {
    config::Config::builder()
        .add_source(File::from_str(include_str!("base_config.ron"), FileFormat::Ron))
        .add_source(
            Environment::with_prefix(Config::CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

/// Root configuration.
#[derive(Deserialize)]
pub struct Config {
    /// Database configuration
    pub db: DbConfig,

    /// Node RPC configuration
    pub bitcoind: BitcoindConfig,

    /// Custody workflow settings
    pub wallet: WalletConfig,
}

/// Database configuration settings.
#[derive(Deserialize)]
pub struct DbConfig {
    /// The database connection URL
    pub db_url: String,

    /// Maximum number of database connections in the pool
    pub max_conn: NonZeroUsize,
}

/// Node RPC configuration settings.
#[derive(Deserialize)]
pub struct BitcoindConfig {
    /// The wallet RPC endpoint, e.g. `http://127.0.0.1:18332/wallet/watch`
    pub url: String,

    /// RPC user
    pub user: String,

    /// RPC password
    pub password: String,

    /// Request timeout duration
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Chain the node must run on: `main`, `test`, `signet` or `regtest`
    pub network: String,
}

/// Custody workflow settings.
#[derive(Deserialize)]
pub struct WalletConfig {
    /// Coin code written to key files
    pub coin: String,

    /// Minimum confirmations to spend an output and to consider a transaction done
    pub confirmation_num: u64,

    /// Fee multiplier bounds
    pub fee: FeeConfig,

    /// The account client funds are swept into
    pub deposit_receiver: AccountKind,

    /// The account paying payment requests
    pub payment_sender: AccountKind,

    /// N-of-M policy of created multisig addresses
    pub multisig: MultisigConfig,

    /// Base directory of hand-off files
    pub file_dir: PathBuf,
}

/// Bounds of operator supplied fee multipliers.
#[derive(Deserialize)]
pub struct FeeConfig {
    /// Lowest accepted multiplier
    pub adjustment_min: f64,

    /// Highest accepted multiplier
    pub adjustment_max: f64,
}

/// N-of-M multisig policy.
#[derive(Deserialize)]
pub struct MultisigConfig {
    /// Required signatures
    pub required: u8,

    /// Total keys
    pub total: u8,
}

impl Config {
    const CONFIG_ENV_PREFIX: &str = "CUSTODY";
}
