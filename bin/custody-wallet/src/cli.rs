//! Command line of the custody wallet: `custody-wallet <role> <command>`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use custody_domain::{account::AccountKind, amount::Amount, tx::ActionType};

#[derive(Debug, Parser)]
#[clap(name = "custody-wallet", about = "Multisig custody wallet", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub role: Role,
}

#[derive(Debug, Subcommand)]
pub enum Role {
    /// Online role: builds, broadcasts and monitors transactions
    #[clap(subcommand)]
    Watch(WatchCommand),

    /// Offline role holding the receiving keys
    #[clap(subcommand)]
    Keygen(KeygenCommand),

    /// Offline authorization role
    #[clap(subcommand)]
    Sign(SignCommand),
}

#[derive(Debug, Subcommand)]
pub enum WatchCommand {
    /// Build an unsigned transaction and write its hand-off file
    #[clap(subcommand)]
    Create(CreateCommand),

    /// Store a signed hand-off file without broadcasting it
    ImportSigned {
        /// The signed hand-off file
        file: PathBuf,
    },

    /// Broadcast a signed hand-off file
    Send {
        /// The signed hand-off file
        file: PathBuf,
    },

    /// Watch broadcast transactions or account balances
    #[clap(subcommand)]
    Monitor(MonitorCommand),

    /// Abandon a transaction that was not broadcast
    Cancel {
        /// The action of the transaction
        #[clap(long)]
        action: ActionType,

        /// The transaction id
        #[clap(long)]
        id: i64,
    },

    /// Import a key file
    #[clap(subcommand)]
    Import(WatchImportCommand),
}

#[derive(Debug, Subcommand)]
pub enum CreateCommand {
    /// Sweep client funds into the deposit account
    Deposit(FeeArgs),

    /// Pay every pending payment request
    Payment(FeeArgs),

    /// Move funds between custody accounts
    Transfer {
        /// The paying account
        #[clap(long)]
        from: AccountKind,

        /// The receiving account
        #[clap(long)]
        to: AccountKind,

        /// Amount in coin units; omitted sweeps the paying account
        #[clap(long)]
        amount: Option<Amount>,

        #[clap(flatten)]
        fee: FeeArgs,
    },
}

#[derive(Debug, Args)]
pub struct FeeArgs {
    /// Multiplier applied to the estimated fee
    #[clap(long)]
    pub fee: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum MonitorCommand {
    /// Move confirmed transactions to done and notify them
    Txs,

    /// Log the balance of every custody account
    Balance,
}

#[derive(Debug, Subcommand)]
pub enum WatchImportCommand {
    /// Import an address file exported by the keygen role
    Address(AccountFile),
}

#[derive(Debug, Subcommand)]
pub enum KeygenCommand {
    /// Export the public keys of a multisig account
    #[clap(subcommand)]
    Export(KeygenExportCommand),

    /// Import a multisig address file created by the sign role
    #[clap(subcommand)]
    Import(KeygenImportCommand),

    /// Print an unsigned hand-off file, or write its signed hand-back file
    #[clap(subcommand)]
    Tx(TxFileCommand),
}

#[derive(Debug, Subcommand)]
pub enum KeygenExportCommand {
    /// Public keys not exported yet
    Pubkey(AccountArgs),
}

#[derive(Debug, Subcommand)]
pub enum KeygenImportCommand {
    /// Multisig addresses of exported public keys
    Multisig(AccountFile),
}

#[derive(Debug, Subcommand)]
pub enum SignCommand {
    /// Import a public key file exported by the keygen role
    #[clap(subcommand)]
    Import(SignImportCommand),

    /// Create multisig addresses for imported public keys
    #[clap(subcommand)]
    Create(SignCreateCommand),

    /// Export created multisig addresses
    #[clap(subcommand)]
    Export(SignExportCommand),

    /// Print an unsigned hand-off file, or write its signed hand-back file
    #[clap(subcommand)]
    Tx(TxFileCommand),
}

#[derive(Debug, Subcommand)]
pub enum SignImportCommand {
    /// Public keys of a multisig account
    Pubkey(AccountFile),
}

#[derive(Debug, Subcommand)]
pub enum SignCreateCommand {
    /// One multisig address per pending public key
    Multisig {
        #[clap(flatten)]
        account: AccountArgs,

        /// This role's own address, already known to its node
        #[clap(long)]
        auth_address: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SignExportCommand {
    /// Multisig addresses not exported yet
    Multisig(AccountArgs),
}

#[derive(Debug, Subcommand)]
pub enum TxFileCommand {
    /// Print the hex and signing context of an unsigned hand-off file
    Show {
        /// The hand-off file
        file: PathBuf,
    },

    /// Write the hand-back file of a transaction signed elsewhere
    Sign {
        /// The hand-off file that was signed
        file: PathBuf,

        /// File holding the signed transaction hex
        #[clap(long)]
        signed_hex_file: PathBuf,

        /// Number of signatures the signed transaction carries
        #[clap(long)]
        signed_count: u8,
    },
}

#[derive(Debug, Args)]
pub struct AccountArgs {
    /// The account
    #[clap(long)]
    pub account: AccountKind,
}

#[derive(Debug, Args)]
pub struct AccountFile {
    /// The key file
    pub file: PathBuf,

    /// The account of the keys in the file
    #[clap(long)]
    pub account: AccountKind,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use custody_domain::{account::AccountKind, amount::Amount};

    use super::{Cli, CreateCommand, Role, WatchCommand};

    #[test]
    fn command_line_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_transfer() {
        let cli = Cli::parse_from([
            "custody-wallet",
            "watch",
            "create",
            "transfer",
            "--from",
            "stored",
            "--to",
            "payment",
            "--amount",
            "0.5",
            "--fee",
            "1.5",
        ]);

        let Role::Watch(WatchCommand::Create(CreateCommand::Transfer { from, to, amount, fee })) =
            cli.role
        else {
            panic!("unexpected command");
        };

        assert_eq!(from, AccountKind::Stored);
        assert_eq!(to, AccountKind::Payment);
        assert_eq!(amount, Some(Amount::from_sat(50_000_000)));
        assert_eq!(fee.fee, Some(1.5));
    }

    #[test]
    fn rejects_unknown_account() {
        assert!(
            Cli::try_parse_from(["custody-wallet", "keygen", "export", "pubkey", "--account", "x"])
                .is_err()
        );
    }
}
