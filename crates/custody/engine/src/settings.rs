use std::path::PathBuf;

use bon::Builder;
use custody_domain::{
    account::AccountKind,
    amount::FeeAdjustmentRange,
    multisig::MultisigPolicy,
};

/// Settings of a [`CustodyEngine`](crate::CustodyEngine).
#[derive(Debug, Clone, Builder)]
pub struct EngineSettings {
    /// Coin code written to key files.
    #[builder(default = String::from("btc"), into)]
    coin: String,

    /// Minimum confirmations for an output to be spent, and for a sent transaction to be
    /// done.
    #[builder(default = 6)]
    confirmation_num: u64,

    /// Accepted range of operator supplied fee multipliers.
    fee_range: FeeAdjustmentRange,

    /// The account client funds are swept into.
    #[builder(default = AccountKind::Deposit)]
    deposit_receiver: AccountKind,

    /// The account paying payment requests.
    #[builder(default = AccountKind::Payment)]
    payment_sender: AccountKind,

    /// The N-of-M policy of created multisig addresses.
    #[builder(default = MultisigPolicy::TWO_OF_TWO)]
    policy: MultisigPolicy,

    /// Base directory of hand-off files.
    #[builder(into)]
    file_dir: PathBuf,
}

impl EngineSettings {
    /// Returns the coin code.
    pub fn coin(&self) -> &str {
        &self.coin
    }

    /// Returns the confirmation threshold.
    pub fn confirmation_num(&self) -> u64 {
        self.confirmation_num
    }

    /// Returns the fee multiplier range.
    pub fn fee_range(&self) -> FeeAdjustmentRange {
        self.fee_range
    }

    /// Returns the deposit receiver.
    pub fn deposit_receiver(&self) -> AccountKind {
        self.deposit_receiver
    }

    /// Returns the payment sender.
    pub fn payment_sender(&self) -> AccountKind {
        self.payment_sender
    }

    /// Returns the multisig policy.
    pub fn policy(&self) -> MultisigPolicy {
        self.policy
    }

    /// Returns the directory of transaction hand-off files.
    pub fn tx_file_dir(&self) -> PathBuf {
        self.file_dir.join("tx")
    }

    /// Returns the directory of key-exchange files.
    pub fn key_file_dir(&self) -> PathBuf {
        self.file_dir.join("key")
    }
}
