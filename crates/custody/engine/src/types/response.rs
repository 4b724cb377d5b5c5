//! Response types for custody engine operations.

use std::path::PathBuf;

use custody_domain::{
    account::AccountKind,
    amount::Amount,
    tx::{ActionType, TxId},
};
use dissolve_derive::Dissolve;

use crate::file::{PrevTxContext, TxFileName};

/// Outcome of building an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedTx {
    /// The transaction was recorded and its hand-off file written.
    Created {
        /// The new record
        tx_id: TxId,
        /// The unsigned transaction hex
        hex: String,
        /// The hand-off file
        path: PathBuf,
    },

    /// The same unsigned transaction is already recorded; no file was written.
    Duplicate {
        /// The unsigned transaction hex
        hex: String,
    },

    /// There is nothing to spend or nothing to pay.
    NothingToDo,
}

/// Outcome of broadcasting a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentTx {
    /// The node accepted the transaction.
    Sent {
        /// The record
        tx_id: TxId,
        /// The broadcast hash
        hash: String,
    },

    /// The node already knows the transaction.
    AlreadySent {
        /// The record
        tx_id: TxId,
        /// The hash the node knows it by
        hash: String,
    },
}

/// Outcome of a batch where single records may fail without stopping the rest.
#[derive(Debug, Default, Clone, PartialEq, Eq, Dissolve)]
pub struct BatchReport {
    /// Ids of the records that were processed
    succeeded: Vec<i64>,

    /// Ids of the records that failed, with the reason
    failed: Vec<(i64, String)>,
}

/// Outcome of one confirmation monitor sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq, Dissolve)]
pub struct MonitorReport {
    /// Hashes that reached the confirmation threshold
    done: Vec<(ActionType, String)>,

    /// Hashes that were notified
    notified: Vec<(ActionType, String)>,

    /// Hashes that could not be processed, with the reason
    failed: Vec<(ActionType, String, String)>,
}

/// Balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Dissolve)]
pub struct AccountBalance {
    /// The account
    account: AccountKind,

    /// Its spendable balance
    balance: Amount,
}

/// Everything an offline signer needs from an unsigned hand-off file.
#[derive(Debug, Clone, PartialEq, Eq, Dissolve)]
pub struct UnsignedTxFile {
    /// The parsed file name
    name: TxFileName,

    /// The unsigned transaction hex
    hex: String,

    /// The signing context, if present
    context: Option<PrevTxContext>,
}

impl BatchReport {
    pub(crate) fn success(&mut self, id: i64) {
        self.succeeded.push(id);
    }

    pub(crate) fn failure(&mut self, id: i64, reason: impl ToString) {
        self.failed.push((id, reason.to_string()));
    }

    /// Returns the processed ids.
    pub fn succeeded(&self) -> &[i64] {
        &self.succeeded
    }

    /// Returns the failed ids with their reason.
    pub fn failed(&self) -> &[(i64, String)] {
        &self.failed
    }
}

impl MonitorReport {
    pub(crate) fn done(&mut self, action: ActionType, hash: String) {
        self.done.push((action, hash));
    }

    pub(crate) fn notified(&mut self, action: ActionType, hash: String) {
        self.notified.push((action, hash));
    }

    pub(crate) fn failure(&mut self, action: ActionType, hash: String, reason: impl ToString) {
        self.failed.push((action, hash, reason.to_string()));
    }

    /// Returns the hashes moved to done.
    pub fn done_hashes(&self) -> &[(ActionType, String)] {
        &self.done
    }

    /// Returns the hashes moved to notified.
    pub fn notified_hashes(&self) -> &[(ActionType, String)] {
        &self.notified
    }

    /// Returns the hashes that failed.
    pub fn failed(&self) -> &[(ActionType, String, String)] {
        &self.failed
    }
}

impl AccountBalance {
    pub(crate) fn new(account: AccountKind, balance: Amount) -> Self {
        Self { account, balance }
    }

    /// Returns the account.
    pub fn account(&self) -> AccountKind {
        self.account
    }

    /// Returns the balance.
    pub fn balance(&self) -> Amount {
        self.balance
    }
}

impl UnsignedTxFile {
    pub(crate) fn new(name: TxFileName, hex: String, context: Option<PrevTxContext>) -> Self {
        Self { name, hex, context }
    }

    /// Returns the parsed file name.
    pub fn name(&self) -> &TxFileName {
        &self.name
    }

    /// Returns the unsigned hex.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Returns the signing context.
    pub fn context(&self) -> Option<&PrevTxContext> {
        self.context.as_ref()
    }
}
