#![allow(missing_docs)]

mod error;
mod fee;
mod output;
mod selector;
mod settings;
mod types;
mod usecase;

pub mod file;
pub mod keyfile;
pub mod node;
pub mod repository;

pub use self::{
    error::{BoxError, CustodyEngineError, CustodyEngineErrorKind, Result},
    fee::FeeCalculator,
    output::{
        Destination, FeeApplied, PlannedOutput, apply_fee, build_payment_outputs,
        build_transfer_outputs,
    },
    selector::{Selection, select_unspents},
    settings::EngineSettings,
    types::{request, response},
};

use self::{file::TxFileStore, keyfile::KeyFileStore};

/// Runs the custody workflow steps of every role against a node and a repository.
///
/// Each role only needs a subset of the capabilities; the bounds live on the individual
/// operations.
pub struct CustodyEngine<N, R> {
    node: N,
    repo: R,
    tx_files: TxFileStore,
    key_files: KeyFileStore,
    fee: FeeCalculator,
    settings: EngineSettings,
}

impl<N, R> CustodyEngine<N, R> {
    pub fn new(node: N, repo: R, settings: EngineSettings) -> Self {
        Self {
            node,
            repo,
            tx_files: TxFileStore::new(settings.tx_file_dir()),
            key_files: KeyFileStore::new(settings.key_file_dir()),
            fee: FeeCalculator::new(settings.fee_range()),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn tx_files(&self) -> &TxFileStore {
        &self.tx_files
    }

    pub fn key_files(&self) -> &KeyFileStore {
        &self.key_files
    }
}
