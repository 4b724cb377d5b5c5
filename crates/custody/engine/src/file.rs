//! Hand-off files carrying transactions across the air gap.
//!
//! A file is named after the record it belongs to (see [`TxFileName`]) and holds the raw
//! transaction hex, optionally followed by the signing context (see [`TxFileBody`]).
//! Files are never overwritten.

mod context;
mod error;
mod name;

pub use self::{
    context::{
        PrevTx, PrevTxContext, PrevTxContextDissolved, PrevTxDissolved, TxFileBody,
        TxFileBodyDissolved,
    },
    error::FileProtocolError,
    name::TxFileName,
};

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use custody_domain::tx::TxStatus;

/// Reads and writes hand-off files under one base directory.
#[derive(Debug, Clone)]
pub struct TxFileStore {
    dir: PathBuf,
}

impl TxFileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the base directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `body` under `name` and returns the path written.
    #[tracing::instrument(skip_all, fields(file = %name))]
    pub fn write(
        &self,
        name: &TxFileName,
        body: &TxFileBody,
    ) -> Result<PathBuf, FileProtocolError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(name.to_string());
        let contents = body.encode()?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(FileProtocolError::AlreadyExists(path));
            },
            Err(e) => return Err(e.into()),
        };

        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        tracing::info!(path = %path.display(), "hand-off file written");

        Ok(path)
    }

    /// Reads the file at `path`, refusing it unless its name is tagged `expected_status`.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read(
        &self,
        path: impl AsRef<Path>,
        expected_status: TxStatus,
    ) -> Result<(TxFileName, TxFileBody), FileProtocolError> {
        let path = path.as_ref();

        let name = TxFileName::from_path(path)?;
        name.expect_status(expected_status)?;

        let body = TxFileBody::decode(&fs::read_to_string(path)?)?;

        Ok((name, body))
    }

    /// Returns the name a signer gives to the file it hands back.
    pub fn signed_file_name(unsigned: &TxFileName, signed_count: u8) -> TxFileName {
        TxFileName::now(unsigned.action(), unsigned.tx_id(), TxStatus::Signed, signed_count)
    }
}

#[cfg(test)]
mod tests {
    use custody_domain::tx::{ActionType, TxId, TxStatus};

    use super::{FileProtocolError, TxFileBody, TxFileName, TxFileStore};

    fn unsigned_name() -> TxFileName {
        TxFileName::builder()
            .action(ActionType::Transfer)
            .tx_id(TxId::from(5))
            .status(TxStatus::Unsigned)
            .timestamp_nanos(1)
            .build()
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = TxFileStore::new(dir.path().join("tx"));
        let body = TxFileBody::hex_only("0200ff".into());

        let path = store.write(&unsigned_name(), &body).unwrap();
        let (name, read) = store.read(&path, TxStatus::Unsigned).unwrap();

        assert_eq!(name, unsigned_name());
        assert_eq!(read, body);
    }

    #[test]
    fn never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = TxFileStore::new(dir.path());
        let body = TxFileBody::hex_only("0200ff".into());

        store.write(&unsigned_name(), &body).unwrap();
        let err = store.write(&unsigned_name(), &body).unwrap_err();

        assert!(matches!(err, FileProtocolError::AlreadyExists(_)));
    }

    #[test]
    fn read_refuses_unexpected_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = TxFileStore::new(dir.path());

        let path = store.write(&unsigned_name(), &TxFileBody::hex_only("00".into())).unwrap();

        assert!(matches!(
            store.read(&path, TxStatus::Signed).unwrap_err(),
            FileProtocolError::UnexpectedStatus { .. }
        ));
    }

    #[test]
    fn signed_name_keeps_identity() {
        let signed = TxFileStore::signed_file_name(&unsigned_name(), 2);

        assert_eq!(signed.action(), ActionType::Transfer);
        assert_eq!(signed.tx_id(), TxId::from(5));
        assert_eq!(signed.status(), TxStatus::Signed);
        assert_eq!(signed.signed_count(), 2);
    }
}
