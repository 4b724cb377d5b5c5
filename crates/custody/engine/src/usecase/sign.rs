//! File handling of the offline signer. Signing itself happens outside the engine.

use std::path::{Path, PathBuf};

use custody_domain::tx::TxStatus;

use crate::{
    CustodyEngine,
    error::{CustodyEngineErrorKind, Result},
    file::{TxFileBody, TxFileBodyDissolved, TxFileName, TxFileStore},
    types::response::UnsignedTxFile,
};

impl<N, R> CustodyEngine<N, R> {
    /// Reads a file a signer has to sign: an unsigned file, or a signed file still missing
    /// signatures under the configured policy.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_unsigned_tx(&self, path: impl AsRef<Path>) -> Result<UnsignedTxFile> {
        let path = path.as_ref();

        let name = TxFileName::from_path(path).map_err(CustodyEngineErrorKind::from)?;

        let expected = if name.status() == TxStatus::Signed
            && name.signed_count() < self.settings.policy().required()
        {
            TxStatus::Signed
        } else {
            TxStatus::Unsigned
        };

        let (name, body) =
            self.tx_files.read(path, expected).map_err(CustodyEngineErrorKind::from)?;

        let TxFileBodyDissolved { hex, context } = body.dissolve();

        Ok(UnsignedTxFile::new(name, hex, context))
    }

    /// Writes the hand-back file for `signed_hex`, keeping the signing context for any
    /// further signer.
    #[tracing::instrument(skip_all, fields(file = %unsigned.name(), signed_count = signed_count))]
    pub fn write_signed_tx(
        &self,
        unsigned: &UnsignedTxFile,
        signed_hex: String,
        signed_count: u8,
    ) -> Result<PathBuf> {
        if signed_hex.trim() == unsigned.hex() {
            return Err(CustodyEngineErrorKind::NotSigned.into());
        }

        let name = TxFileStore::signed_file_name(unsigned.name(), signed_count);
        let body = TxFileBody::builder()
            .hex(signed_hex.trim().to_owned())
            .maybe_context(unsigned.context().cloned())
            .build();

        self.tx_files.write(&name, &body).map_err(|e| CustodyEngineErrorKind::from(e).into())
    }
}
