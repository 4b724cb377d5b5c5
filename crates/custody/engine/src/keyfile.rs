//! CSV files exchanged between roles while standing up multisig addresses.
//!
//! Files carry no header. A file is named `{kind}_{account}_{unix_nanos}`.

mod error;
mod line;

pub use self::{
    error::KeyFileError,
    line::{
        AddressLine, KeyFileKind, KeyLine, MultisigLine, MultisigLineDissolved, PubkeyLine,
        PubkeyLineDissolved,
    },
};

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::Utc;
use custody_domain::account::AccountKind;

/// Reads and writes key-exchange files under one base directory.
#[derive(Debug, Clone)]
pub struct KeyFileStore {
    dir: PathBuf,
}

impl KeyFileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `lines` to a new `{kind}_{account}_{unix_nanos}` file and returns its path.
    #[tracing::instrument(skip_all, fields(kind = %L::KIND, %account, lines = lines.len()))]
    pub fn write<L: KeyLine>(
        &self,
        account: AccountKind,
        lines: &[L],
    ) -> Result<PathBuf, KeyFileError> {
        fs::create_dir_all(&self.dir)?;

        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let path = self.dir.join(format!("{}_{account}_{timestamp}", L::KIND));

        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;

        let mut writer =
            csv::WriterBuilder::new().has_headers(false).flexible(true).from_writer(file);

        for line in lines {
            writer.write_record(line.to_fields())?;
        }
        writer.flush()?;

        tracing::info!(path = %path.display(), "key file written");

        Ok(path)
    }

    /// Reads every line of the file at `path`, checking that its name carries the kind of
    /// `L` and returning the account it names.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read<L: KeyLine>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(AccountKind, Vec<L>), KeyFileError> {
        let path = path.as_ref();

        let account = parse_file_name(path, L::KIND)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut lines = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }

            lines.push(L::from_record(&record, idx as u64 + 1)?);
        }

        Ok((account, lines))
    }
}

fn parse_file_name(path: &Path, kind: KeyFileKind) -> Result<AccountKind, KeyFileError> {
    let invalid = || KeyFileError::InvalidFileName(path.display().to_string());

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.split_once('.').map_or(name, |(stem, _)| stem))
        .ok_or_else(invalid)?;

    let tokens: Vec<&str> = name.split('_').collect();
    let [file_kind, account, timestamp] = tokens[..] else {
        return Err(invalid());
    };

    if KeyFileKind::from_str(file_kind).ok() != Some(kind) || timestamp.parse::<i64>().is_err() {
        return Err(invalid());
    }

    AccountKind::from_str(account).map_err(|_| invalid())
}
