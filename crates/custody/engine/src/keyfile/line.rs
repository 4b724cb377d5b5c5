use core::str::FromStr;

use bon::Builder;
use csv::StringRecord;
use custody_domain::{
    account::AccountKind,
    address::{AddressRecord, AddressRecordDissolved},
    multisig::MultisigHistory,
};
use dissolve_derive::Dissolve;
use strum::{Display, EnumString};

use super::error::KeyFileError;

/// The three kinds of key-exchange file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum KeyFileKind {
    /// Generated addresses, one [`AddressLine`] each.
    Address,
    /// Exported public keys, one [`PubkeyLine`] each.
    Pubkey,
    /// Created multisig addresses, one [`MultisigLine`] each.
    Multisig,
}

/// One line of a key-exchange file.
pub trait KeyLine: Sized {
    /// The file kind holding lines of this type.
    const KIND: KeyFileKind;

    /// Returns the CSV fields of the line.
    fn to_fields(&self) -> Vec<String>;

    /// Parses a CSV record. `line` is used in error messages only.
    fn from_record(record: &StringRecord, line: u64) -> Result<Self, KeyFileError>;
}

/// `coin, account, p2pkh, p2sh_segwit, bech32, full_pubkey, multisig_address,
/// redeem_script, key_index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressLine(AddressRecord<()>);

/// `coin, account, full_pubkey`
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct PubkeyLine {
    coin: String,
    account: AccountKind,
    full_public_key: String,
}

/// `full_pubkey, auth_address1, auth_address2, multisig_address, redeem_script`
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct MultisigLine {
    full_public_key: String,
    auth_address1: Option<String>,
    auth_address2: Option<String>,
    multisig_address: Option<String>,
    redeem_script: Option<String>,
}

impl AddressLine {
    /// Returns the address record.
    pub fn record(&self) -> &AddressRecord<()> {
        &self.0
    }

    /// Returns the address record, consuming the line.
    pub fn into_record(self) -> AddressRecord<()> {
        self.0
    }
}

impl From<AddressRecord<()>> for AddressLine {
    fn from(record: AddressRecord<()>) -> Self {
        Self(record)
    }
}

impl PubkeyLine {
    /// Returns the full public key.
    pub fn full_public_key(&self) -> &str {
        &self.full_public_key
    }

    /// Returns the owning account.
    pub fn account(&self) -> AccountKind {
        self.account
    }
}

impl MultisigLine {
    /// Returns the full public key the multisig address was built from.
    pub fn full_public_key(&self) -> &str {
        &self.full_public_key
    }

    /// Returns the multisig address, if populated.
    pub fn multisig_address(&self) -> Option<&str> {
        self.multisig_address.as_deref()
    }

    /// Returns the redeem script, if populated.
    pub fn redeem_script(&self) -> Option<&str> {
        self.redeem_script.as_deref()
    }
}

impl<AUX> From<MultisigHistory<AUX>> for MultisigLine {
    fn from(history: MultisigHistory<AUX>) -> Self {
        let d = history.dissolve();

        Self {
            full_public_key: d.full_public_key,
            auth_address1: d.auth_address1,
            auth_address2: d.auth_address2,
            multisig_address: d.multisig_address,
            redeem_script: d.redeem_script,
        }
    }
}

impl KeyLine for AddressLine {
    const KIND: KeyFileKind = KeyFileKind::Address;

    fn to_fields(&self) -> Vec<String> {
        let AddressRecordDissolved {
            coin,
            account,
            p2pkh_address,
            p2sh_segwit_address,
            bech32_address,
            full_public_key,
            multisig_address,
            redeem_script,
            key_index,
            ..
        } = self.0.clone().dissolve();

        vec![
            coin,
            account.to_string(),
            p2pkh_address,
            p2sh_segwit_address,
            bech32_address,
            full_public_key,
            multisig_address.unwrap_or_default(),
            redeem_script.unwrap_or_default(),
            key_index.to_string(),
        ]
    }

    fn from_record(record: &StringRecord, line: u64) -> Result<Self, KeyFileError> {
        let fields = Fields { record, line };

        let record = AddressRecord::builder()
            .coin(fields.required(0, "coin")?.to_owned())
            .account(fields.parse(1, "account")?)
            .p2pkh_address(fields.optional(2).unwrap_or_default().to_owned())
            .p2sh_segwit_address(fields.required(3, "p2sh segwit address")?.to_owned())
            .bech32_address(fields.optional(4).unwrap_or_default().to_owned())
            .full_public_key(fields.required(5, "full public key")?.to_owned())
            .maybe_multisig_address(fields.optional(6).map(ToOwned::to_owned))
            .maybe_redeem_script(fields.optional(7).map(ToOwned::to_owned))
            .key_index(fields.parse(8, "key index")?)
            .aux(())
            .build();

        Ok(Self(record))
    }
}

impl KeyLine for PubkeyLine {
    const KIND: KeyFileKind = KeyFileKind::Pubkey;

    fn to_fields(&self) -> Vec<String> {
        vec![self.coin.clone(), self.account.to_string(), self.full_public_key.clone()]
    }

    fn from_record(record: &StringRecord, line: u64) -> Result<Self, KeyFileError> {
        let fields = Fields { record, line };

        Ok(Self {
            coin: fields.required(0, "coin")?.to_owned(),
            account: fields.parse(1, "account")?,
            full_public_key: fields.required(2, "full public key")?.to_owned(),
        })
    }
}

impl KeyLine for MultisigLine {
    const KIND: KeyFileKind = KeyFileKind::Multisig;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.full_public_key.clone(),
            self.auth_address1.clone().unwrap_or_default(),
            self.auth_address2.clone().unwrap_or_default(),
            self.multisig_address.clone().unwrap_or_default(),
            self.redeem_script.clone().unwrap_or_default(),
        ]
    }

    fn from_record(record: &StringRecord, line: u64) -> Result<Self, KeyFileError> {
        let fields = Fields { record, line };

        Ok(Self {
            full_public_key: fields.required(0, "full public key")?.to_owned(),
            auth_address1: fields.optional(1).map(ToOwned::to_owned),
            auth_address2: fields.optional(2).map(ToOwned::to_owned),
            multisig_address: fields.optional(3).map(ToOwned::to_owned),
            redeem_script: fields.optional(4).map(ToOwned::to_owned),
        })
    }
}

struct Fields<'a> {
    record: &'a StringRecord,
    line: u64,
}

impl<'a> Fields<'a> {
    // trailing fields may be omitted, an empty field means not yet populated
    fn optional(&self, idx: usize) -> Option<&'a str> {
        self.record.get(idx).map(str::trim).filter(|s| !s.is_empty())
    }

    fn required(&self, idx: usize, field: &'static str) -> Result<&'a str, KeyFileError> {
        self.optional(idx).ok_or(KeyFileError::MissingField { line: self.line, field })
    }

    fn parse<T: FromStr>(&self, idx: usize, field: &'static str) -> Result<T, KeyFileError> {
        let value = self.required(idx, field)?;

        value.parse().map_err(|_| KeyFileError::InvalidField {
            line: self.line,
            field,
            value: value.to_owned(),
        })
    }
}
