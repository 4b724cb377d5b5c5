use base64::{Engine, engine::general_purpose::STANDARD};
use bon::Builder;
use custody_domain::{account::AccountKind, amount::Amount};
use dissolve_derive::Dissolve;
use serde::{Deserialize, Serialize};

use super::error::FileProtocolError;

/// What an offline signer needs to know about one consumed output.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve, Serialize, Deserialize)]
pub struct PrevTx {
    txid: String,
    vout: u32,
    script_pub_key: String,
    /// Only present for multisig inputs.
    redeem_script: Option<String>,
    amount: Amount,
}

/// The signing context appended to an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve, Serialize, Deserialize)]
pub struct PrevTxContext {
    /// Whose keys sign the inputs.
    sender_account: AccountKind,
    prev_txs: Vec<PrevTx>,
    /// Input addresses, one per input.
    addresses: Vec<String>,
}

/// The content of a hand-off file: `{hex}` or `{hex},{context}`.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct TxFileBody {
    hex: String,
    context: Option<PrevTxContext>,
}

impl PrevTx {
    /// Returns the source transaction id.
    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// Returns the source output index.
    pub fn vout(&self) -> u32 {
        self.vout
    }

    /// Returns the redeem script, if any.
    pub fn redeem_script(&self) -> Option<&str> {
        self.redeem_script.as_deref()
    }

    /// Returns the amount of the consumed output.
    pub fn amount(&self) -> Amount {
        self.amount
    }
}

impl PrevTxContext {
    /// Returns the signing account.
    pub fn sender_account(&self) -> AccountKind {
        self.sender_account
    }

    /// Returns the consumed outputs.
    pub fn prev_txs(&self) -> &[PrevTx] {
        &self.prev_txs
    }

    /// Returns the input addresses.
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Encodes the context as base64 of its JSON form.
    pub fn encode(&self) -> Result<String, FileProtocolError> {
        let json = serde_json::to_vec(self)?;

        Ok(STANDARD.encode(json))
    }

    /// Decodes a context produced by [`PrevTxContext::encode`].
    pub fn decode(encoded: &str) -> Result<Self, FileProtocolError> {
        let json = STANDARD.decode(encoded.trim())?;

        serde_json::from_slice(&json).map_err(From::from)
    }
}

impl TxFileBody {
    /// Creates a body without signing context.
    pub fn hex_only(hex: String) -> Self {
        Self { hex, context: None }
    }

    /// Returns the transaction hex.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Returns the signing context, if present.
    pub fn context(&self) -> Option<&PrevTxContext> {
        self.context.as_ref()
    }

    /// Serializes the body into its file form.
    pub fn encode(&self) -> Result<String, FileProtocolError> {
        match &self.context {
            Some(context) => Ok(format!("{},{}", self.hex, context.encode()?)),
            None => Ok(self.hex.clone()),
        }
    }

    /// Parses the file form of a body.
    pub fn decode(s: &str) -> Result<Self, FileProtocolError> {
        let s = s.trim();

        let (hex, context) = match s.split_once(',') {
            Some((hex, context)) => (hex, Some(context)),
            None => (s, None),
        };

        if hex.is_empty() {
            return Err(FileProtocolError::invalid_body("empty transaction hex"));
        }

        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FileProtocolError::invalid_body("transaction is not hex encoded"));
        }

        let context = context.map(PrevTxContext::decode).transpose()?;

        Ok(Self { hex: hex.to_owned(), context })
    }
}
