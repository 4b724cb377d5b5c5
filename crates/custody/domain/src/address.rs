//! Wallet addresses and point-in-time unspent outputs.

use alloc::string::String;

use bon::Builder;
use dissolve_derive::Dissolve;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Timestamps, account::AccountKind, amount::Amount};

/// A wallet address owned by one of the custody accounts.
///
/// Created by key generation (offline) or by the multisig exchange. The only mutations are
/// attaching the multisig address and flipping the `is_allocated` and `is_exported` flags;
/// records are never deleted.
///
/// # Type Parameters
///
/// * `AUX` - Auxiliary data type, defaults to [`Timestamps`] for tracking metadata.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AddressRecord<AUX = Timestamps> {
    /// Coin type code, e.g. `btc`.
    coin: String,
    /// The owning account.
    account: AccountKind,
    /// Legacy pay-to-pubkey-hash address.
    #[builder(default)]
    p2pkh_address: String,
    /// Pay-to-script-hash wrapped segwit address.
    p2sh_segwit_address: String,
    /// Native segwit address.
    #[builder(default)]
    bech32_address: String,
    /// Hex encoded full public key.
    full_public_key: String,
    /// The N-of-M address, once the multisig exchange completed.
    multisig_address: Option<String>,
    /// The redeem script of the multisig address.
    redeem_script: Option<String>,
    /// Derivation index.
    key_index: u32,
    /// Set once the address has received funds in a sent transaction.
    #[builder(default)]
    is_allocated: bool,
    /// Set once the public key was exported to the authorization role.
    #[builder(default)]
    is_exported: bool,
    /// Auxiliary metadata.
    aux: AUX,
}

/// A spendable output as reported by the node at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Unspent {
    /// Source transaction id.
    txid: String,
    /// Source output index.
    vout: u32,
    /// Address holding the output.
    address: String,
    /// Node-side label of the address.
    account: AccountKind,
    /// Hex encoded locking script.
    script_pub_key: String,
    /// Hex encoded redeem script, for multisig outputs.
    redeem_script: Option<String>,
    /// Value of the output.
    amount: Amount,
    /// Current confirmation count.
    confirmations: u64,
}

impl<AUX> AddressRecord<AUX> {
    /// Returns the owning account.
    pub fn account(&self) -> AccountKind {
        self.account
    }

    /// Returns the full public key.
    pub fn full_public_key(&self) -> &str {
        &self.full_public_key
    }

    /// Returns the multisig address, if the exchange completed.
    pub fn multisig_address(&self) -> Option<&str> {
        self.multisig_address.as_deref().filter(|a| !a.is_empty())
    }

    /// Returns the address funds are received on.
    ///
    /// Multisig accounts receive on their multisig address once it exists; everything else
    /// receives on the P2SH-segwit address.
    pub fn wallet_address(&self) -> &str {
        self.multisig_address().unwrap_or(&self.p2sh_segwit_address)
    }

    /// Returns the derivation index.
    pub fn key_index(&self) -> u32 {
        self.key_index
    }

    /// Whether the address has already received funds.
    pub fn is_allocated(&self) -> bool {
        self.is_allocated
    }

    /// Replaces the auxiliary metadata.
    pub fn with_aux<T>(self, aux: T) -> (AddressRecord<T>, AUX) {
        let AddressRecord {
            coin,
            account,
            p2pkh_address,
            p2sh_segwit_address,
            bech32_address,
            full_public_key,
            multisig_address,
            redeem_script,
            key_index,
            is_allocated,
            is_exported,
            aux: old,
        } = self;

        let record = AddressRecord {
            coin,
            account,
            p2pkh_address,
            p2sh_segwit_address,
            bech32_address,
            full_public_key,
            multisig_address,
            redeem_script,
            key_index,
            is_allocated,
            is_exported,
            aux,
        };

        (record, old)
    }
}

impl Unspent {
    /// Returns the source transaction id.
    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// Returns the source output index.
    pub fn vout(&self) -> u32 {
        self.vout
    }

    /// Returns the holding address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the node-side label of the holding address.
    pub fn account(&self) -> AccountKind {
        self.account
    }

    /// Returns the value of the output.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns the confirmation count at listing time.
    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }
}

#[cfg(test)]
mod tests {
    use super::AddressRecord;
    use crate::account::AccountKind;

    fn record(multisig: Option<&str>) -> AddressRecord<()> {
        AddressRecord::builder()
            .coin("btc".into())
            .account(AccountKind::Deposit)
            .p2sh_segwit_address("2N-segwit".into())
            .full_public_key("02ab".into())
            .maybe_multisig_address(multisig.map(Into::into))
            .key_index(0)
            .aux(())
            .build()
    }

    #[test]
    fn receives_on_multisig_address_once_known() {
        assert_eq!(record(None).wallet_address(), "2N-segwit");
        assert_eq!(record(Some("")).wallet_address(), "2N-segwit");
        assert_eq!(record(Some("2N-multi")).wallet_address(), "2N-multi");
    }
}
