//! N-of-M multisig policy and the public-key exchange record.

use alloc::string::String;

use bon::Builder;
use dissolve_derive::Dissolve;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Timestamps, account::AccountKind};

/// The largest number of keys a standard multisig script may carry.
pub const MAX_MULTISIG_KEYS: u8 = 15;

/// The minimum length of a hex encoded compressed public key.
pub const MIN_PUBLIC_KEY_LEN: usize = 66;

/// The minimum length of a hex encoded redeem script.
pub const MIN_REDEEM_SCRIPT_LEN: usize = 20;

/// How many of how many keys must sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultisigPolicy {
    required: u8,
    total: u8,
}

/// The result of creating a multisig address on a node.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultisigAddress {
    /// The N-of-M address.
    address: String,
    /// Hex encoded redeem script.
    redeem_script: String,
}

/// Tracks the public-key exchange of one key between a receiving role and the
/// authorization role.
///
/// The multisig address is empty until the authorization role created it and immutable
/// afterwards.
///
/// # Type Parameters
///
/// * `AUX` - Auxiliary data type, defaults to [`Timestamps`] for tracking metadata.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultisigHistory<AUX = Timestamps> {
    /// The record id.
    id: i64,
    /// The receiving account the key belongs to.
    account: AccountKind,
    /// Hex encoded full public key of the receiving role.
    full_public_key: String,
    /// The first authorizer's address.
    auth_address1: Option<String>,
    /// The second authorizer's address.
    auth_address2: Option<String>,
    /// The created N-of-M address.
    multisig_address: Option<String>,
    /// The redeem script of the created address.
    redeem_script: Option<String>,
    /// Set once exported back to the receiving role.
    #[builder(default)]
    is_exported: bool,
    /// Auxiliary metadata.
    aux: AUX,
}

/// Errors produced when validating multisig parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultisigError {
    /// At least one signature must be required.
    #[error("required signatures must be at least 1")]
    ZeroRequired,

    /// Fewer than two keys is not a multisig.
    #[error("total keys must be at least 2, got {0}")]
    TooFewKeys(u8),

    /// More keys than a standard script allows.
    #[error("total keys must not exceed 15, got {0}")]
    TooManyKeys(u8),

    /// More signatures required than keys available.
    #[error("required signatures {required} exceed total keys {total}")]
    ExcessRequired {
        /// required signatures
        required: u8,
        /// total keys
        total: u8,
    },

    /// The public key is too short to be a compressed key.
    #[error("invalid public key length {0}")]
    InvalidPublicKey(usize),

    /// The redeem script is missing or too short.
    #[error("invalid redeem script length {0}")]
    InvalidRedeemScript(usize),
}

#[bon::bon]
impl MultisigPolicy {
    /// Creates a validated policy.
    #[builder]
    pub fn new(required: u8, total: u8) -> Result<Self, MultisigError> {
        if required == 0 {
            return Err(MultisigError::ZeroRequired);
        }

        if total < 2 {
            return Err(MultisigError::TooFewKeys(total));
        }

        if total > MAX_MULTISIG_KEYS {
            return Err(MultisigError::TooManyKeys(total));
        }

        if required > total {
            return Err(MultisigError::ExcessRequired { required, total });
        }

        Ok(Self { required, total })
    }
}

impl MultisigPolicy {
    /// The 2-of-2 policy: one key of the receiving role, one of the authorization role.
    pub const TWO_OF_TWO: MultisigPolicy = MultisigPolicy { required: 2, total: 2 };

    /// Returns the number of required signatures.
    pub fn required(&self) -> u8 {
        self.required
    }

    /// Returns the total number of keys.
    pub fn total(&self) -> u8 {
        self.total
    }
}

impl MultisigAddress {
    /// Returns the N-of-M address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the redeem script.
    pub fn redeem_script(&self) -> &str {
        &self.redeem_script
    }

    /// Checks the redeem script is plausibly a script.
    pub fn validate(&self) -> Result<(), MultisigError> {
        validate_redeem_script(&self.redeem_script)
    }
}

impl<AUX> MultisigHistory<AUX> {
    /// Returns the record id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the receiving account.
    pub fn account(&self) -> AccountKind {
        self.account
    }

    /// Returns the receiving role's public key.
    pub fn full_public_key(&self) -> &str {
        &self.full_public_key
    }

    /// Returns the created multisig address, if any.
    pub fn multisig_address(&self) -> Option<&str> {
        self.multisig_address.as_deref().filter(|a| !a.is_empty())
    }

    /// Whether the multisig address has been created.
    pub fn is_complete(&self) -> bool {
        self.multisig_address().is_some()
    }
}

/// Checks a hex encoded public key has at least compressed-key length.
pub fn validate_public_key(key: &str) -> Result<(), MultisigError> {
    if key.len() < MIN_PUBLIC_KEY_LEN {
        return Err(MultisigError::InvalidPublicKey(key.len()));
    }

    Ok(())
}

/// Checks a hex encoded redeem script is non-empty and of plausible length.
pub fn validate_redeem_script(script: &str) -> Result<(), MultisigError> {
    if script.len() < MIN_REDEEM_SCRIPT_LEN {
        return Err(MultisigError::InvalidRedeemScript(script.len()));
    }

    Ok(())
}
