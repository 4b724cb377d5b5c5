//! Domain types for the custody wallet.
//!
//! This crate provides the core domain models shared by the online watch role and the
//! offline keygen and sign roles: account kinds, exact satoshi amounts, the transaction
//! lifecycle, and the records exchanged between roles. Everything here is plain data with
//! type-safe builders; persistence and node access live in other crates.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod account;
pub mod address;
pub mod amount;
pub mod multisig;
pub mod payment;
pub mod tx;

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timestamp metadata for tracking entity creation and modification times.
///
/// This struct is commonly used as auxiliary data (`AUX`) in other domain types
/// to track when entities were created and last updated.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamps {
    /// The timestamp when the entity was created.
    created_at: DateTime<Utc>,
    /// The timestamp when the entity was last updated.
    updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
