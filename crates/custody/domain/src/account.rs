//! Account kinds that every address and transaction is tagged with.

use strum::{Display, EnumString, IntoStaticStr};

#[cfg(feature = "serde")]
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// The role an address or transaction party plays in the custody system.
///
/// The label (see [`Display`](core::fmt::Display) and [`FromStr`](core::str::FromStr)) is the
/// identifier persisted in storage, used as the node-side wallet label and written to
/// hand-off files. The discriminant is the numeric account code used in key derivation paths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(SerializeDisplay, DeserializeFromStr))]
#[repr(u8)]
pub enum AccountKind {
    /// End-user addresses that receive customer funds.
    Client = 0,
    /// Cold addresses that client funds are swept into.
    #[strum(to_string = "deposit", serialize = "receipt")]
    Deposit = 1,
    /// Addresses funding outgoing payments.
    Payment = 2,
    /// Long-term cold storage.
    Stored = 3,
    /// The authorization role's own key.
    #[strum(to_string = "auth")]
    Authorization = 10,
    /// Additional authorizer #1.
    Auth1 = 11,
    /// Additional authorizer #2.
    Auth2 = 12,
    /// Additional authorizer #3.
    Auth3 = 13,
    /// Additional authorizer #4.
    Auth4 = 14,
    /// Additional authorizer #5.
    Auth5 = 15,
    /// Additional authorizer #6.
    Auth6 = 16,
    /// Additional authorizer #7.
    Auth7 = 17,
    /// Additional authorizer #8.
    Auth8 = 18,
    /// Additional authorizer #9.
    Auth9 = 19,
    /// Additional authorizer #10.
    Auth10 = 20,
    /// Additional authorizer #11.
    Auth11 = 21,
    /// Additional authorizer #12.
    Auth12 = 22,
    /// Additional authorizer #13.
    Auth13 = 23,
    /// Additional authorizer #14.
    Auth14 = 24,
    /// Additional authorizer #15.
    Auth15 = 25,
    /// External receivers outside of this wallet (e.g. payment destinations).
    Anonymous = 99,
    /// Test fixtures.
    Test = 100,
}

impl AccountKind {
    /// Returns the numeric account code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns the persisted label.
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Whether this account is one of the authorization keys.
    pub fn is_authorization(self) -> bool {
        matches!(self.code(), 10..=25)
    }

    /// Whether addresses of this account are N-of-M multisig addresses.
    pub fn is_multisig(self) -> bool {
        matches!(self, Self::Deposit | Self::Payment | Self::Stored)
    }

    /// Whether this account may be the receiver of an internal transfer.
    pub fn allows_receiving_transfer(self) -> bool {
        !matches!(self, Self::Client) && !self.is_authorization()
    }

    /// Whether a fresh, never-used address must be allocated when this account receives.
    pub fn requires_fresh_address(self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}
