//! JSON-RPC client of a bitcoind wallet, implementing the node capabilities of
//! [`custody_engine::node`].
//!
//! Amounts cross the RPC boundary as BTC decimals and are converted to exact satoshis
//! right at deserialization.

mod client;
mod error;
mod types;

pub use self::{
    client::{BitcoindClient, BitcoindConfig, FEE_CONF_TARGET},
    error::{BitcoindClientError, Result},
};
