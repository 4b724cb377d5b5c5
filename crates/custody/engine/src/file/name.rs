use core::{fmt, str::FromStr};
use std::path::Path;

use bon::Builder;
use chrono::Utc;
use custody_domain::tx::{ActionType, TxId, TxStatus};
use dissolve_derive::Dissolve;

use super::error::FileProtocolError;

/// The name of a hand-off file: `{action}_{tx_id}_{status}_{signed_count}_{unix_nanos}`.
///
/// It is the only channel carrying a transaction's identity across the air gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Dissolve)]
pub struct TxFileName {
    action: ActionType,
    tx_id: TxId,
    status: TxStatus,
    #[builder(default)]
    signed_count: u8,
    timestamp_nanos: i64,
}

impl TxFileName {
    /// Creates a name stamped with the current time.
    pub fn now(action: ActionType, tx_id: TxId, status: TxStatus, signed_count: u8) -> Self {
        let timestamp_nanos = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);

        Self { action, tx_id, status, signed_count, timestamp_nanos }
    }

    /// Parses the file name part of `path`, ignoring directories and any extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FileProtocolError> {
        let path = path.as_ref();

        let stem = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.split_once('.').map_or(name, |(stem, _)| stem))
            .ok_or_else(|| FileProtocolError::InvalidFileName(path.display().to_string()))?;

        stem.parse()
    }

    /// Returns the action.
    pub fn action(&self) -> ActionType {
        self.action
    }

    /// Returns the transaction record id.
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    /// Returns the status tag.
    pub fn status(&self) -> TxStatus {
        self.status
    }

    /// Returns how many signatures the body carries.
    pub fn signed_count(&self) -> u8 {
        self.signed_count
    }

    /// Returns the creation time in unix nanoseconds.
    pub fn timestamp_nanos(&self) -> i64 {
        self.timestamp_nanos
    }

    /// Fails unless the file is tagged with `expected`.
    pub fn expect_status(&self, expected: TxStatus) -> Result<(), FileProtocolError> {
        if self.status != expected {
            return Err(FileProtocolError::UnexpectedStatus { expected, found: self.status });
        }

        Ok(())
    }
}

impl fmt::Display for TxFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.action, self.tx_id, self.status, self.signed_count, self.timestamp_nanos
        )
    }
}

impl FromStr for TxFileName {
    type Err = FileProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split('_').collect();

        let [action, tx_id, status, signed_count, timestamp_nanos] = tokens[..] else {
            return Err(FileProtocolError::InvalidFileName(s.to_owned()));
        };

        let action = ActionType::from_str(action)
            .map_err(|_| FileProtocolError::invalid_token("action", action))?;

        let tx_id = tx_id
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(TxId::from)
            .ok_or_else(|| FileProtocolError::invalid_token("tx id", tx_id))?;

        let status = TxStatus::from_str(status)
            .ok()
            .filter(|status| matches!(status, TxStatus::Unsigned | TxStatus::Signed))
            .ok_or_else(|| FileProtocolError::invalid_token("status", status))?;

        let signed_count = signed_count
            .parse::<u8>()
            .map_err(|_| FileProtocolError::invalid_token("signed count", signed_count))?;

        let timestamp_nanos = timestamp_nanos
            .parse::<i64>()
            .ok()
            .filter(|ts| *ts >= 0)
            .ok_or_else(|| FileProtocolError::invalid_token("timestamp", timestamp_nanos))?;

        Ok(Self { action, tx_id, status, signed_count, timestamp_nanos })
    }
}
