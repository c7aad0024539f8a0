//! Error types shared between the guide engine and its collaborators.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Validation errors for program guide data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EpgError {
    /// Program window is empty or inverted.
    #[error("Invalid program window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Errors reported by the backend when fetching guide data for a channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer in time.
    #[error("Backend request timed out")]
    Timeout,

    /// Backend does not know the requested channel.
    #[error("Backend has no channel {0}")]
    NoSuchChannel(u32),

    /// Backend answered with data that could not be decoded.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Per-channel error code recorded for this failure.
    pub fn code(&self) -> FetchErrorCode {
        match self {
            FetchError::Unavailable(_) => FetchErrorCode::Unavailable,
            FetchError::Timeout => FetchErrorCode::Timeout,
            FetchError::NoSuchChannel(_) => FetchErrorCode::NoSuchChannel,
            FetchError::InvalidResponse(_) => FetchErrorCode::InvalidResponse,
        }
    }
}

/// Error code recorded per channel by a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FetchErrorCode {
    /// Fetch succeeded.
    Success = 0x0000,
    /// Unknown error occurred.
    Unknown = 0x0001,
    /// Backend unavailable.
    Unavailable = 0x0002,
    /// Backend timed out.
    Timeout = 0x0003,
    /// Backend has no such channel.
    NoSuchChannel = 0x0004,
    /// Backend answered with garbage.
    InvalidResponse = 0x0005,
}

impl From<u16> for FetchErrorCode {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => FetchErrorCode::Success,
            0x0002 => FetchErrorCode::Unavailable,
            0x0003 => FetchErrorCode::Timeout,
            0x0004 => FetchErrorCode::NoSuchChannel,
            0x0005 => FetchErrorCode::InvalidResponse,
            _ => FetchErrorCode::Unknown,
        }
    }
}

impl From<FetchErrorCode> for u16 {
    fn from(value: FetchErrorCode) -> Self {
        value as u16
    }
}

impl FetchErrorCode {
    /// Returns true if this error code indicates success.
    pub fn is_success(self) -> bool {
        self == FetchErrorCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip() {
        let codes = [
            FetchErrorCode::Success,
            FetchErrorCode::Unavailable,
            FetchErrorCode::Timeout,
            FetchErrorCode::NoSuchChannel,
            FetchErrorCode::InvalidResponse,
        ];
        for code in codes {
            let value: u16 = code.into();
            assert_eq!(FetchErrorCode::from(value), code);
        }
        assert_eq!(FetchErrorCode::from(0x1234), FetchErrorCode::Unknown);
    }

    #[test]
    fn test_invalid_window_is_the_only_validation_error() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let err = EpgError::InvalidWindow { start: at, end: at };
        match &err {
            EpgError::InvalidWindow { start, end } => assert_eq!(start, end),
        }
        assert!(err.to_string().starts_with("Invalid program window"));
    }

    #[test]
    fn test_fetch_error_code() {
        assert_eq!(FetchError::Timeout.code(), FetchErrorCode::Timeout);
        assert_eq!(
            FetchError::Unavailable("down".into()).code(),
            FetchErrorCode::Unavailable
        );
        assert!(!FetchError::NoSuchChannel(3).code().is_success());
    }
}
