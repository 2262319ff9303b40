// src/errors.rs

//! Crate-wide error type and the stable error-code table.

use std::path::PathBuf;

use thiserror::Error;

/// Stable integer codes carried by every [`MonitorError`].
///
/// The values are bit positions so callers that aggregate failures can OR
/// them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    UnknownError = 1 << 0,
    SessionUnknown = 1 << 1,
    MonitorAlreadyExists = 1 << 2,
    Memory = 1 << 3,
    UnknownMonitorType = 1 << 4,
    CallbackNotSet = 1 << 5,
    PathsNotSet = 1 << 6,
    MissingContext = 1 << 7,
    InvalidPath = 1 << 8,
    InvalidCallback = 1 << 9,
    InvalidLatency = 1 << 10,
    InvalidRegex = 1 << 11,
    MonitorAlreadyRunning = 1 << 12,
    UnknownValue = 1 << 13,
    InvalidProperty = 1 << 14,
}

impl ErrorCode {
    pub fn value(self) -> u32 {
        self as u32
    }
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("callback not set")]
    CallbackNotSet,

    #[error("no paths to watch")]
    PathsNotSet,

    #[error("invalid latency: {0} (must be a finite number >= 0)")]
    InvalidLatency(f64),

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported monitor type: {0}")]
    UnknownMonitorType(String),

    #[error("unknown value: {0}")]
    UnknownValue(String),

    #[error("invalid property: {0}")]
    InvalidProperty(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("event queue overflow at {0:?}")]
    Overflow(PathBuf),

    #[error("notification handle: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MonitorError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MonitorError::CallbackNotSet => ErrorCode::CallbackNotSet,
            MonitorError::PathsNotSet => ErrorCode::PathsNotSet,
            MonitorError::InvalidLatency(_) => ErrorCode::InvalidLatency,
            MonitorError::InvalidRegex { .. } => ErrorCode::InvalidRegex,
            MonitorError::UnknownMonitorType(_) => ErrorCode::UnknownMonitorType,
            MonitorError::UnknownValue(_) | MonitorError::InvalidFilter(_) => {
                ErrorCode::UnknownValue
            }
            MonitorError::InvalidProperty(_) => ErrorCode::InvalidProperty,
            MonitorError::Overflow(_)
            | MonitorError::Notification(_)
            | MonitorError::Io(_)
            | MonitorError::Other(_) => ErrorCode::UnknownError,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::UnknownError.value(), 1);
        assert_eq!(ErrorCode::UnknownMonitorType.value(), 16);
        assert_eq!(ErrorCode::InvalidLatency.value(), 1024);
        assert_eq!(ErrorCode::InvalidProperty.value(), 1 << 14);
    }

    #[test]
    fn errors_map_to_codes() {
        assert_eq!(MonitorError::CallbackNotSet.code(), ErrorCode::CallbackNotSet);
        assert_eq!(MonitorError::InvalidLatency(-1.0).code(), ErrorCode::InvalidLatency);
        let io = MonitorError::from(std::io::Error::other("boom"));
        assert_eq!(io.code(), ErrorCode::UnknownError);
    }
}
