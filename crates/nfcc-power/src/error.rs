//! Power and TDA core errors

use nfcc_core::{DmPowerState, FirmwareError, NfcStatus, PowerLevel};
use thiserror::Error;

/// Power state machine errors
#[derive(Debug, Error)]
pub enum PowerError {
    /// Current level is unknown, so no transition can be computed
    #[error("Power level is unknown; cannot transition")]
    UnknownLevel,

    /// Requested level has no transition from the current state
    #[error("No power transition from {from} to {to}")]
    NoTransition { from: PowerLevel, to: PowerLevel },

    /// Device is already in the state the transition would enter
    #[error("Device already in {0}")]
    AlreadyInState(DmPowerState),

    /// Firmware refused the command
    #[error("Firmware rejected request: {0}")]
    Rejected(#[from] FirmwareError),

    /// Wait returned but the firmware never confirmed the new mode
    #[error("Power transition not confirmed (device state {0})")]
    NotConfirmed(DmPowerState),

    /// Malformed dynamic power configuration request
    #[error("Invalid power configuration request: {0}")]
    InvalidConfigRequest(String),
}

/// TDA session errors
#[derive(Debug, Error)]
pub enum TdaError {
    /// Firmware refused the command
    #[error("Firmware rejected TDA {op}: {source}")]
    Rejected {
        op: &'static str,
        #[source]
        source: FirmwareError,
    },

    /// No completion within the wait window
    #[error("Timeout waiting for TDA {op} response")]
    Timeout { op: &'static str },

    /// Completion reported a failure status
    #[error("TDA {op} failed with status {status}")]
    Status { op: &'static str, status: NfcStatus },

    /// Completion did not belong to the pending request
    #[error("Unexpected {received} completion while waiting for TDA {op}")]
    UnexpectedEvent {
        op: &'static str,
        received: &'static str,
    },
}

impl TdaError {
    /// Status byte reported to the binding layer
    pub fn status(&self) -> NfcStatus {
        match self {
            TdaError::Status { status, .. } => *status,
            TdaError::Rejected { source, .. } => source.status(),
            TdaError::Timeout { .. } | TdaError::UnexpectedEvent { .. } => NfcStatus::FAILED,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
