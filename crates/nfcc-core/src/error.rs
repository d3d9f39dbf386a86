//! Errors reported by the firmware command layer

use thiserror::Error;

use crate::models::NfcStatus;

/// Result type for firmware command issue
pub type FirmwareResult<T> = Result<T, FirmwareError>;

/// Errors returned synchronously when a command is issued.
///
/// These only describe whether the firmware accepted the request. Failures
/// reported later through a completion callback carry an [`NfcStatus`]
/// instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FirmwareError {
    /// Firmware refused the command
    #[error("Command rejected by firmware: status {0}")]
    Rejected(NfcStatus),

    /// No command buffer available
    #[error("Firmware out of command buffers")]
    NoBuffers,

    /// Command not supported by this controller
    #[error("Command not supported: {0}")]
    Unsupported(String),
}

impl FirmwareError {
    /// Status byte equivalent of this error
    pub fn status(&self) -> NfcStatus {
        match self {
            FirmwareError::Rejected(status) => *status,
            FirmwareError::NoBuffers | FirmwareError::Unsupported(_) => NfcStatus::FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_keeps_status() {
        let err = FirmwareError::Rejected(NfcStatus::REJECTED);
        assert_eq!(err.status(), NfcStatus::REJECTED);
        assert_eq!(
            err.to_string(),
            "Command rejected by firmware: status 0x01"
        );
    }

    #[test]
    fn test_buffer_exhaustion_maps_to_failed() {
        assert_eq!(FirmwareError::NoBuffers.status(), NfcStatus::FAILED);
    }
}
