//! NCI-level primitives (status codes, configuration tags)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status byte reported by the controller firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NfcStatus(pub u8);

impl NfcStatus {
    pub const OK: NfcStatus = NfcStatus(0x00);
    pub const REJECTED: NfcStatus = NfcStatus(0x01);
    pub const FAILED: NfcStatus = NfcStatus(0x03);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for NfcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

impl From<u8> for NfcStatus {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<NfcStatus> for u8 {
    fn from(status: NfcStatus) -> Self {
        status.0
    }
}

/// Two-byte extended configuration parameter tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTag(pub u16);

impl ConfigTag {
    /// Runtime-adjustable power configuration
    pub const DYNAMIC_POWER: ConfigTag = ConfigTag(0xA1A4);

    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }
}

impl fmt::Display for ConfigTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}
