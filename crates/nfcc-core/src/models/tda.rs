//! TDA (card-emulation slot) records

use serde::{Deserialize, Serialize};

/// Card information record (type/length/value) attached to a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTlv {
    /// Record type
    pub tlv_type: u8,
    /// Record value; its length is the TLV length
    pub value: Vec<u8>,
}

impl CardTlv {
    pub fn length(&self) -> usize {
        self.value.len()
    }
}

/// Snapshot of one TDA slot as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdaSlot {
    /// Slot identifier used by open/close
    pub id: u8,
    /// Slot status as reported by the controller
    pub status: u32,
    /// Supported RF protocols
    pub protocols: Vec<u8>,
    /// Card information records
    pub card_info: Vec<CardTlv>,
}
