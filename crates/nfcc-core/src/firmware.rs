//! Firmware command layer contract
//!
//! The controller firmware accepts commands synchronously and reports their
//! outcome later by invoking a callback on one of its own threads. The core
//! depends only on this contract:
//!
//! ```text
//!   caller thread                       firmware thread
//!   ─────────────                       ───────────────
//!   request(.., callback) ──queued──▶
//!   wait on event                       callback(event)
//!        ◀────────────── notify ──────────────┘
//! ```
//!
//! Implementations must never invoke a callback on the thread that issued the
//! request before that request has returned.

use std::fmt;
use std::sync::Arc;

use crate::error::FirmwareResult;
use crate::models::{ConfigTag, DmPowerState, NfcStatus};

/// Completion callback for device-management commands
pub type DmCallback = Arc<dyn Fn(DmEvent) + Send + Sync>;

/// Completion callback for TDA commands
pub type TdaCallback = Arc<dyn Fn(TdaEvent) + Send + Sync>;

/// Device-management completion events
#[derive(Debug)]
pub enum DmEvent {
    /// Result of a power-off-sleep request.
    ///
    /// `power_mode` is informational only; the firmware does not reliably
    /// repeat the mode it switched to.
    PowerModeChange {
        status: NfcStatus,
        power_mode: DmPowerState,
    },
    /// Result of a configuration write
    SetConfig { status: NfcStatus },
    /// Result of a configuration read, as raw parameter TLVs
    GetConfig { status: NfcStatus, tlvs: Vec<u8> },
}

/// TDA completion events
#[derive(Debug)]
pub enum TdaEvent {
    Discovered {
        status: NfcStatus,
        control: TdaControl,
    },
    Opened {
        status: NfcStatus,
        connection_id: u8,
    },
    Closed {
        status: NfcStatus,
    },
    Transceived {
        status: NfcStatus,
        response: FirmwareBuffer,
    },
}

impl TdaEvent {
    pub fn status(&self) -> NfcStatus {
        match self {
            TdaEvent::Discovered { status, .. }
            | TdaEvent::Opened { status, .. }
            | TdaEvent::Closed { status }
            | TdaEvent::Transceived { status, .. } => *status,
        }
    }

    /// Short name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            TdaEvent::Discovered { .. } => "discover",
            TdaEvent::Opened { .. } => "open",
            TdaEvent::Closed { .. } => "close",
            TdaEvent::Transceived { .. } => "transceive",
        }
    }
}

/// Discovery payload as laid out by the firmware.
///
/// The declared counts are what the firmware claims; the vectors hold what it
/// actually filled in. Readers must honour both.
#[derive(Debug, Clone, Default)]
pub struct TdaControl {
    pub num_tda_supported: u8,
    pub slots: Vec<RawTdaSlot>,
}

#[derive(Debug, Clone, Default)]
pub struct RawTdaSlot {
    pub id: u8,
    pub status: u32,
    pub number_of_protocols: u8,
    pub protocols: Vec<u8>,
    pub number_of_card_info: u8,
    pub card_tlv_info: Vec<RawCardTlv>,
}

#[derive(Debug, Clone, Default)]
pub struct RawCardTlv {
    pub tlv_type: u8,
    pub length: u8,
    pub value: Vec<u8>,
}

/// Pool that owns firmware-allocated response memory
pub trait BufferPool: Send + Sync {
    /// Return a buffer of `len` bytes to the pool
    fn release(&self, len: usize);
}

/// Response memory allocated by the firmware.
///
/// Released back to its pool exactly once, when dropped.
pub struct FirmwareBuffer {
    data: Vec<u8>,
    pool: Option<Arc<dyn BufferPool>>,
}

impl FirmwareBuffer {
    /// Buffer that does not belong to any pool
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pool: None }
    }

    /// Buffer that is handed back to `pool` on drop
    pub fn pooled(data: Vec<u8>, pool: Arc<dyn BufferPool>) -> Self {
        Self {
            data,
            pool: Some(pool),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for FirmwareBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirmwareBuffer")
            .field("len", &self.data.len())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Drop for FirmwareBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(self.data.len());
        }
    }
}

/// Device-management half of the firmware command layer
pub trait DeviceManagement: Send + Sync {
    /// Enter (`enable = true`) or leave power-off-sleep mode.
    ///
    /// Completes with [`DmEvent::PowerModeChange`].
    fn power_off_sleep_mode(&self, enable: bool, callback: DmCallback) -> FirmwareResult<()>;

    /// Read one configuration parameter. Completes with [`DmEvent::GetConfig`].
    fn get_config(&self, tag: ConfigTag, callback: DmCallback) -> FirmwareResult<()>;

    /// Write one configuration parameter. Completes with [`DmEvent::SetConfig`].
    fn set_config(&self, tag: ConfigTag, value: &[u8], callback: DmCallback) -> FirmwareResult<()>;
}

/// TDA half of the firmware command layer
pub trait TdaInterface: Send + Sync {
    fn discover_tda_slots(&self, callback: TdaCallback) -> FirmwareResult<()>;

    fn open_tda_slot(&self, slot_id: u8, standby: bool, callback: TdaCallback)
        -> FirmwareResult<()>;

    fn close_tda_slot(
        &self,
        slot_id: u8,
        standby: bool,
        callback: TdaCallback,
    ) -> FirmwareResult<()>;

    /// Send raw bytes to the open slot. The response arrives as a
    /// [`FirmwareBuffer`] inside [`TdaEvent::Transceived`].
    fn transceive_tda(&self, command: &[u8], callback: TdaCallback) -> FirmwareResult<()>;
}
