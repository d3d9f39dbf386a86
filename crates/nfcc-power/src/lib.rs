//! nfcc-power - Power-state and TDA coordination core for NFC controllers
//!
//! This crate sits between the host NFC service and the controller firmware.
//! Caller threads issue asynchronous firmware commands and block until the
//! firmware reports the outcome on its own thread.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        NfcService                           │
//! │  Exposed surface (bool / result / sentinel returns)         │
//! │                                                             │
//! │  ┌──────────────────────────┐   ┌────────────────────────┐  │
//! │  │ PowerSwitch              │   │ TdaManager             │  │
//! │  │ levels, sleep/wake,      │   │ discover/open/close/   │  │
//! │  │ dynamic power config     │   │ transceive             │  │
//! │  └────────────┬─────────────┘   └───────────┬────────────┘  │
//! │               │ wait on SyncEvent            │               │
//! │  ┌────────────┴─────────────┐   ┌───────────┴────────────┐  │
//! │  │ DmDispatcher             │   │ TdaDispatcher          │  │
//! │  └────────────▲─────────────┘   └───────────▲────────────┘  │
//! └───────────────┼──────────────────────────────┼──────────────┘
//!                 │ callbacks (firmware thread)  │
//!          ┌──────┴──────────────────────────────┴──────┐
//!          │  DeviceManagement / TdaInterface firmware  │
//!          └────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod power;
pub mod rf;
pub mod service;
pub mod sim;
pub mod sync_event;
pub mod tda;

pub use config::NfccConfig;
pub use dispatch::{
    ConfigSnapshot, DevicePower, DmDispatcher, Tagged, TdaCompletion, TdaDispatcher, UNTAGGED,
};
pub use error::{ConfigError, PowerError, TdaError};
pub use power::PowerSwitch;
pub use rf::RfSession;
pub use service::NfcService;
pub use sync_event::{SyncEvent, SyncEventGuard};
pub use tda::{TdaManager, INVALID_CONNECTION_ID};

// Re-export for convenience
pub use nfcc_core::{
    CardTlv, ConfigTag, DmPowerState, DynamicPowerResult, FirmwareError, NfcStatus, PowerActivity,
    PowerLevel, ScreenOffPowerState, TdaSlot,
};
