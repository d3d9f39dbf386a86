//! nfcc-core - Core types and traits for NFC controller power management
//!
//! This crate provides the vocabulary shared between the coordination core
//! (`nfcc-power`) and whatever drives the controller underneath it: power
//! levels and device power states, firmware completion events, TDA slot
//! records, and the traits a firmware stack or host must implement.

pub mod error;
pub mod firmware;
pub mod host;
pub mod models;

pub use error::{FirmwareError, FirmwareResult};
pub use firmware::{
    BufferPool, DeviceManagement, DmCallback, DmEvent, FirmwareBuffer, RawCardTlv, RawTdaSlot,
    TdaCallback, TdaControl, TdaEvent, TdaInterface,
};
pub use host::{ConfigStore, RfDiscovery, StartupConfig, SCREEN_OFF_POWER_STATE};
pub use models::*;
