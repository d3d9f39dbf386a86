//! Power-related models (levels, device states, activities)

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Logical power level requested by policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerLevel {
    /// Not yet known; no transition is possible from here
    #[default]
    Unknown,
    FullPower,
    LowPower,
    PowerOff,
}

impl PowerLevel {
    /// Decode the numeric level used by the binding layer
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Unknown),
            1 => Some(Self::FullPower),
            2 => Some(Self::LowPower),
            3 => Some(Self::PowerOff),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::FullPower => 1,
            Self::LowPower => 2,
            Self::PowerOff => 3,
        }
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Unknown => "PS-UNKNOWN",
            Self::FullPower => "PS-FULL",
            Self::LowPower => "PS-LOW-POWER",
            Self::PowerOff => "PS-POWER-OFF",
        };
        f.write_str(tag)
    }
}

/// Power mode reported by the controller's device management
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmPowerState {
    #[default]
    Unknown,
    Full,
    OffSleep,
}

impl fmt::Display for DmPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Unknown => "DM-UNKNOWN",
            Self::Full => "DM-FULL",
            Self::OffSleep => "DM-OFF",
        };
        f.write_str(tag)
    }
}

/// Power state the host wants while the screen is off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenOffPowerState {
    /// Controller may enter power-off-sleep when idle
    PowerOff,
    /// Controller stays at full power
    Full,
    /// Controller keeps card emulation alive
    CardEmulation,
}

impl ScreenOffPowerState {
    pub fn as_raw(self) -> u32 {
        match self {
            Self::PowerOff => 0,
            Self::Full => 1,
            Self::CardEmulation => 2,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::PowerOff),
            1 => Some(Self::Full),
            2 => Some(Self::CardEmulation),
            _ => None,
        }
    }
}

impl fmt::Display for ScreenOffPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::PowerOff => "SOPS-POWER_OFF",
            Self::Full => "SOPS-FULL",
            Self::CardEmulation => "SOPS-CARD_EMULATION",
        };
        f.write_str(tag)
    }
}

bitflags! {
    /// Subsystems that currently need the controller powered
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct PowerActivity: u8 {
        const DISCOVERY = 0x01;
        const SE_ROUTING = 0x02;
        const SE_CONNECTED = 0x04;
        const HOST_ROUTING = 0x08;
    }
}

/// Outcome of a dynamic power configuration request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicPowerResult {
    /// New value written to the controller
    Success,
    /// Controller already held the requested value; nothing written
    AlreadyExists,
    Failed,
}

impl fmt::Display for DynamicPowerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::AlreadyExists => "already exists",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}
