//! Controller configuration
//!
//! Settings for the power switch, the TDA manager and the simulated
//! controller, loaded from a TOML file:
//!
//! ```toml
//! [power]
//! initial_level = "full_power"
//! screen_off_power_state = 0
//! config_timeout_ms = 1000
//!
//! [tda]
//! timeout_ms = 1000
//!
//! [simulator]
//! latency_ms = 5
//! dynamic_power_value = 1
//!
//! [[simulator.slots]]
//! id = 32
//! protocols = [4]
//! card_info = [{ tlv_type = 1, value = "a0000001" }]
//! ```

use std::path::Path;
use std::time::Duration;

use nfcc_core::{ConfigStore, PowerLevel, ScreenOffPowerState, SCREEN_OFF_POWER_STATE};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete controller configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NfccConfig {
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub tda: TdaConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl NfccConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(
            self.power.initial_level,
            PowerLevel::FullPower | PowerLevel::Unknown
        ) {
            return Err(ConfigError::Invalid(format!(
                "initial_level must be full_power or unknown, got {}",
                self.power.initial_level
            )));
        }
        for slot in &self.simulator.slots {
            for card in &slot.card_info {
                card.decoded_value().map_err(|e| {
                    ConfigError::Invalid(format!("slot {} card value: {}", slot.id, e))
                })?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for NfccConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: NfccConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigStore for NfccConfig {
    fn get_unsigned(&self, key: &str) -> Option<u32> {
        match key {
            SCREEN_OFF_POWER_STATE => self.power.screen_off_power_state,
            _ => None,
        }
    }
}

// =============================================================================
// Power Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    /// Level the power switch starts at
    #[serde(default = "default_initial_level")]
    pub initial_level: PowerLevel,
    /// Desired screen-off power state (0 = power-off-sleep, 1 = full power,
    /// 2 = card emulation); unset keeps power-off-sleep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_off_power_state: Option<u32>,
    /// Wait window for configuration reads and writes
    #[serde(default = "default_timeout_ms")]
    pub config_timeout_ms: u64,
}

fn default_initial_level() -> PowerLevel {
    PowerLevel::FullPower
}

fn default_timeout_ms() -> u64 {
    1000
}

impl PowerConfig {
    pub fn config_timeout(&self) -> Duration {
        Duration::from_millis(self.config_timeout_ms)
    }

    /// Screen-off state as an enum, when it is one of the known values
    pub fn screen_off(&self) -> Option<ScreenOffPowerState> {
        self.screen_off_power_state
            .and_then(ScreenOffPowerState::from_raw)
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            initial_level: default_initial_level(),
            screen_off_power_state: None,
            config_timeout_ms: default_timeout_ms(),
        }
    }
}

// =============================================================================
// TDA Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TdaConfig {
    /// Wait window for every TDA operation
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl TdaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TdaConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

// =============================================================================
// Simulator Configuration
// =============================================================================

/// Simulated controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Delay before each completion is delivered
    #[serde(default)]
    pub latency_ms: u64,
    /// Dynamic power value the controller boots with
    #[serde(default = "default_dynamic_power_value")]
    pub dynamic_power_value: u8,
    /// Attached TDA slots
    #[serde(default)]
    pub slots: Vec<SimSlotConfig>,
    /// Response returned by transceive on an open slot (hex)
    #[serde(default = "default_transceive_response")]
    pub transceive_response: String,
}

fn default_dynamic_power_value() -> u8 {
    0x01
}

fn default_transceive_response() -> String {
    "9000".to_string()
}

impl SimulatorConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            dynamic_power_value: default_dynamic_power_value(),
            slots: Vec::new(),
            transceive_response: default_transceive_response(),
        }
    }
}

/// Simulated TDA slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSlotConfig {
    pub id: u8,
    #[serde(default)]
    pub status: u32,
    #[serde(default)]
    pub protocols: Vec<u8>,
    #[serde(default)]
    pub card_info: Vec<SimCardConfig>,
}

/// Simulated card information record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimCardConfig {
    pub tlv_type: u8,
    /// Record value (hex)
    #[serde(default)]
    pub value: String,
}

impl SimCardConfig {
    pub fn decoded_value(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.value)
    }
}
