//! Surface exposed to the binding layer
//!
//! Wraps the power switch and the TDA manager and folds their errors into the
//! plain values the binding layer expects: `bool`, result enums, `None`, the
//! invalid connection id, or a status byte.

use std::sync::Arc;

use nfcc_core::{
    ConfigStore, DynamicPowerResult, NfcStatus, PowerActivity, PowerLevel, ScreenOffPowerState,
    TdaSlot,
};
use tracing::{debug, warn};

use crate::config::NfccConfig;
use crate::power::PowerSwitch;
use crate::rf::RfSession;
use crate::tda::{TdaManager, INVALID_CONNECTION_ID};

/// Power and TDA operations for one controller
pub struct NfcService {
    power: PowerSwitch,
    tda: TdaManager,
    session: Arc<RfSession>,
}

impl NfcService {
    /// Assemble the service. `session` must be the tracker the power switch
    /// waits on.
    pub fn new(power: PowerSwitch, tda: TdaManager, session: Arc<RfSession>) -> Self {
        Self {
            power,
            tda,
            session,
        }
    }

    /// Initialise the power switch from configuration
    pub fn initialize(&self, config: &NfccConfig) {
        self.initialize_with(config.power.initial_level, config);
    }

    pub fn initialize_with(&self, level: PowerLevel, store: &dyn ConfigStore) {
        self.power.initialize(level, store);
    }

    pub fn power(&self) -> &PowerSwitch {
        &self.power
    }

    pub fn tda(&self) -> &TdaManager {
        &self.tda
    }

    /// RF session tracker fed by the discovery layer
    pub fn session(&self) -> &Arc<RfSession> {
        &self.session
    }

    // =========================================================================
    // Power
    // =========================================================================

    pub fn power_get_level(&self) -> PowerLevel {
        self.power.get_level()
    }

    pub fn power_set_level(&self, level: PowerLevel) -> bool {
        match self.power.set_level(level) {
            Ok(()) => true,
            Err(e) => {
                warn!(%level, error = %e, "Power level change failed");
                false
            }
        }
    }

    /// Always succeeds
    pub fn power_set_screen_off_state(&self, state: ScreenOffPowerState) -> bool {
        self.power.set_screen_off_power_state(state);
        true
    }

    pub fn power_set_mode_on(&self, activity: PowerActivity) -> bool {
        self.power.set_mode_on(activity)
    }

    pub fn power_set_mode_off(&self, activity: PowerActivity) -> bool {
        self.power.set_mode_off(activity)
    }

    pub fn power_set_dynamic_config(&self, request: &[u8]) -> DynamicPowerResult {
        self.power.set_dynamic_power_config(request)
    }

    pub fn power_abort(&self) {
        self.power.abort();
    }

    // =========================================================================
    // TDA
    // =========================================================================

    /// Attached slots, or `None` if discovery failed
    pub fn tda_discover(&self) -> Option<Vec<TdaSlot>> {
        self.tda
            .discover()
            .inspect_err(|e| warn!(error = %e, "TDA discovery failed"))
            .ok()
    }

    /// Connection id, or [`INVALID_CONNECTION_ID`] on failure
    pub fn tda_open(&self, slot_id: u8, standby: bool) -> u8 {
        match self.tda.open(slot_id, standby) {
            Ok(connection_id) => {
                debug!(slot_id, connection_id, "TDA opened");
                connection_id
            }
            Err(e) => {
                warn!(slot_id, error = %e, "TDA open failed");
                INVALID_CONNECTION_ID
            }
        }
    }

    /// Status byte of the close
    pub fn tda_close(&self, slot_id: u8, standby: bool) -> NfcStatus {
        match self.tda.close(slot_id, standby) {
            Ok(()) => NfcStatus::OK,
            Err(e) => {
                warn!(slot_id, error = %e, "TDA close failed");
                e.status()
            }
        }
    }

    /// Response bytes, or `None` if the exchange failed
    pub fn tda_transceive(&self, command: &[u8]) -> Option<Vec<u8>> {
        self.tda
            .transceive(command)
            .inspect_err(|e| warn!(error = %e, "TDA transceive failed"))
            .ok()
    }
}
