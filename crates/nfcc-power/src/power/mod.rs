//! Controller power state machine
//!
//! [`PowerSwitch`] owns the logical power level, the device-management power
//! state and the activity mask, and sequences power-off-sleep entry and exit
//! against the firmware.
//!
//! Locking: `transition` serialises level changes for their whole duration,
//! `state` is only held for short reads and writes so [`PowerSwitch::get_level`]
//! never waits on hardware, and the device power state lives inside the
//! dispatcher's power-state event so the completion can commit it while a
//! transition is parked. `state` and an event guard are never held together.

mod dynamic_config;
mod switch;

pub use dynamic_config::PowerConfigRequest;

use std::sync::Arc;
use std::time::Duration;

use nfcc_core::{DeviceManagement, PowerActivity, PowerLevel, RfDiscovery, StartupConfig};
use parking_lot::Mutex;

use crate::dispatch::DmDispatcher;
use crate::rf::RfSession;

/// Default wait window for configuration reads and writes
pub const DEFAULT_CONFIG_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, Default)]
struct PowerState {
    level: PowerLevel,
    activity: PowerActivity,
    /// Raw desired screen-off power state; 0 allows power-off-sleep,
    /// 1 keeps the controller at full power
    screen_off_state: u32,
}

/// Power state machine for one NFC controller
pub struct PowerSwitch {
    firmware: Arc<dyn DeviceManagement>,
    rf: Arc<dyn RfDiscovery>,
    session: Arc<RfSession>,
    startup: Arc<dyn StartupConfig>,
    dispatcher: Arc<DmDispatcher>,
    state: Mutex<PowerState>,
    transition: Mutex<()>,
    config_op: Mutex<()>,
    config_timeout: Duration,
}

impl PowerSwitch {
    pub fn new(
        firmware: Arc<dyn DeviceManagement>,
        rf: Arc<dyn RfDiscovery>,
        session: Arc<RfSession>,
        startup: Arc<dyn StartupConfig>,
    ) -> Self {
        Self {
            firmware,
            rf,
            session,
            startup,
            dispatcher: DmDispatcher::new(),
            state: Mutex::new(PowerState::default()),
            transition: Mutex::new(()),
            config_op: Mutex::new(()),
            config_timeout: DEFAULT_CONFIG_TIMEOUT,
        }
    }

    /// Override the wait window for configuration reads and writes
    pub fn with_config_timeout(mut self, timeout: Duration) -> Self {
        self.config_timeout = timeout;
        self
    }

    /// Dispatcher receiving this switch's firmware completions
    pub fn dispatcher(&self) -> &Arc<DmDispatcher> {
        &self.dispatcher
    }
}
