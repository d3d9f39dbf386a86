//! Power level transitions and power-off-sleep sequencing

use nfcc_core::{
    ConfigStore, DmPowerState, PowerActivity, PowerLevel, ScreenOffPowerState,
    SCREEN_OFF_POWER_STATE,
};
use tracing::{debug, error, info, warn};

use super::PowerSwitch;
use crate::error::PowerError;

impl PowerSwitch {
    /// Set the initial power level and load the screen-off policy.
    ///
    /// Only [`PowerLevel::FullPower`] and [`PowerLevel::Unknown`] are valid
    /// starting levels; anything else is logged and ignored.
    pub fn initialize(&self, level: PowerLevel, config: &dyn ConfigStore) {
        let device_state = {
            let mut state = self.state.lock();
            debug!(%level, "initialize");
            if let Some(desired) = config.get_unsigned(SCREEN_OFF_POWER_STATE) {
                state.screen_off_state = desired;
            }
            debug!(
                desired = state.screen_off_state,
                "initialize: desired screen-off state"
            );

            match level {
                PowerLevel::FullPower => {
                    state.level = level;
                    DmPowerState::Full
                }
                PowerLevel::Unknown => {
                    state.level = level;
                    DmPowerState::Unknown
                }
                other => {
                    error!(level = %other, "initialize: level not handled");
                    return;
                }
            }
        };
        self.dispatcher.power_state.lock().current = device_state;
    }

    /// Current logical power level
    pub fn get_level(&self) -> PowerLevel {
        self.state.lock().level
    }

    /// Last confirmed device-management power state
    pub fn device_power_state(&self) -> DmPowerState {
        self.dispatcher.power_state.lock().current
    }

    /// Currently active power consumers
    pub fn activity(&self) -> PowerActivity {
        self.state.lock().activity
    }

    /// Raw desired screen-off power state
    pub fn screen_off_power_state(&self) -> u32 {
        self.state.lock().screen_off_state
    }

    pub fn set_screen_off_power_state(&self, new_state: ScreenOffPowerState) {
        debug!(state = %new_state, "set_screen_off_power_state");
        self.state.lock().screen_off_state = new_state.as_raw();
    }

    /// Move the controller to `new_level`.
    ///
    /// Switching between low and full power first waits, without timeout,
    /// for any active RF session to be deactivated. Entering power-off-sleep
    /// records [`PowerLevel::LowPower`] whichever of the two was requested.
    pub fn set_level(&self, new_level: PowerLevel) -> Result<(), PowerError> {
        let _transition = self.transition.lock();
        let current = self.get_level();
        debug!(level = %new_level, %current, "set_level");

        if current == new_level {
            return Ok(());
        }
        if current == PowerLevel::Unknown {
            error!("set_level: unknown power level");
            return Err(PowerError::UnknownLevel);
        }

        if matches!(
            (current, new_level),
            (PowerLevel::LowPower, PowerLevel::FullPower)
                | (PowerLevel::FullPower, PowerLevel::LowPower)
        ) {
            self.session.wait_for_deactivation();
        }

        let result = match new_level {
            PowerLevel::FullPower => {
                if self.device_power_state() == DmPowerState::OffSleep {
                    self.set_power_off_sleep_state(false)
                } else {
                    Err(PowerError::NoTransition {
                        from: current,
                        to: new_level,
                    })
                }
            }
            PowerLevel::LowPower | PowerLevel::PowerOff => {
                let screen_off_state = self.screen_off_power_state();
                if screen_off_state == ScreenOffPowerState::PowerOff.as_raw() {
                    if current == PowerLevel::LowPower
                        && self.device_power_state() == DmPowerState::OffSleep
                    {
                        debug!("set_level: already in power-off-sleep");
                        Ok(())
                    } else {
                        self.set_power_off_sleep_state(true)
                    }
                } else if screen_off_state == ScreenOffPowerState::Full.as_raw() {
                    // Configuration wants the controller at full power
                    self.state.lock().level = PowerLevel::FullPower;
                    Ok(())
                } else {
                    Err(PowerError::NoTransition {
                        from: current,
                        to: new_level,
                    })
                }
            }
            PowerLevel::Unknown => {
                error!("set_level: not handled");
                Err(PowerError::NoTransition {
                    from: current,
                    to: new_level,
                })
            }
        };

        debug!(actual = %self.get_level(), "set_level: actual power level");
        result
    }

    /// Mark `activated` as needing power; returns whether any activity is set
    pub fn set_mode_on(&self, activated: PowerActivity) -> bool {
        let mut state = self.state.lock();
        state.activity |= activated;
        debug!(
            activated = activated.bits(),
            activity = state.activity.bits(),
            "set_mode_on"
        );
        !state.activity.is_empty()
    }

    /// Clear `deactivated`; returns whether any activity is still set
    pub fn set_mode_off(&self, deactivated: PowerActivity) -> bool {
        let mut state = self.state.lock();
        state.activity.remove(deactivated);
        debug!(
            deactivated = deactivated.bits(),
            activity = state.activity.bits(),
            "set_mode_off"
        );
        !state.activity.is_empty()
    }

    /// Wake whichever thread is parked in a power-off-sleep transition.
    ///
    /// The woken transition re-checks the device state, so an abort without a
    /// real mode change makes a wake-up report failure.
    pub fn abort(&self) {
        debug!("abort");
        self.dispatcher.power_state.lock().notify_one();
    }

    /// Enter (`sleep = true`) or leave power-off-sleep.
    ///
    /// Waits without timeout for the firmware to confirm the change or for
    /// [`PowerSwitch::abort`].
    pub fn set_power_off_sleep_state(&self, sleep: bool) -> Result<(), PowerError> {
        debug!(sleep, "set_power_off_sleep_state: enter");
        let result = if sleep {
            self.enter_power_off_sleep()
        } else {
            self.exit_power_off_sleep()
        };
        debug!(ok = result.is_ok(), "set_power_off_sleep_state: exit");
        result
    }

    fn enter_power_off_sleep(&self) -> Result<(), PowerError> {
        {
            let mut device = self.dispatcher.power_state.lock();
            if device.current == DmPowerState::OffSleep {
                error!(state = %device.current, "Power is not ON");
                return Err(PowerError::AlreadyInState(device.current));
            }

            device.expected = DmPowerState::OffSleep;
            debug!("Try power off");
            self.firmware
                .power_off_sleep_mode(true, self.dispatcher.callback())
                .inspect_err(|e| error!(error = %e, "Power off sleep request failed"))?;
            device.wait();

            if device.current != DmPowerState::OffSleep {
                warn!(state = %device.current, "Power off sleep not confirmed");
            }
        }

        self.state.lock().level = PowerLevel::LowPower;
        info!("Controller in power-off-sleep");
        Ok(())
    }

    fn exit_power_off_sleep(&self) -> Result<(), PowerError> {
        {
            let mut device = self.dispatcher.power_state.lock();
            if device.current == DmPowerState::Full {
                error!(state = %device.current, "Not in power-off state");
                return Err(PowerError::AlreadyInState(device.current));
            }

            device.current = DmPowerState::Unknown;
            device.expected = DmPowerState::Full;
            debug!("Try full power");
            self.firmware
                .power_off_sleep_mode(false, self.dispatcher.callback())
                .inspect_err(|e| error!(error = %e, "Full power request failed"))?;
            device.wait();

            if device.current != DmPowerState::Full {
                error!(state = %device.current, "Unable to reach full power");
                return Err(PowerError::NotConfirmed(device.current));
            }
        }

        self.startup.apply_startup_config();
        self.state.lock().level = PowerLevel::FullPower;
        info!("Controller at full power");
        Ok(())
    }
}
