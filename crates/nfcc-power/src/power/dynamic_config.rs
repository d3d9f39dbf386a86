//! Dynamic power configuration
//!
//! Reads the controller's current dynamic power value and writes the
//! requested one only when it differs. Writes happen with RF discovery
//! paused; discovery is resumed on every exit path.

use nfcc_core::{ConfigTag, DynamicPowerResult, RfDiscovery};
use tracing::{debug, error, info, warn};

use super::PowerSwitch;
use crate::error::PowerError;

/// Length-prefixed dynamic power configuration request: `[len, value...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerConfigRequest<'a> {
    payload: &'a [u8],
}

impl<'a> PowerConfigRequest<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PowerError> {
        let (&len, rest) = bytes
            .split_first()
            .ok_or_else(|| PowerError::InvalidConfigRequest("empty request".to_string()))?;
        let len = usize::from(len);
        if len == 0 {
            return Err(PowerError::InvalidConfigRequest(
                "zero-length value".to_string(),
            ));
        }
        let payload = rest.get(..len).ok_or_else(|| {
            PowerError::InvalidConfigRequest(format!(
                "length prefix {} exceeds {} value bytes",
                len,
                rest.len()
            ))
        })?;
        Ok(Self { payload })
    }

    /// Bytes written to the controller
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Value byte compared against the controller's current configuration
    pub fn value(&self) -> u8 {
        self.payload[0]
    }
}

/// Keeps RF discovery paused for the lifetime of the guard
struct DiscoveryPause<'a> {
    rf: &'a dyn RfDiscovery,
}

impl<'a> DiscoveryPause<'a> {
    fn new(rf: &'a dyn RfDiscovery) -> Self {
        rf.pause_discovery();
        Self { rf }
    }
}

impl Drop for DiscoveryPause<'_> {
    fn drop(&mut self) {
        self.rf.resume_discovery();
    }
}

impl PowerSwitch {
    /// Apply a length-prefixed dynamic power configuration
    pub fn set_dynamic_power_config(&self, request: &[u8]) -> DynamicPowerResult {
        let request = match PowerConfigRequest::parse(request) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Rejecting power configuration");
                return DynamicPowerResult::Failed;
            }
        };

        let _op = self.config_op.lock();
        let tag = ConfigTag::DYNAMIC_POWER;

        let current = self.read_config_value(tag);
        debug!(
            current = ?current,
            requested = request.value(),
            "Dynamic power configuration"
        );
        if current == Some(request.value()) {
            info!("Controller already has requested power configuration");
            return DynamicPowerResult::AlreadyExists;
        }

        let _paused = DiscoveryPause::new(self.rf.as_ref());
        self.write_config(tag, request.payload())
    }

    /// Current value byte for `tag`, or `None` if it could not be read
    fn read_config_value(&self, tag: ConfigTag) -> Option<u8> {
        let mut snapshot = self.dispatcher.get_config.lock();
        snapshot.value.clear();
        let request = snapshot.begin();

        let issued = self
            .firmware
            .get_config(tag, self.dispatcher.config_callback(request));
        if let Err(e) = issued {
            snapshot.finish();
            warn!(error = %e, %tag, "Get config not accepted");
            return None;
        }
        let completed = snapshot.wait_for(self.config_timeout);
        snapshot.finish();
        if !completed {
            warn!(%tag, "Timeout waiting for get config");
            return None;
        }
        snapshot.value.value_for(tag)
    }

    fn write_config(&self, tag: ConfigTag, value: &[u8]) -> DynamicPowerResult {
        let mut status = self.dispatcher.set_config.lock();
        status.value = None;
        let request = status.begin();

        let issued = self
            .firmware
            .set_config(tag, value, self.dispatcher.config_callback(request));
        if let Err(e) = issued {
            status.finish();
            error!(error = %e, %tag, "Failed to set power configuration");
            return DynamicPowerResult::Failed;
        }
        let completed = status.wait_for(self.config_timeout);
        status.finish();
        if !completed {
            error!(%tag, "Timeout waiting for set config");
            return DynamicPowerResult::Failed;
        }

        match status.value {
            Some(s) if s.is_ok() => {
                info!(value = %hex::encode(value), "Power configuration set");
                DynamicPowerResult::Success
            }
            other => {
                error!(
                    status = ?other,
                    "Failed to set power configuration, invalid input"
                );
                DynamicPowerResult::Failed
            }
        }
    }
}
