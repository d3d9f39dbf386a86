//! Completion dispatch for firmware callbacks
//!
//! The firmware invokes these on its own threads. Each handler records the
//! payload into the event that belongs to the pending protocol and wakes its
//! waiter, holding that event's guard while doing so. Nothing here blocks on
//! anything but the event guard.
//!
//! Request/response protocols tag each request with a number that the
//! callback handed to the firmware carries back. A completion whose tag is not
//! the one currently awaited belongs to a request that already gave up and is
//! dropped.

use std::sync::Arc;

use nfcc_core::{ConfigTag, DmCallback, DmEvent, DmPowerState, NfcStatus, TdaCallback, TdaEvent};
use tracing::{debug, error, warn};

use crate::sync_event::SyncEvent;

/// Capacity of the configuration snapshot buffer
pub const CONFIG_CAPACITY: usize = 256;

/// Index of the value byte in a single-parameter get-config response:
/// `[param count, tag hi, tag lo, value len, value...]`
const CONFIG_VALUE_INDEX: usize = 4;

/// Tag carried by callbacks that belong to no request
pub const UNTAGGED: u64 = 0;

/// Event payload owned by the request with tag `request`
#[derive(Debug, Default)]
pub struct Tagged<T> {
    /// Tag of the request waiting for `value`, [`UNTAGGED`] when idle
    pub(crate) request: u64,
    pub(crate) value: T,
    last: u64,
}

impl<T> Tagged<T> {
    /// Start a new request and return its tag
    pub(crate) fn begin(&mut self) -> u64 {
        self.last = self.last.wrapping_add(1).max(1);
        self.request = self.last;
        self.request
    }

    /// Stop accepting completions for the current request
    pub(crate) fn finish(&mut self) {
        self.request = UNTAGGED;
    }

    /// Whether a completion tagged `request` is the one being waited for
    pub fn accepts(&self, request: u64) -> bool {
        request != UNTAGGED && request == self.request
    }
}

/// Device power state shared between the power switch and the completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DevicePower {
    /// Last state confirmed by the firmware
    pub current: DmPowerState,
    /// State the pending transition will enter if it succeeds
    pub expected: DmPowerState,
}

/// Last configuration read back from the controller
#[derive(Clone)]
pub struct ConfigSnapshot {
    buf: [u8; CONFIG_CAPACITY],
    len: usize,
}

impl ConfigSnapshot {
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Copy `tlvs` into the snapshot.
    ///
    /// Payloads larger than [`CONFIG_CAPACITY`] are refused and leave the
    /// snapshot empty.
    pub fn store(&mut self, tlvs: &[u8]) -> bool {
        match self.buf.get_mut(..tlvs.len()) {
            Some(dst) => {
                dst.copy_from_slice(tlvs);
                self.len = tlvs.len();
                true
            }
            None => {
                self.len = 0;
                false
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value byte of `tag`, if the snapshot is a valid response for it
    pub fn value_for(&self, tag: ConfigTag) -> Option<u8> {
        let bytes = self.as_bytes();
        let embedded = [*bytes.get(1)?, *bytes.get(2)?];
        if ConfigTag::from_bytes(embedded) != tag {
            return None;
        }
        bytes.get(CONFIG_VALUE_INDEX).copied()
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            buf: [0; CONFIG_CAPACITY],
            len: 0,
        }
    }
}

impl std::fmt::Debug for ConfigSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSnapshot")
            .field("bytes", &hex::encode(self.as_bytes()))
            .finish()
    }
}

/// Per-protocol events for device-management completions
#[derive(Default)]
pub struct DmDispatcher {
    pub(crate) power_state: SyncEvent<DevicePower>,
    pub(crate) get_config: SyncEvent<Tagged<ConfigSnapshot>>,
    pub(crate) set_config: SyncEvent<Tagged<Option<NfcStatus>>>,
}

impl DmDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Callback handle for power mode requests
    pub fn callback(self: &Arc<Self>) -> DmCallback {
        self.config_callback(UNTAGGED)
    }

    /// Callback handle for the configuration request tagged `request`
    pub fn config_callback(self: &Arc<Self>, request: u64) -> DmCallback {
        let dispatcher = Arc::clone(self);
        Arc::new(move |event| dispatcher.dispatch(request, event))
    }

    /// Record a device-management completion and wake its waiter.
    ///
    /// Power mode changes are accepted whatever their tag; configuration
    /// completions only when `request` is the tag being waited for.
    pub fn dispatch(&self, request: u64, event: DmEvent) {
        match event {
            DmEvent::PowerModeChange { status, power_mode } => {
                debug!(
                    %status,
                    reported = %power_mode,
                    "Power mode change event"
                );
                let mut device = self.power_state.lock();
                if status.is_ok() {
                    // The event does not reliably carry the new mode; the
                    // expectation recorded before the request is authoritative.
                    device.current = device.expected;
                }
                device.notify_one();
            }
            DmEvent::SetConfig { status } => {
                debug!(%status, "Set config event");
                let mut result = self.set_config.lock();
                if !result.accepts(request) {
                    warn!(request, %status, "Stale set config completion, dropping");
                    return;
                }
                result.value = Some(status);
                result.notify_one();
            }
            DmEvent::GetConfig { status, tlvs } => {
                debug!(%status, len = tlvs.len(), "Get config event");
                let mut snapshot = self.get_config.lock();
                if !snapshot.accepts(request) {
                    warn!(request, %status, "Stale get config completion, dropping");
                    return;
                }
                if !status.is_ok() {
                    error!(%status, "Get config failed");
                    snapshot.value.clear();
                } else if !snapshot.value.store(&tlvs) {
                    error!(
                        len = tlvs.len(),
                        capacity = CONFIG_CAPACITY,
                        "Get config payload exceeds snapshot capacity"
                    );
                }
                snapshot.notify_one();
            }
        }
    }
}

/// Hand-off slot for the single in-flight TDA request
pub type TdaCompletion = Tagged<Option<TdaEvent>>;

/// Event for TDA completions
#[derive(Default)]
pub struct TdaDispatcher {
    pub(crate) completion: SyncEvent<TdaCompletion>,
}

impl TdaDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Callback handle for the TDA request tagged `request`
    pub fn callback(self: &Arc<Self>, request: u64) -> TdaCallback {
        let dispatcher = Arc::clone(self);
        Arc::new(move |event| dispatcher.dispatch(request, event))
    }

    /// Record a TDA completion and wake its waiter.
    ///
    /// Completions for any request other than the pending one (for example
    /// one whose waiter timed out) are dropped here, releasing any buffer
    /// they own.
    pub fn dispatch(&self, request: u64, event: TdaEvent) {
        debug!(
            request,
            kind = event.kind(),
            status = %event.status(),
            "TDA event"
        );
        let mut slot = self.completion.lock();
        if !slot.accepts(request) {
            warn!(
                request,
                pending = slot.request,
                kind = event.kind(),
                "TDA completion for no pending request, dropping"
            );
            return;
        }
        slot.value = Some(event);
        slot.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn dynamic_power_tlv(value: u8) -> Vec<u8> {
        vec![0x01, 0xA1, 0xA4, 0x01, value]
    }

    #[test]
    fn test_snapshot_value_requires_matching_tag() {
        let mut snapshot = ConfigSnapshot::default();
        assert!(snapshot.store(&dynamic_power_tlv(0x02)));
        assert_eq!(snapshot.value_for(ConfigTag::DYNAMIC_POWER), Some(0x02));
        assert_eq!(snapshot.value_for(ConfigTag(0xA1A5)), None);
    }

    #[test]
    fn test_snapshot_too_short_has_no_value() {
        let mut snapshot = ConfigSnapshot::default();
        assert!(snapshot.store(&[0x01, 0xA1, 0xA4, 0x00]));
        assert_eq!(snapshot.value_for(ConfigTag::DYNAMIC_POWER), None);
    }

    #[test]
    fn test_snapshot_rejects_oversized_payload() {
        let mut snapshot = ConfigSnapshot::default();
        assert!(snapshot.store(&dynamic_power_tlv(0x01)));
        assert!(!snapshot.store(&vec![0u8; CONFIG_CAPACITY + 1]));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_power_mode_change_commits_expected_state() {
        let dispatcher = DmDispatcher::new();
        let mut device = dispatcher.power_state.lock();
        device.expected = DmPowerState::OffSleep;

        let callback = dispatcher.callback();
        let firmware = thread::spawn(move || {
            callback(DmEvent::PowerModeChange {
                status: NfcStatus::OK,
                power_mode: DmPowerState::Unknown,
            })
        });

        assert!(device.wait_for(Duration::from_secs(5)));
        assert_eq!(device.current, DmPowerState::OffSleep);
        drop(device);
        firmware.join().unwrap();
    }

    #[test]
    fn test_failed_power_mode_change_keeps_current_state() {
        let dispatcher = DmDispatcher::new();
        let mut device = dispatcher.power_state.lock();
        device.current = DmPowerState::Full;
        device.expected = DmPowerState::OffSleep;

        let callback = dispatcher.callback();
        let firmware = thread::spawn(move || {
            callback(DmEvent::PowerModeChange {
                status: NfcStatus::FAILED,
                power_mode: DmPowerState::Full,
            })
        });

        assert!(device.wait_for(Duration::from_secs(5)));
        assert_eq!(device.current, DmPowerState::Full);
        drop(device);
        firmware.join().unwrap();
    }

    #[test]
    fn test_oversized_get_config_zeroes_snapshot() {
        let dispatcher = DmDispatcher::new();
        let request = {
            let mut snapshot = dispatcher.get_config.lock();
            snapshot.value.store(&dynamic_power_tlv(0x01));
            snapshot.begin()
        };

        dispatcher.dispatch(
            request,
            DmEvent::GetConfig {
                status: NfcStatus::OK,
                tlvs: vec![0u8; CONFIG_CAPACITY + 8],
            },
        );

        assert!(dispatcher.get_config.lock().value.is_empty());
    }

    #[test]
    fn test_get_config_for_other_request_keeps_snapshot() {
        let dispatcher = DmDispatcher::new();
        let request = dispatcher.get_config.lock().begin();

        dispatcher.dispatch(
            request + 1,
            DmEvent::GetConfig {
                status: NfcStatus::OK,
                tlvs: dynamic_power_tlv(0x02),
            },
        );

        assert!(dispatcher.get_config.lock().value.is_empty());
    }

    #[test]
    fn test_set_config_status_after_finish_is_dropped() {
        let dispatcher = DmDispatcher::new();
        let stale = {
            let mut result = dispatcher.set_config.lock();
            let request = result.begin();
            result.finish();
            request
        };
        let current = dispatcher.set_config.lock().begin();
        assert_ne!(stale, current);

        dispatcher.dispatch(
            stale,
            DmEvent::SetConfig {
                status: NfcStatus::FAILED,
            },
        );
        assert_eq!(dispatcher.set_config.lock().value, None);

        dispatcher.dispatch(
            current,
            DmEvent::SetConfig {
                status: NfcStatus::OK,
            },
        );
        assert_eq!(dispatcher.set_config.lock().value, Some(NfcStatus::OK));
    }

    #[test]
    fn test_untagged_callback_never_completes_config_requests() {
        let dispatcher = DmDispatcher::new();
        dispatcher.set_config.lock().begin();

        (dispatcher.callback())(DmEvent::SetConfig {
            status: NfcStatus::OK,
        });
        assert_eq!(dispatcher.set_config.lock().value, None);
    }

    #[test]
    fn test_tda_completion_without_pending_request_is_dropped() {
        let dispatcher = TdaDispatcher::new();
        dispatcher.dispatch(
            UNTAGGED,
            TdaEvent::Closed {
                status: NfcStatus::OK,
            },
        );
        assert!(dispatcher.completion.lock().value.is_none());
    }

    #[test]
    fn test_tda_completion_for_earlier_request_is_dropped() {
        let dispatcher = TdaDispatcher::new();
        let timed_out = {
            let mut slot = dispatcher.completion.lock();
            let request = slot.begin();
            slot.finish();
            request
        };
        let pending = dispatcher.completion.lock().begin();

        (dispatcher.callback(timed_out))(TdaEvent::Closed {
            status: NfcStatus::FAILED,
        });
        assert!(dispatcher.completion.lock().value.is_none());

        (dispatcher.callback(pending))(TdaEvent::Closed {
            status: NfcStatus::OK,
        });
        assert_eq!(
            dispatcher
                .completion
                .lock()
                .value
                .as_ref()
                .map(TdaEvent::status),
            Some(NfcStatus::OK)
        );
    }
}
