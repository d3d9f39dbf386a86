//! Simulated NFC controller
//!
//! An in-process stand-in for the firmware command layer. Commands are
//! accepted synchronously and completed from a single worker thread after a
//! configurable latency, so callbacks never run on the issuing thread. Every
//! command and host interaction is recorded for inspection, and response
//! buffers come from a [`TrackingPool`].

mod pool;

pub use pool::TrackingPool;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nfcc_core::{
    ConfigTag, DeviceManagement, DmCallback, DmEvent, DmPowerState, FirmwareError,
    FirmwareResult, NfcStatus, RawCardTlv, RawTdaSlot, RfDiscovery, StartupConfig, TdaCallback,
    TdaControl, TdaEvent, TdaInterface,
};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::{NfccConfig, SimSlotConfig, SimulatorConfig};
use crate::power::PowerSwitch;
use crate::rf::RfSession;
use crate::service::NfcService;
use crate::tda::TdaManager;

/// Command or host interaction seen by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    PowerOffSleep(bool),
    GetConfig(ConfigTag),
    SetConfig(ConfigTag, Vec<u8>),
    DiscoverTda,
    OpenTda { slot_id: u8, standby: bool },
    CloseTda { slot_id: u8, standby: bool },
    Transceive(Vec<u8>),
    PauseDiscovery,
    ResumeDiscovery,
    StartupConfig,
}

/// Injected misbehaviour, applied to every firmware command
#[derive(Debug, Clone, Copy, Default)]
pub struct SimFaults {
    /// Refuse commands at issue time
    pub reject: bool,
    /// Accept commands but never complete them
    pub silent: bool,
    /// Complete commands with this status instead of their natural one
    pub status: Option<NfcStatus>,
}

struct ControllerState {
    power_mode: DmPowerState,
    dynamic_power: Vec<u8>,
    slots: Vec<SimSlotConfig>,
    open_slot: Option<u8>,
    next_connection_id: u8,
    transceive_response: Vec<u8>,
    latency: Duration,
    faults: SimFaults,
    log: Vec<SimCommand>,
}

type Job = Box<dyn FnOnce() + Send>;

struct Shared {
    state: Mutex<ControllerState>,
    pool: Arc<TrackingPool>,
}

impl Shared {
    fn record(&self, command: SimCommand) {
        trace!(?command, "Simulator command");
        self.state.lock().log.push(command);
    }
}

/// Simulated controller implementing both firmware halves
pub struct SimulatedController {
    shared: Arc<Shared>,
    jobs: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedController {
    pub fn new(config: &SimulatorConfig) -> Arc<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(ControllerState {
                power_mode: DmPowerState::Full,
                dynamic_power: vec![config.dynamic_power_value],
                slots: config.slots.clone(),
                open_slot: None,
                next_connection_id: 1,
                transceive_response: hex::decode(&config.transceive_response)
                    .unwrap_or_default(),
                latency: config.latency(),
                faults: SimFaults::default(),
                log: Vec::new(),
            }),
            pool: TrackingPool::new(),
        });

        let (jobs, rx) = mpsc::channel::<Job>();
        let worker = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("nfcc-sim".to_string())
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let latency = shared.state.lock().latency;
                        if !latency.is_zero() {
                            thread::sleep(latency);
                        }
                        job();
                    }
                    debug!("Simulator worker stopped");
                })
                .ok()
        };

        Arc::new(Self {
            shared,
            jobs: Some(jobs),
            worker,
        })
    }

    /// Host collaborator sharing this controller's command log
    pub fn host(&self) -> Arc<SimHost> {
        Arc::new(SimHost {
            shared: self.shared.clone(),
        })
    }

    pub fn pool(&self) -> &Arc<TrackingPool> {
        &self.shared.pool
    }

    pub fn set_faults(&self, faults: SimFaults) {
        self.shared.state.lock().faults = faults;
    }

    pub fn clear_faults(&self) {
        self.set_faults(SimFaults::default());
    }

    pub fn set_latency(&self, latency: Duration) {
        self.shared.state.lock().latency = latency;
    }

    pub fn power_mode(&self) -> DmPowerState {
        self.shared.state.lock().power_mode
    }

    /// Current dynamic power configuration value
    pub fn dynamic_power(&self) -> Vec<u8> {
        self.shared.state.lock().dynamic_power.clone()
    }

    pub fn set_dynamic_power(&self, value: &[u8]) {
        self.shared.state.lock().dynamic_power = value.to_vec();
    }

    pub fn commands(&self) -> Vec<SimCommand> {
        self.shared.state.lock().log.clone()
    }

    pub fn clear_commands(&self) {
        self.shared.state.lock().log.clear();
    }

    /// Block until every completion queued so far has been delivered
    pub fn flush(&self) {
        let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);
        if self.enqueue(Box::new(move || {
            let _ = done_tx.send(());
        })) {
            let _ = done_rx.recv();
        }
    }

    fn enqueue(&self, job: Job) -> bool {
        match &self.jobs {
            Some(jobs) => jobs.send(job).is_ok(),
            None => false,
        }
    }

    /// Record `command`, apply faults, and schedule `complete` with the
    /// status the completion should carry
    fn submit<F>(&self, command: SimCommand, complete: F) -> FirmwareResult<()>
    where
        F: FnOnce(&Shared, Option<NfcStatus>) + Send + 'static,
    {
        self.shared.record(command);
        let faults = self.shared.state.lock().faults;
        if faults.reject {
            return Err(FirmwareError::Rejected(NfcStatus::REJECTED));
        }
        if faults.silent {
            return Ok(());
        }

        let shared = self.shared.clone();
        if self.enqueue(Box::new(move || complete(&shared, faults.status))) {
            Ok(())
        } else {
            Err(FirmwareError::Unsupported("simulator stopped".to_string()))
        }
    }
}

impl Drop for SimulatedController {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl DeviceManagement for SimulatedController {
    fn power_off_sleep_mode(&self, enable: bool, callback: DmCallback) -> FirmwareResult<()> {
        self.submit(SimCommand::PowerOffSleep(enable), move |shared, fault| {
            let status = fault.unwrap_or(NfcStatus::OK);
            let power_mode = {
                let mut state = shared.state.lock();
                if status.is_ok() {
                    state.power_mode = if enable {
                        DmPowerState::OffSleep
                    } else {
                        DmPowerState::Full
                    };
                }
                state.power_mode
            };
            callback(DmEvent::PowerModeChange { status, power_mode });
        })
    }

    fn get_config(&self, tag: ConfigTag, callback: DmCallback) -> FirmwareResult<()> {
        self.submit(SimCommand::GetConfig(tag), move |shared, fault| {
            let status = fault.unwrap_or(NfcStatus::OK);
            let tlvs = if status.is_ok() {
                let value = if tag == ConfigTag::DYNAMIC_POWER {
                    shared.state.lock().dynamic_power.clone()
                } else {
                    Vec::new()
                };
                let (len, value) = clamped("config value", &value);
                let [hi, lo] = tag.to_bytes();
                let mut tlvs = vec![0x01, hi, lo, len];
                tlvs.extend_from_slice(value);
                tlvs
            } else {
                Vec::new()
            };
            callback(DmEvent::GetConfig { status, tlvs });
        })
    }

    fn set_config(&self, tag: ConfigTag, value: &[u8], callback: DmCallback) -> FirmwareResult<()> {
        let value = value.to_vec();
        self.submit(
            SimCommand::SetConfig(tag, value.clone()),
            move |shared, fault| {
                let status = fault.unwrap_or(NfcStatus::OK);
                if status.is_ok() && tag == ConfigTag::DYNAMIC_POWER {
                    shared.state.lock().dynamic_power = value;
                }
                callback(DmEvent::SetConfig { status });
            },
        )
    }
}

impl TdaInterface for SimulatedController {
    fn discover_tda_slots(&self, callback: TdaCallback) -> FirmwareResult<()> {
        self.submit(SimCommand::DiscoverTda, move |shared, fault| {
            let slots: Vec<RawTdaSlot> = shared.state.lock().slots.iter().map(raw_slot).collect();
            let (count, slots) = clamped("slots", &slots);
            let control = TdaControl {
                num_tda_supported: count,
                slots: slots.to_vec(),
            };
            callback(TdaEvent::Discovered {
                status: fault.unwrap_or(NfcStatus::OK),
                control,
            });
        })
    }

    fn open_tda_slot(
        &self,
        slot_id: u8,
        standby: bool,
        callback: TdaCallback,
    ) -> FirmwareResult<()> {
        self.submit(
            SimCommand::OpenTda { slot_id, standby },
            move |shared, fault| {
                let mut state = shared.state.lock();
                let known = state.slots.iter().any(|slot| slot.id == slot_id);
                let status = match fault {
                    Some(status) => status,
                    None if known => NfcStatus::OK,
                    None => NfcStatus::REJECTED,
                };
                let connection_id = if status.is_ok() {
                    let id = state.next_connection_id;
                    state.next_connection_id = state.next_connection_id.wrapping_add(1).max(1);
                    state.open_slot = Some(slot_id);
                    id
                } else {
                    0
                };
                drop(state);
                callback(TdaEvent::Opened {
                    status,
                    connection_id,
                });
            },
        )
    }

    fn close_tda_slot(
        &self,
        slot_id: u8,
        standby: bool,
        callback: TdaCallback,
    ) -> FirmwareResult<()> {
        self.submit(
            SimCommand::CloseTda { slot_id, standby },
            move |shared, fault| {
                let status = {
                    let mut state = shared.state.lock();
                    let status = match fault {
                        Some(status) => status,
                        None if state.open_slot == Some(slot_id) => NfcStatus::OK,
                        None => NfcStatus::FAILED,
                    };
                    if status.is_ok() {
                        state.open_slot = None;
                    }
                    status
                };
                callback(TdaEvent::Closed { status });
            },
        )
    }

    fn transceive_tda(&self, command: &[u8], callback: TdaCallback) -> FirmwareResult<()> {
        self.submit(
            SimCommand::Transceive(command.to_vec()),
            move |shared, fault| {
                let (status, data) = {
                    let state = shared.state.lock();
                    match fault {
                        Some(status) => (status, Vec::new()),
                        None if state.open_slot.is_some() => {
                            (NfcStatus::OK, state.transceive_response.clone())
                        }
                        None => (NfcStatus::FAILED, Vec::new()),
                    }
                };
                callback(TdaEvent::Transceived {
                    status,
                    response: shared.pool.allocate(data),
                });
            },
        )
    }
}

/// Length byte for `items` and the prefix of `items` it covers.
///
/// Anything past 255 entries cannot be described by a one-byte count and is
/// cut off.
fn clamped<'a, T>(what: &'static str, items: &'a [T]) -> (u8, &'a [T]) {
    match u8::try_from(items.len()) {
        Ok(len) => (len, items),
        Err(_) => {
            warn!(what, len = items.len(), "Truncating to 255 entries");
            (u8::MAX, &items[..usize::from(u8::MAX)])
        }
    }
}

fn raw_slot(slot: &SimSlotConfig) -> RawTdaSlot {
    let card_tlv_info: Vec<RawCardTlv> = slot
        .card_info
        .iter()
        .map(|card| {
            let value = card.decoded_value().unwrap_or_default();
            let (length, value) = clamped("card value", &value);
            RawCardTlv {
                tlv_type: card.tlv_type,
                length,
                value: value.to_vec(),
            }
        })
        .collect();
    let (number_of_protocols, protocols) = clamped("protocols", &slot.protocols);
    let (number_of_card_info, card_tlv_info) = clamped("card info", &card_tlv_info);
    RawTdaSlot {
        id: slot.id,
        status: slot.status,
        number_of_protocols,
        protocols: protocols.to_vec(),
        number_of_card_info,
        card_tlv_info: card_tlv_info.to_vec(),
    }
}

/// Host side of the simulator: RF discovery control and startup config
pub struct SimHost {
    shared: Arc<Shared>,
}

impl RfDiscovery for SimHost {
    fn pause_discovery(&self) {
        self.shared.record(SimCommand::PauseDiscovery);
    }

    fn resume_discovery(&self) {
        self.shared.record(SimCommand::ResumeDiscovery);
    }
}

impl StartupConfig for SimHost {
    fn apply_startup_config(&self) {
        self.shared.record(SimCommand::StartupConfig);
    }
}

/// Build an initialised [`NfcService`] running against a new simulator
pub fn simulated_service(config: &NfccConfig) -> (NfcService, Arc<SimulatedController>) {
    let controller = SimulatedController::new(&config.simulator);
    let host = controller.host();
    let session = Arc::new(RfSession::new());

    let power = PowerSwitch::new(
        controller.clone(),
        host.clone(),
        session.clone(),
        host,
    )
    .with_config_timeout(config.power.config_timeout());
    let tda = TdaManager::new(controller.clone()).with_timeout(config.tda.timeout());

    let service = NfcService::new(power, tda, session);
    service.initialize(config);
    (service, controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimCardConfig;
    use std::sync::mpsc::channel;

    #[test]
    fn test_completion_runs_on_worker_thread() {
        let controller = SimulatedController::new(&SimulatorConfig::default());
        let (tx, rx) = channel();
        let issuer = thread::current().id();
        controller
            .power_off_sleep_mode(
                true,
                Arc::new(move |event: DmEvent| {
                    let _ = tx.send((thread::current().id(), format!("{:?}", event)));
                }),
            )
            .unwrap();

        let (completer, event) = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_ne!(completer, issuer);
        assert!(event.contains("PowerModeChange"));
        assert_eq!(controller.power_mode(), DmPowerState::OffSleep);
    }

    #[test]
    fn test_reject_fault() {
        let controller = SimulatedController::new(&SimulatorConfig::default());
        controller.set_faults(SimFaults {
            reject: true,
            ..Default::default()
        });
        let result = controller.get_config(ConfigTag::DYNAMIC_POWER, Arc::new(|_: DmEvent| {}));
        assert_eq!(result, Err(FirmwareError::Rejected(NfcStatus::REJECTED)));
        assert_eq!(
            controller.commands(),
            vec![SimCommand::GetConfig(ConfigTag::DYNAMIC_POWER)]
        );
    }

    #[test]
    fn test_get_config_layout() {
        let controller = SimulatedController::new(&SimulatorConfig::default());
        controller.set_dynamic_power(&[0x07]);
        let (tx, rx) = channel();
        controller
            .get_config(
                ConfigTag::DYNAMIC_POWER,
                Arc::new(move |event: DmEvent| {
                    if let DmEvent::GetConfig { tlvs, .. } = event {
                        let _ = tx.send(tlvs);
                    }
                }),
            )
            .unwrap();
        let tlvs = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(tlvs, vec![0x01, 0xA1, 0xA4, 0x01, 0x07]);
    }

    #[test]
    fn test_oversized_config_value_is_truncated_to_its_length_byte() {
        let controller = SimulatedController::new(&SimulatorConfig::default());
        controller.set_dynamic_power(&[0x5A; 300]);
        let (tx, rx) = channel();
        controller
            .get_config(
                ConfigTag::DYNAMIC_POWER,
                Arc::new(move |event: DmEvent| {
                    if let DmEvent::GetConfig { tlvs, .. } = event {
                        let _ = tx.send(tlvs);
                    }
                }),
            )
            .unwrap();
        let tlvs = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(tlvs[3], 0xFF);
        assert_eq!(tlvs.len(), 4 + 255);
    }

    #[test]
    fn test_slot_counts_match_carried_entries() {
        let slot = SimSlotConfig {
            id: 1,
            status: 0,
            protocols: vec![0x04; 256],
            card_info: vec![SimCardConfig {
                tlv_type: 1,
                value: "ab".repeat(256),
            }],
        };

        let raw = raw_slot(&slot);
        assert_eq!(raw.number_of_protocols, 255);
        assert_eq!(raw.protocols.len(), 255);
        assert_eq!(raw.number_of_card_info, 1);
        assert_eq!(raw.card_tlv_info[0].length, 255);
        assert_eq!(raw.card_tlv_info[0].value.len(), 255);
    }
}
