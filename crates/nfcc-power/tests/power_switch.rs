//! Power level transitions against the simulated controller

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nfcc_power::sim::{simulated_service, SimCommand, SimFaults, SimulatedController};
use nfcc_power::{
    DmPowerState, NfcService, NfcStatus, NfccConfig, PowerActivity, PowerError, PowerLevel,
    ScreenOffPowerState,
};
use rstest::rstest;

fn service(toml: &str) -> (Arc<NfcService>, Arc<SimulatedController>) {
    let config: NfccConfig = toml.parse().unwrap();
    let (service, controller) = simulated_service(&config);
    (Arc::new(service), controller)
}

fn full_power() -> (Arc<NfcService>, Arc<SimulatedController>) {
    service("")
}

#[test]
fn test_same_level_is_noop() {
    let (service, controller) = full_power();

    service.power().set_level(PowerLevel::FullPower).unwrap();
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);
    assert!(controller.commands().is_empty());
}

#[rstest]
#[case(PowerLevel::FullPower)]
#[case(PowerLevel::LowPower)]
#[case(PowerLevel::PowerOff)]
fn test_unknown_level_rejects_transitions(#[case] target: PowerLevel) {
    let (service, controller) = service("[power]\ninitial_level = \"unknown\"\n");

    let err = service.power().set_level(target).unwrap_err();
    assert!(matches!(err, PowerError::UnknownLevel));
    assert!(!service.power_set_level(target));
    assert_eq!(service.power_get_level(), PowerLevel::Unknown);
    assert!(controller.commands().is_empty());
}

#[test]
fn test_low_power_round_trip() {
    let (service, controller) = full_power();

    assert!(service.power_set_level(PowerLevel::LowPower));
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
    assert_eq!(service.power().device_power_state(), DmPowerState::OffSleep);
    assert_eq!(controller.power_mode(), DmPowerState::OffSleep);

    assert!(service.power_set_level(PowerLevel::FullPower));
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);
    assert_eq!(service.power().device_power_state(), DmPowerState::Full);
    assert_eq!(
        controller.commands(),
        vec![
            SimCommand::PowerOffSleep(true),
            SimCommand::PowerOffSleep(false),
            SimCommand::StartupConfig,
        ]
    );
}

#[test]
fn test_power_off_is_idempotent() {
    let (service, controller) = full_power();

    assert!(service.power_set_level(PowerLevel::PowerOff));
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
    assert!(service.power_set_level(PowerLevel::PowerOff));
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
    assert_eq!(controller.commands(), vec![SimCommand::PowerOffSleep(true)]);
}

#[test]
fn test_low_power_after_power_off_is_noop() {
    let (service, controller) = full_power();

    assert!(service.power_set_level(PowerLevel::PowerOff));
    assert!(service.power_set_level(PowerLevel::LowPower));
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
    assert_eq!(service.power().device_power_state(), DmPowerState::OffSleep);
    assert_eq!(controller.commands(), vec![SimCommand::PowerOffSleep(true)]);
}

#[test]
fn test_wake_from_power_off_waits_for_rf_deactivation() {
    let (service, controller) = full_power();
    assert!(service.power_set_level(PowerLevel::PowerOff));
    service.session().activated();

    let transition = {
        let service = service.clone();
        thread::spawn(move || service.power_set_level(PowerLevel::FullPower))
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!transition.is_finished());
    assert_eq!(controller.commands(), vec![SimCommand::PowerOffSleep(true)]);
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);

    service.session().deactivated();
    assert!(transition.join().unwrap());
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);
    assert_eq!(
        controller.commands(),
        vec![
            SimCommand::PowerOffSleep(true),
            SimCommand::PowerOffSleep(false),
            SimCommand::StartupConfig,
        ]
    );
}

#[test]
fn test_full_power_policy_keeps_controller_awake() {
    let (service, controller) = service("[power]\nscreen_off_power_state = 1\n");

    assert!(service.power_set_level(PowerLevel::LowPower));
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);
    assert!(controller.commands().is_empty());
}

#[test]
fn test_card_emulation_policy_has_no_transition() {
    let (service, controller) = service("[power]\nscreen_off_power_state = 2\n");

    let err = service.power().set_level(PowerLevel::LowPower).unwrap_err();
    assert!(matches!(err, PowerError::NoTransition { .. }));
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);
    assert!(controller.commands().is_empty());
}

#[test]
fn test_screen_off_state_changes_policy_at_runtime() {
    let (service, controller) = service("[power]\nscreen_off_power_state = 1\n");

    assert!(service.power_set_screen_off_state(ScreenOffPowerState::PowerOff));
    assert_eq!(service.power().screen_off_power_state(), 0);
    assert!(service.power_set_level(PowerLevel::LowPower));
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
    assert_eq!(controller.commands(), vec![SimCommand::PowerOffSleep(true)]);
}

#[test]
fn test_rejected_sleep_request_keeps_level() {
    let (service, controller) = full_power();
    controller.set_faults(SimFaults {
        reject: true,
        ..Default::default()
    });

    let err = service.power().set_level(PowerLevel::LowPower).unwrap_err();
    assert!(matches!(err, PowerError::Rejected(_)));
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);
    assert_eq!(service.power().device_power_state(), DmPowerState::Full);
}

#[test]
fn test_enter_sleep_twice_fails() {
    let (service, _controller) = full_power();

    service.power().set_power_off_sleep_state(true).unwrap();
    let err = service.power().set_power_off_sleep_state(true).unwrap_err();
    assert!(matches!(
        err,
        PowerError::AlreadyInState(DmPowerState::OffSleep)
    ));
}

#[test]
fn test_exit_sleep_from_full_fails() {
    let (service, controller) = full_power();

    let err = service.power().set_power_off_sleep_state(false).unwrap_err();
    assert!(matches!(err, PowerError::AlreadyInState(DmPowerState::Full)));
    assert!(controller.commands().is_empty());
}

#[test]
fn test_abort_unblocks_unconfirmed_wake() {
    let (service, controller) = full_power();
    service.power().set_level(PowerLevel::LowPower).unwrap();

    controller.set_faults(SimFaults {
        silent: true,
        ..Default::default()
    });
    let waker = {
        let service = service.clone();
        thread::spawn(move || service.power().set_level(PowerLevel::FullPower))
    };

    while !waker.is_finished() {
        service.power_abort();
        thread::sleep(Duration::from_millis(10));
    }

    let err = waker.join().unwrap().unwrap_err();
    assert!(matches!(err, PowerError::NotConfirmed(DmPowerState::Unknown)));
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
    assert!(!controller.commands().contains(&SimCommand::StartupConfig));

    // Device state is no longer known to be asleep, so waking has no path
    controller.clear_faults();
    let err = service.power().set_level(PowerLevel::FullPower).unwrap_err();
    assert!(matches!(err, PowerError::NoTransition { .. }));
}

#[test]
fn test_failed_wake_status_is_not_confirmed() {
    let (service, controller) = full_power();
    service.power().set_level(PowerLevel::LowPower).unwrap();

    controller.set_faults(SimFaults {
        status: Some(NfcStatus::FAILED),
        ..Default::default()
    });
    let err = service.power().set_level(PowerLevel::FullPower).unwrap_err();
    assert!(matches!(err, PowerError::NotConfirmed(DmPowerState::Unknown)));
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
    assert_eq!(service.power().device_power_state(), DmPowerState::Unknown);
    assert_eq!(
        controller.commands(),
        vec![
            SimCommand::PowerOffSleep(true),
            SimCommand::PowerOffSleep(false),
        ]
    );
}

#[test]
fn test_low_power_waits_for_rf_deactivation() {
    let (service, controller) = full_power();
    service.session().activated();

    let transition = {
        let service = service.clone();
        thread::spawn(move || service.power_set_level(PowerLevel::LowPower))
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!transition.is_finished());
    assert!(controller.commands().is_empty());
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);

    service.session().deactivated();
    assert!(transition.join().unwrap());
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
}

#[test]
fn test_activity_mask_reports_any_active() {
    let (service, _controller) = full_power();

    assert!(service.power_set_mode_on(PowerActivity::DISCOVERY));
    assert!(service.power_set_mode_on(PowerActivity::SE_ROUTING));
    assert!(service.power_set_mode_off(PowerActivity::DISCOVERY));
    assert_eq!(service.power().activity(), PowerActivity::SE_ROUTING);
    assert!(!service.power_set_mode_off(PowerActivity::SE_ROUTING));
    assert!(!service.power_set_mode_off(PowerActivity::HOST_ROUTING));
    assert!(service.power().activity().is_empty());
}

#[test]
fn test_get_level_does_not_block_during_transition() {
    let (service, controller) = full_power();
    controller.set_latency(Duration::from_millis(200));

    let transition = {
        let service = service.clone();
        thread::spawn(move || service.power_set_level(PowerLevel::LowPower))
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(service.power_get_level(), PowerLevel::FullPower);
    assert!(transition.join().unwrap());
    assert_eq!(service.power_get_level(), PowerLevel::LowPower);
}
