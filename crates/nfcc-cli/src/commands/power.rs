//! Power commands - status, level sequences, activity mask

use anyhow::Result;
use clap::ValueEnum;
use nfcc_power::{NfcService, PowerActivity, PowerLevel, ScreenOffPowerState};

use crate::output::{LevelRow, ModeRow, OutputContext};

/// Power level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    FullPower,
    LowPower,
    PowerOff,
}

impl From<LevelArg> for PowerLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::FullPower => PowerLevel::FullPower,
            LevelArg::LowPower => PowerLevel::LowPower,
            LevelArg::PowerOff => PowerLevel::PowerOff,
        }
    }
}

/// Screen-off power state accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScreenOffArg {
    PowerOff,
    Full,
    CardEmulation,
}

impl From<ScreenOffArg> for ScreenOffPowerState {
    fn from(arg: ScreenOffArg) -> Self {
        match arg {
            ScreenOffArg::PowerOff => ScreenOffPowerState::PowerOff,
            ScreenOffArg::Full => ScreenOffPowerState::Full,
            ScreenOffArg::CardEmulation => ScreenOffPowerState::CardEmulation,
        }
    }
}

/// Power consumer accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActivityArg {
    Discovery,
    SeRouting,
    SeConnected,
    HostRouting,
}

impl From<ActivityArg> for PowerActivity {
    fn from(arg: ActivityArg) -> Self {
        match arg {
            ActivityArg::Discovery => PowerActivity::DISCOVERY,
            ActivityArg::SeRouting => PowerActivity::SE_ROUTING,
            ActivityArg::SeConnected => PowerActivity::SE_CONNECTED,
            ActivityArg::HostRouting => PowerActivity::HOST_ROUTING,
        }
    }
}

fn activity_names(activity: PowerActivity) -> String {
    if activity.is_empty() {
        return "-".to_string();
    }
    activity
        .iter_names()
        .map(|(name, _)| name.to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

/// Show the current power state
pub fn status(service: &NfcService, ctx: &OutputContext) -> Result<()> {
    let power = service.power();
    let screen_off = power.screen_off_power_state();
    let policy = ScreenOffPowerState::from_raw(screen_off)
        .map(|state| state.to_string())
        .unwrap_or_else(|| format!("raw {}", screen_off));

    let pairs = vec![
        ("Level", service.power_get_level().to_string()),
        ("Device", power.device_power_state().to_string()),
        ("Screen Off", policy),
        ("Activity", activity_names(power.activity())),
    ];
    ctx.print_kv(&pairs);
    Ok(())
}

/// Apply a sequence of power levels, optionally after changing the screen-off state
pub fn level(
    service: &NfcService,
    levels: &[LevelArg],
    screen_off: Option<ScreenOffArg>,
    ctx: &OutputContext,
) -> Result<()> {
    if let Some(state) = screen_off {
        service.power_set_screen_off_state(state.into());
    }

    let mut rows = Vec::with_capacity(levels.len());
    let mut failures = 0;
    for &arg in levels {
        let requested = PowerLevel::from(arg);
        let ok = service.power_set_level(requested);
        if !ok {
            failures += 1;
        }
        rows.push(LevelRow {
            requested: requested.to_string(),
            result: if ok { "ok" } else { "failed" }.to_string(),
            level: service.power_get_level().to_string(),
            device: service.power().device_power_state().to_string(),
        });
    }

    ctx.print(&rows);
    if failures > 0 {
        ctx.warn(&format!("{} of {} transitions failed", failures, levels.len()));
    }
    Ok(())
}

/// Set and clear activity bits, showing the mask after each change
pub fn mode(
    service: &NfcService,
    on: &[ActivityArg],
    off: &[ActivityArg],
    ctx: &OutputContext,
) -> Result<()> {
    let mut rows = Vec::with_capacity(on.len() + off.len());
    for &arg in on {
        let any_active = service.power_set_mode_on(arg.into());
        rows.push(ModeRow {
            change: format!("+{}", activity_names(arg.into())),
            activity: activity_names(service.power().activity()),
            any_active,
        });
    }
    for &arg in off {
        let any_active = service.power_set_mode_off(arg.into());
        rows.push(ModeRow {
            change: format!("-{}", activity_names(arg.into())),
            activity: activity_names(service.power().activity()),
            any_active,
        });
    }

    ctx.print(&rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_names() {
        assert_eq!(activity_names(PowerActivity::empty()), "-");
        assert_eq!(
            activity_names(PowerActivity::DISCOVERY | PowerActivity::HOST_ROUTING),
            "discovery|host_routing"
        );
    }
}
