//! Integration tests for the ControlService → controllers → actuators
//! pipeline.
//!
//! These run against [`MockHardware`] and verify the full iteration from a
//! temperature reading down to the actuator calls, including both
//! cross-zone overrides and device hot-plug.

use std::time::Duration;

use crate::mock_hw::{ActuatorCall, MockHardware, RecordingSink};

use hybridfan::app::events::AppEvent;
use hybridfan::app::service::ControlService;
use hybridfan::config::ControllerConfig;
use hybridfan::control::pid::PidBranch;
use hybridfan::control::state::{CpuFanLevel, FanMode, FanZone};
use hybridfan::error::SensorError;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn make_service() -> (ControlService, MockHardware, RecordingSink) {
    let mut service = ControlService::new(ControllerConfig::default());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    service.start(secs(0), &mut hw, &mut sink);
    (service, hw, sink)
}

fn last_storage_cycle(sink: &RecordingSink) -> hybridfan::app::events::StorageCycleRecord {
    match sink.last_matching(|e| matches!(e, AppEvent::StorageCycle(_))) {
        Some(AppEvent::StorageCycle(r)) => r.clone(),
        other => panic!("no storage cycle recorded, got {other:?}"),
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_asserts_full_mode_then_start_duty() {
    let (service, hw, sink) = make_service();

    assert_eq!(
        hw.calls,
        vec![
            ActuatorCall::SetMode(FanMode::Full),
            ActuatorCall::SetDuty {
                zone: FanZone::Storage,
                duty: 60
            },
        ]
    );
    assert_eq!(
        sink.events,
        vec![AppEvent::Started {
            mode: FanMode::Full,
            storage_duty: 60
        }]
    );
    assert_eq!(service.cpu_level(), CpuFanLevel::Unset);
    assert_eq!(service.storage_duty(), 60);
}

// ── CPU zone ──────────────────────────────────────────────────

#[test]
fn first_cool_reading_commands_low_duty() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.cpu_temp = Ok(35.0);

    service.tick(secs(0), &mut hw, &mut sink);

    assert_eq!(service.cpu_level(), CpuFanLevel::Low);
    assert_eq!(hw.last_duty(FanZone::Cpu), Some(30));
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::CpuLevelChanged {
                from: CpuFanLevel::Unset,
                to: CpuFanLevel::Low,
                ..
            }
        )),
        1
    );
}

#[test]
fn invalid_cpu_reading_fails_to_high() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.cpu_temp = Ok(35.0);
    service.tick(secs(0), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::Low);

    hw.cpu_temp = Err(SensorError::Unparseable);
    service.tick(secs(1), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::High);
    assert_eq!(hw.last_duty(FanZone::Cpu), Some(100));

    hw.cpu_temp = Ok(-5.0);
    service.tick(secs(2), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::High);
}

#[test]
fn unchanged_level_sends_no_cpu_command() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.cpu_temp = Ok(45.0);
    service.tick(secs(0), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::Med);

    for t in 1..5 {
        hw.cpu_temp = Ok(44.0 + t as f32);
        service.tick(secs(t), &mut hw, &mut sink);
    }
    assert_eq!(hw.duty_commands(FanZone::Cpu), vec![60]);
}

// ── CPU → storage override ────────────────────────────────────

#[test]
fn storage_override_is_sticky_until_cpu_leaves_high() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.storage_temps = vec![34.0, 34.0];

    // Hot CPU: High and storage forced to the ceiling.
    hw.cpu_temp = Ok(65.0);
    service.tick(secs(0), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::High);
    assert!(service.state().storage_override_active);
    assert_eq!(hw.last_duty(FanZone::Storage), Some(100));

    // The PID ran underneath and wants the floor, but the latch holds.
    assert_eq!(last_storage_cycle(&sink).new_duty, 30);
    assert_eq!(service.storage_duty(), 100);

    // Below the override temperature but still High: stays latched.
    hw.cpu_temp = Ok(59.0);
    service.tick(secs(1), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::High);
    assert!(service.state().storage_override_active);
    assert_eq!(hw.last_duty(FanZone::Storage), Some(100));

    // CPU leaves High: latch clears and the PID duty is restored.
    hw.cpu_temp = Ok(52.0);
    service.tick(secs(2), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::Med);
    assert!(!service.state().storage_override_active);
    assert_eq!(hw.last_duty(FanZone::Storage), Some(30));

    let overrides: Vec<bool> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::StorageOverride { engaged, .. } => Some(*engaged),
            _ => None,
        })
        .collect();
    assert_eq!(overrides, vec![true, false]);
}

#[test]
fn storage_override_needs_hot_cpu() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.cpu_temp = Ok(59.0);
    service.tick(secs(0), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::High);
    assert!(!service.state().storage_override_active);
}

#[test]
fn storage_override_disabled_by_config() {
    let config = ControllerConfig {
        storage_assists_cpu: false,
        ..ControllerConfig::default()
    };
    let mut service = ControlService::new(config);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    service.start(secs(0), &mut hw, &mut sink);

    hw.cpu_temp = Ok(70.0);
    service.tick(secs(0), &mut hw, &mut sink);
    assert!(!service.state().storage_override_active);
    assert_eq!(hw.last_duty(FanZone::Storage), Some(60));
}

// ── Storage zone ──────────────────────────────────────────────

#[test]
fn storage_on_target_keeps_duty_without_commands() {
    let (mut service, mut hw, mut sink) = make_service();
    service.tick(secs(0), &mut hw, &mut sink);

    let r = last_storage_cycle(&sink);
    assert_eq!(r.device_count, 4);
    assert_eq!(r.old_duty, 60);
    assert_eq!(r.new_duty, 60);
    assert_eq!(r.branch, PidBranch::Normal);
    assert_eq!(r.fan_mode, FanMode::Full);
    assert_eq!(r.storage_rpm, Some(840));
    assert_eq!(hw.duty_commands(FanZone::Storage), vec![60]);
}

#[test]
fn storage_is_polled_only_every_interval() {
    let (mut service, mut hw, mut sink) = make_service();
    for t in 0..=180 {
        service.tick(secs(t), &mut hw, &mut sink);
    }
    // Polls at 0, 90 and 180.
    assert_eq!(hw.storage_reads, 3);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::StorageCycle(_))), 3);
}

#[test]
fn storage_warming_raises_duty() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.storage_temps = vec![36.5, 37.0];
    service.tick(secs(0), &mut hw, &mut sink);

    // error 0.75: P = 4.0, D = 120 * 0.75 / 1.5 = 60
    let r = last_storage_cycle(&sink);
    assert_eq!(r.new_duty, 100);
    assert!((r.terms.d - 60.0).abs() < 1e-3);
    assert!((service.pid().previous_error() - 0.75).abs() < 1e-4);
    assert_eq!(hw.last_duty(FanZone::Storage), Some(100));
}

#[test]
fn hot_drive_forces_ceiling() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.storage_temps = vec![30.0, 41.0];
    service.tick(secs(0), &mut hw, &mut sink);

    let r = last_storage_cycle(&sink);
    assert_eq!(r.branch, PidBranch::SafetyOverride);
    assert_eq!(r.new_duty, 100);
    assert_eq!(hw.last_duty(FanZone::Storage), Some(100));
}

#[test]
fn no_storage_readings_fail_to_ceiling() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.storage_temps = Vec::new();
    service.tick(secs(0), &mut hw, &mut sink);

    let r = last_storage_cycle(&sink);
    assert_eq!(r.branch, PidBranch::InvalidReading);
    assert_eq!(r.new_duty, 100);
    assert!(r.hd_max < 0.0);
}

// ── Storage → CPU override ────────────────────────────────────

#[test]
fn high_storage_duty_forces_cpu_high_next_tick() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.cpu_temp = Ok(35.0);
    hw.storage_temps = vec![39.0, 37.0];

    service.tick(secs(0), &mut hw, &mut sink);
    // Level decided before the PID ran this tick.
    assert_eq!(service.cpu_level(), CpuFanLevel::Low);
    assert!(service.state().cpu_override_active);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CpuOverride { engaged: true, .. })),
        1
    );

    service.tick(secs(1), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::High);
    assert_eq!(hw.last_duty(FanZone::Cpu), Some(100));
}

#[test]
fn cpu_override_releases_when_storage_cools() {
    let (mut service, mut hw, mut sink) = make_service();
    hw.cpu_temp = Ok(35.0);
    hw.storage_temps = vec![39.0];
    service.tick(secs(0), &mut hw, &mut sink);
    service.tick(secs(1), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::High);

    // Drives well below target: duty falls to the floor.
    hw.storage_temps = vec![30.0];
    service.tick(secs(90), &mut hw, &mut sink);
    assert!(!service.state().cpu_override_active);

    // Override gone; a reading at or below the low threshold drops to Low.
    service.tick(secs(91), &mut hw, &mut sink);
    assert_eq!(service.cpu_level(), CpuFanLevel::Low);
}

// ── Devices ───────────────────────────────────────────────────

#[test]
fn hot_plug_is_reported_and_exclusions_filtered() {
    let config = ControllerConfig {
        excluded_devices: vec!["/dev/sdd".into()],
        ..ControllerConfig::default()
    };
    let mut service = ControlService::new(config);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    service.start(secs(0), &mut hw, &mut sink);

    service.tick(secs(0), &mut hw, &mut sink);
    assert_eq!(service.state().devices, vec!["/dev/sda", "/dev/sdb", "/dev/sdc"]);

    hw.devices = Ok(vec!["/dev/sda".into(), "/dev/sdc".into(), "/dev/sde".into()]);
    service.tick(secs(90), &mut hw, &mut sink);

    match sink.last_matching(|e| matches!(e, AppEvent::DevicesChanged { .. })) {
        Some(AppEvent::DevicesChanged { added, removed }) => {
            assert_eq!(added, &vec!["/dev/sde".to_owned()]);
            assert_eq!(removed, &vec!["/dev/sdb".to_owned()]);
        }
        other => panic!("expected DevicesChanged, got {other:?}"),
    }
    assert_eq!(last_storage_cycle(&sink).device_count, 3);
}

#[test]
fn enumeration_failure_keeps_known_devices() {
    let (mut service, mut hw, mut sink) = make_service();
    service.tick(secs(0), &mut hw, &mut sink);
    assert_eq!(service.state().devices.len(), 4);

    hw.devices = Err(SensorError::CommandFailed);
    service.tick(secs(90), &mut hw, &mut sink);
    assert_eq!(service.state().devices.len(), 4);
    assert_eq!(last_storage_cycle(&sink).device_count, 4);
}
