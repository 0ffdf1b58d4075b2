//! Control service — the hexagonal core.
//!
//! [`ControlService`] owns the controller state, the storage PID and the
//! fan verifier. All I/O flows through port traits injected at call sites,
//! making the whole loop testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │        ControlService         │
//! ActuatorPort ◀──│ CPU levels · PID · Overrides  │
//!                 │        · Verification         │
//!                 └──────────────────────────────┘
//! ```
//!
//! One iteration: CPU temperature → CPU level → CPU→storage override →
//! (every storage interval) drive temperatures → PID → storage command →
//! verification.

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::control::coupling::{OverrideAction, storage_override_action};
use crate::control::cpu_level::{CpuThresholds, decide_level};
use crate::control::pid::{StoragePid, round_duty};
use crate::control::state::{ControllerState, CpuFanLevel, FanMode, FanZone, valid_temp};
use crate::error::{Error, SensorError};
use crate::verification::{Expectation, FanVerifier, RecoveryAction};

use super::events::{AppEvent, StorageCycleRecord};
use super::ports::{ActuatorPort, EventSink, SensorPort, TimePort};

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

/// The control service orchestrates all domain logic.
pub struct ControlService {
    config: ControllerConfig,
    thresholds: CpuThresholds,
    state: ControllerState,
    pid: StoragePid,
    verifier: FanVerifier,
    storage_interval: Duration,
    /// Whether the last CPU read was usable (for edge-triggered logging).
    cpu_sensor_ok: bool,
}

impl ControlService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch the fans; call [`start`](Self::start) next.
    pub fn new(config: ControllerConfig) -> Self {
        let thresholds = CpuThresholds::from_config(&config);
        let state = ControllerState::new(config.hd_start_duty);
        let pid = StoragePid::from_config(&config);
        let verifier = FanVerifier::new(&config);
        let storage_interval = Duration::from_secs(config.hd_polling_interval_secs);

        Self {
            config,
            thresholds,
            state,
            pid,
            verifier,
            storage_interval,
            cpu_sensor_ok: true,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Take over the fans: full manual mode, storage start duty.
    pub fn start(&mut self, now: Duration, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.assert_full_mode(hw);
        let duty = self.config.hd_start_duty;
        self.command(hw, FanZone::Storage, duty);
        self.verifier.notify_change(now);
        sink.emit(&AppEvent::Started {
            mode: self.state.fan_mode,
            storage_duty: duty,
        });
        info!("ControlService started: fan mode {}, storage duty {}%", self.state.fan_mode, duty);
    }

    /// Start, then run one iteration per poll period until the process ends.
    pub fn run_forever(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
        clock: &impl TimePort,
    ) -> ! {
        let period = Duration::from_millis(self.config.cpu_poll_interval_ms);
        self.start(clock.uptime(), hw, sink);
        loop {
            self.tick(clock.uptime(), hw, sink);
            clock.sleep(period);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control iteration at uptime `now`.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now: Duration,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        // 1. CPU temperature
        let cpu_temp = self.read_cpu(hw);
        self.state.sample.cpu_max = cpu_temp;

        // 2. CPU level state machine
        self.update_cpu_level(now, cpu_temp, hw, sink);

        // 3. CPU → storage override
        self.apply_storage_override(now, cpu_temp, hw, sink);

        // 4. Storage PID, gated to the storage polling interval
        if self.state.storage_poll_due(now, self.storage_interval) {
            self.storage_cycle(now, hw, sink);
        }

        // 5. Verification & recovery
        if self.verifier.due(now) {
            self.verify(now, hw, sink);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn cpu_level(&self) -> CpuFanLevel {
        self.state.cpu_level
    }

    /// Duty currently commanded on the storage zone.
    pub fn storage_duty(&self) -> u8 {
        self.state.commanded_storage_duty(self.config.hd_high_duty)
    }

    pub fn verifier(&self) -> &FanVerifier {
        &self.verifier
    }

    pub fn pid(&self) -> &StoragePid {
        &self.pid
    }

    // ── Stages ────────────────────────────────────────────────

    fn read_cpu(&mut self, hw: &mut impl SensorPort) -> Option<f32> {
        let reading = hw
            .read_cpu_temperature()
            .and_then(|t| valid_temp(Some(t)).ok_or(SensorError::Invalid));
        match (reading, self.cpu_sensor_ok) {
            (Err(e), true) => warn!(
                "CPU temperature unavailable ({}), failing toward maximum cooling",
                Error::from(e)
            ),
            (Ok(_), false) => info!("CPU temperature readable again"),
            _ => {}
        }
        self.cpu_sensor_ok = reading.is_ok();
        reading.ok()
    }

    fn update_cpu_level(
        &mut self,
        now: Duration,
        cpu_temp: Option<f32>,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let from = self.state.cpu_level;
        let to = decide_level(cpu_temp, from, self.state.cpu_override_active, &self.thresholds);
        if to == from {
            return;
        }

        let duty = self.config.cpu_duty(to);
        self.command(hw, FanZone::Cpu, duty);
        self.verifier.notify_change(now);
        self.state.cpu_level = to;
        sink.emit(&AppEvent::CpuLevelChanged {
            from,
            to,
            cpu_temp,
            duty,
        });
    }

    fn apply_storage_override(
        &mut self,
        now: Duration,
        cpu_temp: Option<f32>,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let action = storage_override_action(
            self.state.cpu_level,
            cpu_temp,
            self.state.storage_override_active,
            &self.config,
        );
        let engaged = match action {
            OverrideAction::Hold => return,
            OverrideAction::Engage => true,
            OverrideAction::Release => false,
        };

        self.state.storage_override_active = engaged;
        let duty = self.storage_duty();
        self.command(hw, FanZone::Storage, duty);
        self.verifier.notify_change(now);
        sink.emit(&AppEvent::StorageOverride {
            engaged,
            cpu_temp,
            duty,
        });
    }

    fn storage_cycle(
        &mut self,
        now: Duration,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        self.state.last_storage_poll = Some(now);

        // Device list, re-queried for hot-plug
        match hw.enumerate_storage_devices() {
            Ok(found) => {
                let devices: Vec<String> = found
                    .into_iter()
                    .filter(|d| !self.config.excluded_devices.contains(d))
                    .collect();
                self.update_devices(devices, sink);
            }
            Err(e) => warn!(
                "Storage enumeration failed ({}), keeping {} known devices",
                Error::from(e),
                self.state.devices.len()
            ),
        }

        let readings = hw.read_storage_temperatures(&self.state.devices);
        self.state.sample.set_storage(&readings);
        let sample = &self.state.sample;
        if !sample.has_storage() {
            warn!("No valid storage temperature, failing toward maximum cooling");
        }

        // PID
        let old_duty = round_duty(self.state.storage_duty);
        let step = self.pid.step(sample.hd_max, sample.hd_avg, self.state.storage_duty);
        self.state.storage_duty = step.duty_f;

        // Storage → CPU coupling, consumed next iteration
        if step.cpu_override != self.state.cpu_override_active {
            self.state.cpu_override_active = step.cpu_override;
            sink.emit(&AppEvent::CpuOverride {
                engaged: step.cpu_override,
                storage_duty: step.duty,
            });
        }

        // Command unless the CPU override holds the zone at its ceiling
        if !self.state.storage_override_active && step.duty != old_duty {
            self.command(hw, FanZone::Storage, step.duty);
            self.verifier.notify_change(now);
        }

        let storage_rpm = hw.read_zone_speed(FanZone::Storage).ok();
        let sample = &self.state.sample;
        sink.emit(&AppEvent::StorageCycle(StorageCycleRecord {
            device_count: self.state.devices.len(),
            hd_min: sample.hd_min,
            hd_max: sample.hd_max,
            hd_avg: sample.hd_avg,
            error: step.error,
            fan_mode: self.state.fan_mode,
            storage_rpm,
            old_duty,
            new_duty: step.duty,
            cpu_temp: sample.cpu_max,
            terms: step.terms,
            branch: step.branch,
        }));
    }

    fn update_devices(&mut self, devices: Vec<String>, sink: &mut impl EventSink) {
        if devices == self.state.devices {
            return;
        }
        let added: Vec<String> = devices
            .iter()
            .filter(|d| !self.state.devices.contains(d))
            .cloned()
            .collect();
        let removed: Vec<String> = self
            .state
            .devices
            .iter()
            .filter(|d| !devices.contains(d))
            .cloned()
            .collect();
        self.state.devices = devices;
        if !added.is_empty() || !removed.is_empty() {
            sink.emit(&AppEvent::DevicesChanged { added, removed });
        }
    }

    fn verify(&mut self, now: Duration, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let expect = Expectation {
            cpu_level: self.state.cpu_level,
            storage_duty: self.storage_duty(),
        };
        let speeds = hw.read_fan_speeds();
        let report = self.verifier.evaluate(now, expect, speeds.cpu, speeds.storage);
        sink.emit(&AppEvent::Verified(report));

        match report.action {
            RecoveryAction::None => {}
            RecoveryAction::Resend => self.reassert(hw),
            RecoveryAction::ColdReset(fault) => {
                debug!("Hardware fault: {fault}, cold-resetting management controller");
                if let Err(e) = hw.reset_management_controller() {
                    error!("Management controller reset failed: {}", Error::from(e));
                }
                sink.emit(&AppEvent::HardwareReset(fault));
                self.reassert(hw);
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Re-assert full manual mode and re-send both commanded duties.
    fn reassert(&mut self, hw: &mut impl ActuatorPort) {
        self.assert_full_mode(hw);
        let cpu_duty = self.config.cpu_duty(self.state.cpu_level);
        self.command(hw, FanZone::Cpu, cpu_duty);
        let storage_duty = self.storage_duty();
        self.command(hw, FanZone::Storage, storage_duty);
    }

    fn assert_full_mode(&mut self, hw: &mut impl ActuatorPort) {
        match hw.set_fan_mode(FanMode::Full) {
            Ok(()) => self.state.fan_mode = FanMode::Full,
            Err(e) => warn!("Setting fan mode {} failed: {}", FanMode::Full, Error::from(e)),
        }
    }

    fn command(&self, hw: &mut impl ActuatorPort, zone: FanZone, duty: u8) {
        if let Err(e) = hw.set_zone_duty(zone, duty) {
            warn!("Setting {zone} zone to {duty}% failed: {}", Error::from(e));
        }
    }
}
