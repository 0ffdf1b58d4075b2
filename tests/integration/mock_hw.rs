//! Mock hardware adapter for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without shelling out to ipmitool or smartctl. Temperatures are
//! plain fields the test rewrites between ticks.

use hybridfan::app::events::AppEvent;
use hybridfan::app::ports::{ActuatorPort, EventSink, FanSpeeds, SensorPort};
use hybridfan::control::state::{FanMode, FanZone};
use hybridfan::error::{ActuatorError, SensorError};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    SetDuty { zone: FanZone, duty: u8 },
    SetMode(FanMode),
    ColdReset,
}

/// How a zone's realized speed is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedModel {
    /// Speed tracks the last commanded duty against `max_rpm`.
    Follow { max_rpm: u32 },
    /// Fans stuck at a fixed speed.
    Fixed(u32),
    /// Read-back fails.
    Unreadable,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    pub cpu_temp: Result<f32, SensorError>,
    pub devices: Result<Vec<String>, SensorError>,
    pub storage_temps: Vec<f32>,
    pub cpu_speed: SpeedModel,
    pub storage_speed: SpeedModel,
    /// Number of `read_storage_temperatures` calls.
    pub storage_reads: usize,
    /// Number of `read_fan_speeds` calls.
    pub speed_reads: usize,
}

#[allow(dead_code)]
impl MockHardware {
    /// A healthy host: cool CPU, four drives on target, fans that follow.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            cpu_temp: Ok(35.0),
            devices: Ok(vec![
                "/dev/sda".into(),
                "/dev/sdb".into(),
                "/dev/sdc".into(),
                "/dev/sdd".into(),
            ]),
            storage_temps: vec![36.0, 36.0, 36.0, 36.0],
            cpu_speed: SpeedModel::Follow { max_rpm: 1600 },
            storage_speed: SpeedModel::Follow { max_rpm: 1400 },
            storage_reads: 0,
            speed_reads: 0,
        }
    }

    pub fn last_duty(&self, zone: FanZone) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::SetDuty { zone: z, duty } if *z == zone => Some(*duty),
            _ => None,
        })
    }

    pub fn duty_commands(&self, zone: FanZone) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::SetDuty { zone: z, duty } if *z == zone => Some(*duty),
                _ => None,
            })
            .collect()
    }

    pub fn resets(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == ActuatorCall::ColdReset)
            .count()
    }

    /// Calls issued after the most recent cold reset.
    pub fn calls_after_reset(&self) -> &[ActuatorCall] {
        match self.calls.iter().rposition(|c| *c == ActuatorCall::ColdReset) {
            Some(i) => &self.calls[i + 1..],
            None => &[],
        }
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn speed(&self, zone: FanZone) -> Result<u32, ActuatorError> {
        let model = match zone {
            FanZone::Cpu => self.cpu_speed,
            FanZone::Storage => self.storage_speed,
        };
        match model {
            SpeedModel::Follow { max_rpm } => {
                let duty = self.last_duty(zone).unwrap_or(0);
                Ok(max_rpm * u32::from(duty) / 100)
            }
            SpeedModel::Fixed(rpm) => Ok(rpm),
            SpeedModel::Unreadable => Err(ActuatorError::Unreadable),
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_cpu_temperature(&mut self) -> Result<f32, SensorError> {
        self.cpu_temp
    }

    fn enumerate_storage_devices(&mut self) -> Result<Vec<String>, SensorError> {
        self.devices.clone()
    }

    fn read_storage_temperatures(&mut self, _devices: &[String]) -> Vec<f32> {
        self.storage_reads += 1;
        self.storage_temps.clone()
    }
}

impl ActuatorPort for MockHardware {
    fn set_zone_duty(&mut self, zone: FanZone, duty: u8) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::SetDuty { zone, duty });
        Ok(())
    }

    fn set_fan_mode(&mut self, mode: FanMode) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::SetMode(mode));
        Ok(())
    }

    fn read_fan_speeds(&mut self) -> FanSpeeds {
        self.speed_reads += 1;
        FanSpeeds {
            cpu: self.speed(FanZone::Cpu),
            storage: self.speed(FanZone::Storage),
        }
    }

    fn reset_management_controller(&mut self) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::ColdReset);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn last_matching(&self, pred: impl Fn(&AppEvent) -> bool) -> Option<&AppEvent> {
        self.events.iter().rev().find(|e| pred(e))
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
