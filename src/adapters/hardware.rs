//! Hardware adapter — bridges the host tools to the domain port traits.
//!
//! Owns the [`HostSensors`] and [`IpmiTool`] gateways, exposing them
//! through [`SensorPort`] and [`ActuatorPort`]. This is the only module in
//! the system that shells out.

use crate::app::ports::{ActuatorPort, FanSpeeds, SensorPort};
use crate::config::ControllerConfig;
use crate::control::state::{FanMode, FanZone};
use crate::error::{ActuatorError, SensorError};

use super::host_sensors::HostSensors;
use super::ipmi::IpmiTool;

/// Concrete adapter that combines all host I/O behind port traits.
pub struct HostHardware {
    sensors: HostSensors,
    ipmi: IpmiTool,
}

impl HostHardware {
    pub fn new(sensors: HostSensors, ipmi: IpmiTool) -> Self {
        Self { sensors, ipmi }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(HostSensors::new(config), IpmiTool::new(config))
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HostHardware {
    fn read_cpu_temperature(&mut self) -> Result<f32, SensorError> {
        self.sensors.cpu_temperature()
    }

    fn enumerate_storage_devices(&mut self) -> Result<Vec<String>, SensorError> {
        self.sensors.storage_devices()
    }

    fn read_storage_temperatures(&mut self, devices: &[String]) -> Vec<f32> {
        self.sensors.storage_temperatures(devices)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HostHardware {
    fn set_zone_duty(&mut self, zone: FanZone, duty: u8) -> Result<(), ActuatorError> {
        self.ipmi.set_zone_duty(zone, duty)
    }

    fn set_fan_mode(&mut self, mode: FanMode) -> Result<(), ActuatorError> {
        self.ipmi.set_fan_mode(mode)
    }

    fn read_fan_speeds(&mut self) -> FanSpeeds {
        self.ipmi.read_fan_speeds()
    }

    fn reset_management_controller(&mut self) -> Result<(), ActuatorError> {
        self.ipmi.cold_reset()
    }
}
