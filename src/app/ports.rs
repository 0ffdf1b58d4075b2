//! Port traits — the hexagonal boundary between the control core and the host.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (ipmitool, smartctl, lm-sensors, log output, config
//! file, clock) implement these traits. The
//! [`ControlService`](super::service::ControlService) consumes them via
//! generics, so the control core never shells out directly.
//!
//! Failures are typed but never fatal: the service turns every error into
//! a log record and a fail-safe action.

use std::time::Duration;

use crate::config::ControllerConfig;
use crate::control::state::{FanMode, FanZone};
use crate::error::{ActuatorError, ConfigError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: host → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain temperatures.
pub trait SensorPort {
    /// Hottest CPU temperature (°C). Polled every iteration.
    fn read_cpu_temperature(&mut self) -> Result<f32, SensorError>;

    /// Installed storage devices, in a stable order. Re-queried every
    /// storage poll so hot-plugged drives are picked up.
    fn enumerate_storage_devices(&mut self) -> Result<Vec<String>, SensorError>;

    /// Temperatures (°C) of the drives that could be read. An empty result
    /// means no usable storage reading this poll.
    fn read_storage_temperatures(&mut self, devices: &[String]) -> Vec<f32>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → management controller)
// ───────────────────────────────────────────────────────────────

/// Realized speed per zone. Each zone fails independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanSpeeds {
    pub cpu: Result<u32, ActuatorError>,
    pub storage: Result<u32, ActuatorError>,
}

impl FanSpeeds {
    pub fn zone(&self, zone: FanZone) -> Result<u32, ActuatorError> {
        match zone {
            FanZone::Cpu => self.cpu,
            FanZone::Storage => self.storage,
        }
    }
}

/// Write-side port: the domain calls this to command fans.
pub trait ActuatorPort {
    /// Set a zone's duty cycle (0–100).
    fn set_zone_duty(&mut self, zone: FanZone, duty: u8) -> Result<(), ActuatorError>;

    /// Switch the management controller's fan mode.
    fn set_fan_mode(&mut self, mode: FanMode) -> Result<(), ActuatorError>;

    /// Realized fan speed (RPM) of both zones, taken from one read-back so
    /// the two values describe the same moment.
    fn read_fan_speeds(&mut self) -> FanSpeeds;

    /// Realized fan speed (RPM) of a single zone.
    fn read_zone_speed(&mut self, zone: FanZone) -> Result<u32, ActuatorError> {
        self.read_fan_speeds().zone(zone)
    }

    /// Cold-reset the management controller.
    fn reset_management_controller(&mut self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate before returning or persisting. Invalid
/// ranges are rejected with [`ConfigError::ValidationFailed`], not
/// silently clamped.
pub trait ConfigPort {
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source for dwell and grace timers.
pub trait TimePort {
    /// Time since the process started. Never goes backwards.
    fn uptime(&self) -> Duration;

    /// Block the control thread until the next iteration.
    fn sleep(&self, period: Duration);
}
