//! Unified error types for the fan controller.
//!
//! A single `Error` enum that every subsystem can convert into. The control
//! loop logs port failures through it so each record names its subsystem. None of these is fatal to the
//! loop: sensor errors bias toward maximum cooling, actuator errors are
//! retried, and hardware faults end in a management-controller reset.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A temperature could not be read or was garbled.
    Sensor(SensorError),
    /// A fan command or fan-speed read-back failed.
    Actuator(ActuatorError),
    /// Retries are exhausted; the management controller must be reset.
    Hardware(HardwareFault),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Reading is missing, negative, or not a number.
    Invalid,
    /// The external tool could not be run or exited non-zero.
    CommandFailed,
    /// The tool ran but its output held no temperature.
    Unparseable,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid reading"),
            Self::CommandFailed => write!(f, "sensor command failed"),
            Self::Unparseable => write!(f, "sensor output unparseable"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// The management-controller command could not be issued.
    CommandFailed,
    /// Fan speed could not be read back.
    Unreadable,
    /// Fan speed was read back but does not match the command.
    Mismatch,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandFailed => write!(f, "fan command failed"),
            Self::Unreadable => write!(f, "fan speed unreadable"),
            Self::Mismatch => write!(f, "fan speed does not match command"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware faults
// ---------------------------------------------------------------------------

/// Escalated actuator failures. Both are handled by a cold reset of the
/// management controller followed by re-asserting full manual fan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareFault {
    /// Fan speeds stayed unreadable for longer than the reboot grace period.
    Unresponsive,
    /// Fan speeds kept mismatching the command past the fail threshold.
    StuckFans,
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresponsive => write!(f, "management controller unresponsive"),
            Self::StuckFans => write!(f, "fans not following commands"),
        }
    }
}

impl std::error::Error for HardwareFault {}

impl From<HardwareFault> for Error {
    fn from(e: HardwareFault) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config could not be deserialized.
    Corrupted(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the config backend.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted(msg) => write!(f, "config corrupted: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
