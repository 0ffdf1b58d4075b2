//! Controller state owned by the control loop.
//!
//! `ControllerState` is the single struct the control stages read from and
//! write to: the commanded CPU level, the persisted storage duty, both
//! override latches, and the latest temperature sample. It is created once
//! at process start and never persisted.

use core::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Zones, levels and modes
// ---------------------------------------------------------------------------

/// One of the two independently addressable fan zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanZone {
    Cpu,
    Storage,
}

impl fmt::Display for FanZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

/// Discrete CPU fan level. `Unset` only exists before the first decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CpuFanLevel {
    #[default]
    Unset,
    Low,
    Med,
    High,
}

impl fmt::Display for CpuFanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Low => write!(f, "low"),
            Self::Med => write!(f, "med"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Management-controller fan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FanMode {
    Standard = 0,
    Full = 1,
    Optimal = 2,
    HeavyIo = 4,
}

impl FanMode {
    /// Raw mode byte understood by the management controller.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Full => write!(f, "full"),
            Self::Optimal => write!(f, "optimal"),
            Self::HeavyIo => write!(f, "heavyio"),
        }
    }
}

// ---------------------------------------------------------------------------
// Temperature sample
// ---------------------------------------------------------------------------

/// Sentinel stored in the storage aggregates when no drive reported.
pub const NO_READING: f32 = -1.0;

/// Returns the temperature if it is usable: finite and non-negative.
pub fn valid_temp(t: Option<f32>) -> Option<f32> {
    t.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Latest temperatures. The CPU part is replaced every iteration, the
/// storage part every storage polling interval.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSample {
    /// Hottest CPU reading, `None` when invalid.
    pub cpu_max: Option<f32>,
    pub hd_min: f32,
    pub hd_max: f32,
    pub hd_avg: f32,
    /// Valid drive readings in device order.
    pub hd_readings: Vec<f32>,
}

impl Default for TemperatureSample {
    fn default() -> Self {
        Self {
            cpu_max: None,
            hd_min: NO_READING,
            hd_max: NO_READING,
            hd_avg: NO_READING,
            hd_readings: Vec::new(),
        }
    }
}

impl TemperatureSample {
    /// Replace the storage aggregates with those of `readings`.
    /// Invalid entries are dropped; an empty result leaves the sentinels.
    pub fn set_storage(&mut self, readings: &[f32]) {
        let valid: Vec<f32> = readings
            .iter()
            .copied()
            .filter(|t| valid_temp(Some(*t)).is_some())
            .collect();
        if valid.is_empty() {
            self.hd_min = NO_READING;
            self.hd_max = NO_READING;
            self.hd_avg = NO_READING;
        } else {
            self.hd_min = valid.iter().copied().fold(f32::INFINITY, f32::min);
            self.hd_max = valid.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            self.hd_avg = valid.iter().sum::<f32>() / valid.len() as f32;
        }
        self.hd_readings = valid;
    }

    /// True if at least one drive produced a valid reading.
    pub fn has_storage(&self) -> bool {
        !self.hd_readings.is_empty() && self.hd_max >= 0.0
    }
}

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

/// Process-wide mutable state, owned exclusively by the control loop.
#[derive(Debug, Clone)]
pub struct ControllerState {
    /// Current commanded CPU level; persists for hysteresis.
    pub cpu_level: CpuFanLevel,
    /// Persisted storage duty; sub-integer corrections accumulate here.
    /// Always within `[hd_low_duty, hd_high_duty]`.
    pub storage_duty: f32,
    /// CPU heat is forcing storage fans to maximum.
    pub storage_override_active: bool,
    /// High storage duty is forcing CPU fans to High.
    pub cpu_override_active: bool,
    /// Last fan mode asserted on the management controller.
    pub fan_mode: FanMode,
    pub sample: TemperatureSample,
    /// Storage devices found at the last enumeration.
    pub devices: Vec<String>,
    /// Uptime of the last storage poll, `None` before the first one.
    pub last_storage_poll: Option<Duration>,
}

impl ControllerState {
    pub fn new(start_duty: u8) -> Self {
        Self {
            cpu_level: CpuFanLevel::Unset,
            storage_duty: f32::from(start_duty),
            storage_override_active: false,
            cpu_override_active: false,
            fan_mode: FanMode::Full,
            sample: TemperatureSample::default(),
            devices: Vec::new(),
            last_storage_poll: None,
        }
    }

    /// Duty actually commanded on the storage zone: the override ceiling
    /// while CPU heat forces it, otherwise the rounded persisted duty.
    pub fn commanded_storage_duty(&self, high_duty: u8) -> u8 {
        if self.storage_override_active {
            high_duty
        } else {
            crate::control::pid::round_duty(self.storage_duty)
        }
    }

    /// Whether a storage poll is due at `now`.
    pub fn storage_poll_due(&self, now: Duration, interval: Duration) -> bool {
        match self.last_storage_poll {
            None => true,
            Some(last) => now.saturating_sub(last) >= interval,
        }
    }
}
