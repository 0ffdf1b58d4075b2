//! Controller configuration parameters
//!
//! All tunable parameters for the two-zone fan controller. Loaded once at
//! startup (JSON file or defaults) and read-only thereafter.

use serde::{Deserialize, Serialize};

use crate::control::state::FanZone;
use crate::error::ConfigError;

/// How the CPU temperature is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuTempMethod {
    /// lm-sensors text output (`Core N`, `Package id N`, `Tdie`, `Tctl`).
    Sensors,
    /// FreeBSD `sysctl dev.cpu` output.
    Sysctl,
}

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- CPU state machine ---
    /// At or below this temperature (°C) the CPU fans drop to Low
    pub cpu_low_temp: f32,
    /// At or above this temperature (°C) the CPU fans run at least Med
    pub cpu_med_temp: f32,
    /// At or above this temperature (°C) the CPU fans run High
    pub cpu_high_temp: f32,
    /// CPU temperature (°C) at which storage fans are forced to assist
    pub cpu_override_temp: f32,
    /// CPU zone duty (0-100%) per level
    pub cpu_duty_low: u8,
    pub cpu_duty_med: u8,
    pub cpu_duty_high: u8,

    // --- Storage PID ---
    /// Target average drive temperature (°C)
    pub hd_target_temp: f32,
    /// Any drive at or above this temperature (°C) forces storage fans to maximum
    pub hd_max_allowed_temp: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Storage temperature polling interval (seconds); also the PID period
    pub hd_polling_interval_secs: u64,
    /// Storage zone duty (0-100%) commanded at startup
    pub hd_start_duty: u8,
    /// Storage zone duty clamp (0-100%)
    pub hd_low_duty: u8,
    pub hd_high_duty: u8,

    // --- Cross-zone coupling ---
    /// Storage fans go to maximum while the CPU runs hot
    pub storage_assists_cpu: bool,
    /// CPU fans go High while the storage duty is at or above the threshold
    pub cpu_assists_storage: bool,
    pub cpu_override_duty_threshold: u8,

    // --- Zones ---
    pub cpu_zone_id: u8,
    pub storage_zone_id: u8,
    /// Fan header names read back for each zone (e.g. "FAN1", "FANA")
    pub cpu_fan_headers: Vec<String>,
    pub storage_fan_headers: Vec<String>,
    /// Maximum attainable fan speed (RPM) per zone
    pub cpu_max_rpm: u32,
    pub storage_max_rpm: u32,
    /// Fraction (0.0-1.0) of max RPM subtracted to get the verification reference
    pub speed_safety_margin: f32,

    // --- Verification & recovery ---
    /// Dwell after a commanded change before fan speeds are verified (seconds)
    pub change_delay_secs: u64,
    /// Dwell between verifications once speeds are confirmed (seconds)
    pub steady_check_interval_secs: u64,
    /// Mismatches tolerated (with re-send) before a cold reset
    pub bmc_fail_threshold: u32,
    /// How long speeds may stay unreadable before a cold reset (seconds)
    pub bmc_reboot_grace_secs: u64,
    /// Dwell after a cold reset before verifying again (seconds)
    pub bmc_reset_settle_secs: u64,

    // --- Timing ---
    /// Control loop period (milliseconds)
    pub cpu_poll_interval_ms: u64,

    // --- Host tooling ---
    pub ipmitool_path: String,
    pub smartctl_path: String,
    pub sensors_path: String,
    pub cpu_temp_method: CpuTempMethod,
    /// Storage devices never polled (e.g. "/dev/sdz")
    pub excluded_devices: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // CPU
            cpu_low_temp: 40.0,
            cpu_med_temp: 50.0,
            cpu_high_temp: 58.0,
            cpu_override_temp: 62.0,
            cpu_duty_low: 30,
            cpu_duty_med: 60,
            cpu_duty_high: 100,

            // Storage PID
            hd_target_temp: 36.0,
            hd_max_allowed_temp: 40.0,
            kp: 16.0 / 3.0,
            ki: 0.0,
            kd: 120.0,
            hd_polling_interval_secs: 90, // 1.5 min
            hd_start_duty: 60,
            hd_low_duty: 30,
            hd_high_duty: 100,

            // Coupling
            storage_assists_cpu: true,
            cpu_assists_storage: true,
            cpu_override_duty_threshold: 95,

            // Zones
            cpu_zone_id: 0,
            storage_zone_id: 1,
            cpu_fan_headers: vec!["FAN1".into(), "FAN2".into(), "FAN3".into(), "FAN4".into()],
            storage_fan_headers: vec!["FANA".into()],
            cpu_max_rpm: 1600,
            storage_max_rpm: 1400,
            speed_safety_margin: 0.25,

            // Verification
            change_delay_secs: 10,
            steady_check_interval_secs: 120,
            bmc_fail_threshold: 1,
            bmc_reboot_grace_secs: 120,
            bmc_reset_settle_secs: 60,

            // Timing
            cpu_poll_interval_ms: 1000, // 1 Hz

            // Tooling
            ipmitool_path: "ipmitool".into(),
            smartctl_path: "smartctl".into(),
            sensors_path: "sensors".into(),
            cpu_temp_method: CpuTempMethod::Sensors,
            excluded_devices: Vec::new(),
        }
    }
}

impl ControllerConfig {
    /// PID control period in minutes (gains are tuned per minute).
    pub fn storage_dt_minutes(&self) -> f32 {
        self.hd_polling_interval_secs as f32 / 60.0
    }

    /// Management-controller zone id for `zone`.
    pub fn zone_id(&self, zone: FanZone) -> u8 {
        match zone {
            FanZone::Cpu => self.cpu_zone_id,
            FanZone::Storage => self.storage_zone_id,
        }
    }

    /// Fan headers read back for `zone`.
    pub fn zone_headers(&self, zone: FanZone) -> &[String] {
        match zone {
            FanZone::Cpu => &self.cpu_fan_headers,
            FanZone::Storage => &self.storage_fan_headers,
        }
    }

    /// Verification reference speed: max RPM derated by the safety margin.
    pub fn reference_rpm(&self, zone: FanZone) -> u32 {
        let max = match zone {
            FanZone::Cpu => self.cpu_max_rpm,
            FanZone::Storage => self.storage_max_rpm,
        };
        (max as f32 * (1.0 - self.speed_safety_margin)).round() as u32
    }

    /// CPU zone duty commanded for a decided level.
    pub fn cpu_duty(&self, level: crate::control::state::CpuFanLevel) -> u8 {
        use crate::control::state::CpuFanLevel;
        match level {
            CpuFanLevel::Low => self.cpu_duty_low,
            CpuFanLevel::Med => self.cpu_duty_med,
            CpuFanLevel::High | CpuFanLevel::Unset => self.cpu_duty_high,
        }
    }

    /// Range-check every field. Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cpu_low_temp < self.cpu_med_temp && self.cpu_med_temp <= self.cpu_high_temp) {
            return Err(ConfigError::ValidationFailed(
                "cpu thresholds must satisfy low < med <= high",
            ));
        }
        if [self.cpu_duty_low, self.cpu_duty_med, self.cpu_duty_high]
            .iter()
            .any(|d| *d > 100)
        {
            return Err(ConfigError::ValidationFailed("cpu duties must be 0-100"));
        }
        if self.hd_low_duty > self.hd_high_duty || self.hd_high_duty > 100 {
            return Err(ConfigError::ValidationFailed(
                "hd duties must satisfy hd_low_duty <= hd_high_duty <= 100",
            ));
        }
        if !(self.hd_low_duty..=self.hd_high_duty).contains(&self.hd_start_duty) {
            return Err(ConfigError::ValidationFailed(
                "hd_start_duty must lie within [hd_low_duty, hd_high_duty]",
            ));
        }
        if self.cpu_override_duty_threshold > 100 {
            return Err(ConfigError::ValidationFailed(
                "cpu_override_duty_threshold must be 0-100",
            ));
        }
        if self.hd_target_temp >= self.hd_max_allowed_temp {
            return Err(ConfigError::ValidationFailed(
                "hd_target_temp must be below hd_max_allowed_temp",
            ));
        }
        if ![self.kp, self.ki, self.kd].iter().all(|g| g.is_finite()) {
            return Err(ConfigError::ValidationFailed("PID gains must be finite"));
        }
        if self.hd_polling_interval_secs == 0 || self.cpu_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("polling intervals must be non-zero"));
        }
        let Some(hd_polling_interval_ms) = self.hd_polling_interval_secs.checked_mul(1000) else {
            return Err(ConfigError::ValidationFailed("hd_polling_interval_secs is out of range"));
        };
        if self.cpu_poll_interval_ms >= hd_polling_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "cpu polling must be faster than storage polling",
            ));
        }
        if self.cpu_zone_id == self.storage_zone_id {
            return Err(ConfigError::ValidationFailed("cpu and storage zone ids must differ"));
        }
        if !(0.0..1.0).contains(&self.speed_safety_margin) {
            return Err(ConfigError::ValidationFailed(
                "speed_safety_margin must be within [0.0, 1.0)",
            ));
        }
        if self.cpu_fan_headers.is_empty() || self.storage_fan_headers.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "each zone needs at least one fan header",
            ));
        }
        Ok(())
    }
}
