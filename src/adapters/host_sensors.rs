//! Host temperature gateway: lm-sensors / sysctl for the CPU, smartctl for
//! storage devices.
//!
//! Each tool's text output is parsed by a free function so the parsing
//! rules are covered by unit tests without the tools installed.

use log::{debug, warn};

use crate::config::{ControllerConfig, CpuTempMethod};
use crate::error::SensorError;

use super::utils::{leading_number, run, run_lenient};

/// SMART attributes carrying the drive temperature, in preference order.
const SMART_TEMP_ATTRIBUTES: [&str; 2] = ["194", "190"];

/// Raw-value column of a `smartctl -A` attribute row.
const SMART_RAW_VALUE_COLUMN: usize = 9;

pub struct HostSensors {
    sensors: String,
    smartctl: String,
    method: CpuTempMethod,
}

impl HostSensors {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            sensors: config.sensors_path.clone(),
            smartctl: config.smartctl_path.clone(),
            method: config.cpu_temp_method,
        }
    }

    pub fn cpu_temperature(&self) -> Result<f32, SensorError> {
        let (output, parsed) = match self.method {
            CpuTempMethod::Sensors => {
                let out = run(&self.sensors, &[]).map_err(|e| {
                    warn!("sensors: `{}` failed: {e}", self.sensors);
                    SensorError::CommandFailed
                })?;
                let t = parse_lm_sensors(&out);
                (out, t)
            }
            CpuTempMethod::Sysctl => {
                let out = run("sysctl", &["dev.cpu"]).map_err(|e| {
                    warn!("sensors: `sysctl dev.cpu` failed: {e}");
                    SensorError::CommandFailed
                })?;
                let t = parse_sysctl_cpu(&out);
                (out, t)
            }
        };
        parsed.ok_or_else(|| {
            debug!("sensors: no CPU temperature in {} bytes of output", output.len());
            SensorError::Unparseable
        })
    }

    pub fn storage_devices(&self) -> Result<Vec<String>, SensorError> {
        let out = run(&self.smartctl, &["--scan"]).map_err(|e| {
            warn!("smartctl: `--scan` failed: {e}");
            SensorError::CommandFailed
        })?;
        Ok(parse_smartctl_scan(&out))
    }

    /// Temperatures of every device that answered; silent drives are skipped.
    pub fn storage_temperatures(&self, devices: &[String]) -> Vec<f32> {
        devices
            .iter()
            .filter_map(|dev| match run_lenient(&self.smartctl, &["-A", dev]) {
                Ok(out) => {
                    let t = parse_smartctl_temperature(&out);
                    if t.is_none() {
                        debug!("smartctl: no temperature for {dev}");
                    }
                    t
                }
                Err(e) => {
                    warn!("smartctl: `-A {dev}` failed: {e}");
                    None
                }
            })
            .collect()
    }
}

// ── Parsers ───────────────────────────────────────────────────

/// Hottest of the `Core N`, `Package id N`, `Tdie` and `Tctl` readings.
pub fn parse_lm_sensors(output: &str) -> Option<f32> {
    output
        .lines()
        .filter_map(|line| {
            let (label, rest) = line.split_once(':')?;
            let label = label.trim();
            let cpu_label = label.starts_with("Core ")
                || label.starts_with("Package id ")
                || label == "Tdie"
                || label == "Tctl";
            if !cpu_label {
                return None;
            }
            leading_number(rest.split_whitespace().next()?)
        })
        .reduce(f32::max)
}

/// Hottest `dev.cpu.N.temperature` value from `sysctl dev.cpu`.
pub fn parse_sysctl_cpu(output: &str) -> Option<f32> {
    output
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            if !key.trim().ends_with(".temperature") {
                return None;
            }
            leading_number(value)
        })
        .reduce(f32::max)
}

/// Device paths from `smartctl --scan` (`/dev/sda -d scsi # ...`).
pub fn parse_smartctl_scan(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect()
}

/// Drive temperature from `smartctl -A` output.
///
/// SATA: raw value of attribute 194, else 190. SAS: `Current Drive
/// Temperature:`. NVMe: `Temperature:`.
pub fn parse_smartctl_temperature(output: &str) -> Option<f32> {
    for id in SMART_TEMP_ATTRIBUTES {
        let raw = output.lines().find_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.first() != Some(&id) {
                return None;
            }
            leading_number(cols.get(SMART_RAW_VALUE_COLUMN)?)
        });
        if raw.is_some() {
            return raw;
        }
    }

    output.lines().find_map(|line| {
        let (label, value) = line.split_once(':')?;
        match label.trim() {
            "Current Drive Temperature" | "Temperature" => leading_number(value),
            _ => None,
        }
    })
}
