//! ipmitool actuator gateway.
//!
//! Drives a Supermicro-style management controller through `ipmitool`:
//!
//! | Operation        | Command                                  |
//! |------------------|------------------------------------------|
//! | fan mode         | `raw 0x30 0x45 0x01 <mode>`              |
//! | zone duty        | `raw 0x30 0x70 0x66 0x01 <zone> <duty>`  |
//! | realized speed   | `sdr type fan`                           |
//! | cold reset       | `bmc reset cold`                         |
//!
//! Parsing lives in free functions so it can be tested without the tool.

use std::collections::HashMap;

use log::{debug, warn};

use crate::app::ports::FanSpeeds;
use crate::config::ControllerConfig;
use crate::control::state::{FanMode, FanZone};
use crate::error::ActuatorError;

use super::utils::run;

/// Handle on the `ipmitool` binary plus the zone layout it addresses.
pub struct IpmiTool {
    program: String,
    cpu_zone_id: u8,
    storage_zone_id: u8,
    cpu_headers: Vec<String>,
    storage_headers: Vec<String>,
}

impl IpmiTool {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            program: config.ipmitool_path.clone(),
            cpu_zone_id: config.zone_id(FanZone::Cpu),
            storage_zone_id: config.zone_id(FanZone::Storage),
            cpu_headers: config.zone_headers(FanZone::Cpu).to_vec(),
            storage_headers: config.zone_headers(FanZone::Storage).to_vec(),
        }
    }

    pub fn set_zone_duty(&self, zone: FanZone, duty: u8) -> Result<(), ActuatorError> {
        let zone_arg = hex_byte(self.zone_id(zone));
        let duty_arg = hex_byte(duty.min(100));
        self.exec(&["raw", "0x30", "0x70", "0x66", "0x01", &zone_arg, &duty_arg])?;
        debug!("ipmi: {zone} zone duty {duty}%");
        Ok(())
    }

    pub fn set_fan_mode(&self, mode: FanMode) -> Result<(), ActuatorError> {
        let mode_arg = hex_byte(mode.code());
        self.exec(&["raw", "0x30", "0x45", "0x01", &mode_arg])?;
        debug!("ipmi: fan mode {mode}");
        Ok(())
    }

    /// One `sdr` read shared by both zones.
    pub fn read_fan_speeds(&self) -> FanSpeeds {
        match self.exec(&["sdr", "type", "fan"]) {
            Ok(output) => {
                let readings = parse_fan_sdr(&output);
                FanSpeeds {
                    cpu: zone_speed(&readings, self.headers(FanZone::Cpu)),
                    storage: zone_speed(&readings, self.headers(FanZone::Storage)),
                }
            }
            Err(_) => FanSpeeds {
                cpu: Err(ActuatorError::Unreadable),
                storage: Err(ActuatorError::Unreadable),
            },
        }
    }

    pub fn cold_reset(&self) -> Result<(), ActuatorError> {
        self.exec(&["bmc", "reset", "cold"])?;
        Ok(())
    }

    fn zone_id(&self, zone: FanZone) -> u8 {
        match zone {
            FanZone::Cpu => self.cpu_zone_id,
            FanZone::Storage => self.storage_zone_id,
        }
    }

    fn headers(&self, zone: FanZone) -> &[String] {
        match zone {
            FanZone::Cpu => &self.cpu_headers,
            FanZone::Storage => &self.storage_headers,
        }
    }

    fn exec(&self, args: &[&str]) -> Result<String, ActuatorError> {
        run(&self.program, args).map_err(|e| {
            warn!("ipmi: `{} {}` failed: {e}", self.program, args.join(" "));
            ActuatorError::CommandFailed
        })
    }
}

fn hex_byte(v: u8) -> String {
    format!("0x{v:02x}")
}

/// Parse `ipmitool sdr type fan` output into header → RPM.
///
/// Lines look like `FAN1 | 41h | ok | 29.1 | 1200 RPM`. Headers reporting
/// `No Reading` (or anything non-numeric) map to `None`.
pub fn parse_fan_sdr(output: &str) -> HashMap<String, Option<u32>> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('|').map(str::trim).collect();
            let (name, reading) = (fields.first()?, fields.last()?);
            if fields.len() < 2 || name.is_empty() {
                return None;
            }
            let rpm = reading
                .strip_suffix("RPM")
                .and_then(|n| n.trim().parse::<f32>().ok())
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n.round() as u32);
            Some(((*name).to_owned(), rpm))
        })
        .collect()
}

/// Average speed of `headers`. Any missing or unreadable header makes the
/// whole zone unreadable.
pub fn zone_speed(
    readings: &HashMap<String, Option<u32>>,
    headers: &[String],
) -> Result<u32, ActuatorError> {
    if headers.is_empty() {
        return Err(ActuatorError::Unreadable);
    }
    let mut total: u64 = 0;
    for header in headers {
        match readings.get(header).copied().flatten() {
            Some(rpm) => total += u64::from(rpm),
            None => return Err(ActuatorError::Unreadable),
        }
    }
    Ok((total / headers.len() as u64) as u32)
}
