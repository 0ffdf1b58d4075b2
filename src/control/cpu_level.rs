//! CPU fan level state machine.
//!
//! Converts the CPU temperature into a discrete fan level with hysteresis.
//! Rules are evaluated in order, first match wins:
//!
//! ```text
//!  override latched            ──▶ High
//!  temperature invalid         ──▶ High
//!  t >= high                   ──▶ High
//!  t >= med                    ──▶ Med
//!  t >  low  and at High/Unset ──▶ Med     (forced dwell on the way down)
//!  t <= low                    ──▶ Low
//!  otherwise                   ──▶ current (dead zone)
//! ```
//!
//! The function always returns a level; when no rule changes it, the
//! returned value equals `current`.

use super::state::{CpuFanLevel, valid_temp};
use crate::config::ControllerConfig;

/// Temperature thresholds (°C) for the CPU zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuThresholds {
    pub low: f32,
    pub med: f32,
    pub high: f32,
}

impl CpuThresholds {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            low: config.cpu_low_temp,
            med: config.cpu_med_temp,
            high: config.cpu_high_temp,
        }
    }
}

/// Decide the next CPU fan level.
pub fn decide_level(
    cpu_temp: Option<f32>,
    current: CpuFanLevel,
    override_active: bool,
    thresholds: &CpuThresholds,
) -> CpuFanLevel {
    if override_active {
        return CpuFanLevel::High;
    }
    let Some(t) = valid_temp(cpu_temp) else {
        return CpuFanLevel::High;
    };

    if t >= thresholds.high {
        CpuFanLevel::High
    } else if t >= thresholds.med {
        CpuFanLevel::Med
    } else if t > thresholds.low && matches!(current, CpuFanLevel::High | CpuFanLevel::Unset) {
        CpuFanLevel::Med
    } else if t <= thresholds.low {
        CpuFanLevel::Low
    } else {
        current
    }
}
