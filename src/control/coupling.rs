//! Cross-zone override coordination.
//!
//! CPU → storage: while the CPU zone is at `High` and the CPU is at or
//! above the override temperature (or unreadable), storage fans are forced
//! to their ceiling. The latch is sticky: it is released only when the CPU
//! level leaves `High`, never because the temperature dipped. On release
//! the storage zone returns to the PID-computed duty.
//!
//! Storage → CPU is produced by [`StoragePid`](super::pid::StoragePid) as
//! `cpu_override` and consumed by [`decide_level`](super::cpu_level::decide_level).

use super::state::{CpuFanLevel, valid_temp};
use crate::config::ControllerConfig;

/// What the coordinator wants done with the storage zone this iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAction {
    /// Nothing changes.
    Hold,
    /// Force storage fans to the ceiling and latch.
    Engage,
    /// Clear the latch and restore the PID duty.
    Release,
}

/// Evaluate the CPU → storage override after the CPU level decision.
pub fn storage_override_action(
    level: CpuFanLevel,
    cpu_temp: Option<f32>,
    latched: bool,
    config: &ControllerConfig,
) -> OverrideAction {
    if latched {
        return if level == CpuFanLevel::High {
            OverrideAction::Hold
        } else {
            OverrideAction::Release
        };
    }

    if level != CpuFanLevel::High || !config.storage_assists_cpu {
        return OverrideAction::Hold;
    }

    let hot = match valid_temp(cpu_temp) {
        None => true,
        Some(t) => t == 0.0 || t >= config.cpu_override_temp,
    };
    if hot {
        OverrideAction::Engage
    } else {
        OverrideAction::Hold
    }
}
