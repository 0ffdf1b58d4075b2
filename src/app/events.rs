//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on
//! the other side decide what to do with them.

use crate::control::pid::{PidBranch, PidTerms};
use crate::control::state::{CpuFanLevel, FanMode};
use crate::error::HardwareFault;
use crate::verification::Verification;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller took over the fans.
    Started { mode: FanMode, storage_duty: u8 },

    /// The CPU state machine moved to a new level.
    CpuLevelChanged {
        from: CpuFanLevel,
        to: CpuFanLevel,
        cpu_temp: Option<f32>,
        duty: u8,
    },

    /// One storage polling cycle completed.
    StorageCycle(StorageCycleRecord),

    /// Drives appeared or disappeared since the previous poll.
    DevicesChanged {
        added: Vec<String>,
        removed: Vec<String>,
    },

    /// CPU heat forced (or released) the storage fans.
    StorageOverride { engaged: bool, cpu_temp: Option<f32>, duty: u8 },

    /// Storage duty forced (or released) the CPU fans.
    CpuOverride { engaged: bool, storage_duty: u8 },

    /// A verification cycle completed.
    Verified(Verification),

    /// The management controller was cold-reset.
    HardwareReset(HardwareFault),
}

/// Per-storage-cycle record.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageCycleRecord {
    pub device_count: usize,
    pub hd_min: f32,
    pub hd_max: f32,
    pub hd_avg: f32,
    /// `hd_avg - target`.
    pub error: f32,
    pub fan_mode: FanMode,
    /// Realized storage fan speed, `None` if unreadable.
    pub storage_rpm: Option<u32>,
    pub old_duty: u8,
    pub new_duty: u8,
    pub cpu_temp: Option<f32>,
    pub terms: PidTerms,
    pub branch: PidBranch,
}
