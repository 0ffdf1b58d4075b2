//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade (console and log file in production).

use log::{error, info, warn};

use crate::app::events::{AppEvent, StorageCycleRecord};
use crate::app::ports::EventSink;
use crate::verification::{RecoveryAction, Verification, VerifyPhase};

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { mode, storage_duty } => {
                info!("START | fan_mode={} storage_duty={}%", mode, storage_duty);
            }
            AppEvent::CpuLevelChanged {
                from,
                to,
                cpu_temp,
                duty,
            } => {
                info!(
                    "CPU | level {} -> {} | T={} | duty={}%",
                    from,
                    to,
                    fmt_temp(*cpu_temp),
                    duty
                );
            }
            AppEvent::StorageCycle(r) => info!("{}", storage_line(r)),
            AppEvent::DevicesChanged { added, removed } => {
                info!("DEVICES | added=[{}] removed=[{}]", added.join(","), removed.join(","));
            }
            AppEvent::StorageOverride {
                engaged,
                cpu_temp,
                duty,
            } => {
                let verb = if *engaged { "engaged" } else { "released" };
                info!(
                    "OVERRIDE | cpu->storage {} | cpu T={} | storage duty={}%",
                    verb,
                    fmt_temp(*cpu_temp),
                    duty
                );
            }
            AppEvent::CpuOverride {
                engaged,
                storage_duty,
            } => {
                let verb = if *engaged { "engaged" } else { "released" };
                info!("OVERRIDE | storage->cpu {} | storage duty={}%", verb, storage_duty);
            }
            AppEvent::Verified(v) => log_verification(v),
            AppEvent::HardwareReset(fault) => {
                error!("RESET | management controller cold reset ({})", fault);
            }
        }
    }
}

fn log_verification(v: &Verification) {
    let line = verification_line(v);
    match v.phase {
        VerifyPhase::Confirmed | VerifyPhase::Idle => info!("{line}"),
        VerifyPhase::Unreadable | VerifyPhase::Mismatched => warn!("{line}"),
    }
}

/// One line per verification cycle, with a per-zone verdict.
pub fn verification_line(v: &Verification) -> String {
    let mut line = format!(
        "VERIFY | {:?} | cpu={} rpm ({}) storage={} rpm ({}) | failures={} | action={}",
        v.phase,
        fmt_rpm(v.cpu_rpm),
        fmt_verdict(v.result.cpu_speed_ok),
        fmt_rpm(v.storage_rpm),
        fmt_verdict(v.result.storage_speed_ok),
        v.consecutive_failures,
        match v.action {
            RecoveryAction::None => "none".to_owned(),
            RecoveryAction::Resend => "resend".to_owned(),
            RecoveryAction::ColdReset(f) => format!("cold-reset({f})"),
        }
    );
    if let Some(fault) = v.fault() {
        line.push_str(&format!(" | {fault}"));
    }
    line
}

/// One line per storage poll with every diagnostic the cycle produced.
pub fn storage_line(r: &StorageCycleRecord) -> String {
    format!(
        "STORAGE | drives={} | min={} max={} avg={} | err={:+.2} | mode={} | \
         fans={} rpm | duty {}% -> {}% | cpu T={} | P={:+.2} I={:+.2} D={:+.2} | {:?}",
        r.device_count,
        fmt_temp(Some(r.hd_min).filter(|t| *t >= 0.0)),
        fmt_temp(Some(r.hd_max).filter(|t| *t >= 0.0)),
        fmt_temp(Some(r.hd_avg).filter(|t| *t >= 0.0)),
        r.error,
        r.fan_mode,
        fmt_rpm(r.storage_rpm),
        r.old_duty,
        r.new_duty,
        fmt_temp(r.cpu_temp),
        r.terms.p,
        r.terms.i,
        r.terms.d,
        r.branch,
    )
}

fn fmt_temp(t: Option<f32>) -> String {
    t.map_or_else(|| "--".to_owned(), |v| format!("{v:.1}\u{00b0}C"))
}

fn fmt_verdict(ok: Option<bool>) -> &'static str {
    match ok {
        Some(true) => "ok",
        Some(false) => "wrong",
        None => "unknown",
    }
}

fn fmt_rpm(rpm: Option<u32>) -> String {
    rpm.map_or_else(|| "--".to_owned(), |v| v.to_string())
}
