//! Fan-speed verification and recovery.
//!
//! The verifier runs **after the actuators** each tick and checks that the
//! commanded fan state was physically realized. It is pure: the service
//! reads the speeds, hands them in, and carries out the returned
//! [`RecoveryAction`].
//!
//! ## Cycle
//!
//! 1. `Idle`: a dwell runs after every commanded change (`change_delay`),
//!    or after a confirmation (`steady_check_interval`, longer).
//! 2. `Verifying`: realized RPM of both zones is compared to expectation.
//!    CPU `High` needs speed ≥ reference, `Low` needs ≤ reference, `Med`
//!    is not checked. Storage at the duty ceiling needs ≥ reference, at
//!    the floor ≤ reference, anything between is not checked.
//! 3. Outcome:
//!    - `Unreadable`: an "unreadable since" timer runs; past the reboot
//!      grace the management controller is cold-reset.
//!    - `Mismatched`: a failure counter increments; up to the threshold the
//!      commands are re-sent, past it a cold reset is issued.
//!    - `Confirmed`: counters clear and the next dwell is the steady one.

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::control::state::{CpuFanLevel, FanZone};
use crate::error::{ActuatorError, HardwareFault};

/// Commanded state the realized speeds are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub cpu_level: CpuFanLevel,
    pub storage_duty: u8,
}

/// Per-zone outcome. `None` means the speed could not be read, which is
/// distinct from a readable-but-wrong value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerificationResult {
    pub cpu_speed_ok: Option<bool>,
    pub storage_speed_ok: Option<bool>,
}

/// Phase reached by the last verification cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyPhase {
    Idle,
    Confirmed,
    Unreadable,
    Mismatched,
}

/// What the service must do after a verification cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    None,
    /// Re-assert full manual mode and re-send both duties.
    Resend,
    /// Cold-reset the management controller, then re-assert full mode.
    ColdReset(HardwareFault),
}

/// Full report of one verification cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    pub phase: VerifyPhase,
    pub result: VerificationResult,
    pub cpu_rpm: Option<u32>,
    pub storage_rpm: Option<u32>,
    pub consecutive_failures: u32,
    pub action: RecoveryAction,
}

impl Verification {
    /// Actuator error surfaced by this cycle, if any.
    pub fn fault(&self) -> Option<ActuatorError> {
        match self.phase {
            VerifyPhase::Unreadable => Some(ActuatorError::Unreadable),
            VerifyPhase::Mismatched => Some(ActuatorError::Mismatch),
            VerifyPhase::Idle | VerifyPhase::Confirmed => None,
        }
    }
}

/// Verification supervisor.
pub struct FanVerifier {
    change_delay: Duration,
    steady_interval: Duration,
    reboot_grace: Duration,
    reset_settle: Duration,
    fail_threshold: u32,
    cpu_reference_rpm: u32,
    storage_reference_rpm: u32,
    low_duty: u8,
    high_duty: u8,

    /// Uptime of the last commanded change or verification.
    last_change: Duration,
    /// Dwell that must elapse after `last_change` before verifying.
    dwell: Duration,
    unreadable_since: Option<Duration>,
    consecutive_failures: u32,
    phase: VerifyPhase,
}

impl FanVerifier {
    pub fn new(config: &ControllerConfig) -> Self {
        let change_delay = Duration::from_secs(config.change_delay_secs);
        Self {
            change_delay,
            steady_interval: Duration::from_secs(config.steady_check_interval_secs),
            reboot_grace: Duration::from_secs(config.bmc_reboot_grace_secs),
            reset_settle: Duration::from_secs(config.bmc_reset_settle_secs),
            fail_threshold: config.bmc_fail_threshold,
            cpu_reference_rpm: config.reference_rpm(FanZone::Cpu),
            storage_reference_rpm: config.reference_rpm(FanZone::Storage),
            low_duty: config.hd_low_duty,
            high_duty: config.hd_high_duty,
            last_change: Duration::ZERO,
            dwell: change_delay,
            unreadable_since: None,
            consecutive_failures: 0,
            phase: VerifyPhase::Idle,
        }
    }

    /// A fan command was issued: restart the short dwell.
    pub fn notify_change(&mut self, now: Duration) {
        self.last_change = now;
        self.dwell = self.change_delay;
        self.phase = VerifyPhase::Idle;
    }

    /// Whether the dwell has elapsed. A clock that appears to run backwards
    /// keeps the verifier idle.
    pub fn due(&self, now: Duration) -> bool {
        now.saturating_sub(self.last_change) >= self.dwell
    }

    /// Evaluate read-back speeds against the expectation.
    pub fn evaluate(
        &mut self,
        now: Duration,
        expect: Expectation,
        cpu_rpm: Result<u32, ActuatorError>,
        storage_rpm: Result<u32, ActuatorError>,
    ) -> Verification {
        self.last_change = now;

        let (Ok(cpu), Ok(storage)) = (cpu_rpm, storage_rpm) else {
            return self.unreadable(now, expect, cpu_rpm.ok(), storage_rpm.ok());
        };
        // The controller answered; any earlier unreadable streak is over.
        self.unreadable_since = None;

        let result = VerificationResult {
            cpu_speed_ok: Some(self.cpu_ok(expect.cpu_level, cpu)),
            storage_speed_ok: Some(self.storage_ok(expect.storage_duty, storage)),
        };

        if result.cpu_speed_ok == Some(true) && result.storage_speed_ok == Some(true) {
            if self.consecutive_failures > 0 {
                info!("VERIFY: fan speeds recovered after {} mismatches", self.consecutive_failures);
            }
            self.consecutive_failures = 0;
            self.dwell = self.steady_interval;
            self.phase = VerifyPhase::Confirmed;
            return self.report(result, Some(cpu), Some(storage), RecoveryAction::None);
        }

        self.phase = VerifyPhase::Mismatched;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        warn!(
            "VERIFY: speed mismatch #{} (cpu {} rpm at {}, storage {} rpm at {}%)",
            self.consecutive_failures, cpu, expect.cpu_level, storage, expect.storage_duty
        );

        let action = if self.consecutive_failures > self.fail_threshold {
            debug!(
                "VERIFY: {} consecutive mismatches, escalating to cold reset",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
            self.dwell = self.reset_settle;
            RecoveryAction::ColdReset(HardwareFault::StuckFans)
        } else {
            self.dwell = self.change_delay;
            RecoveryAction::Resend
        };
        self.report(result, Some(cpu), Some(storage), action)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn unreadable_since(&self) -> Option<Duration> {
        self.unreadable_since
    }

    pub fn phase(&self) -> VerifyPhase {
        self.phase
    }

    // ── Internal ──────────────────────────────────────────────────

    fn unreadable(
        &mut self,
        now: Duration,
        expect: Expectation,
        cpu: Option<u32>,
        storage: Option<u32>,
    ) -> Verification {
        self.phase = VerifyPhase::Unreadable;
        let since = *self.unreadable_since.get_or_insert(now);
        let elapsed = now.saturating_sub(since);

        // Only the zone that failed to read is unknown.
        let result = VerificationResult {
            cpu_speed_ok: cpu.map(|rpm| self.cpu_ok(expect.cpu_level, rpm)),
            storage_speed_ok: storage.map(|rpm| self.storage_ok(expect.storage_duty, rpm)),
        };

        let action = if elapsed > self.reboot_grace {
            debug!(
                "VERIFY: fan speeds unreadable for {}s, escalating to cold reset",
                elapsed.as_secs()
            );
            self.unreadable_since = None;
            self.dwell = self.reset_settle;
            RecoveryAction::ColdReset(HardwareFault::Unresponsive)
        } else {
            warn!("VERIFY: fan speeds unreadable for {}s, retrying", elapsed.as_secs());
            self.dwell = self.change_delay;
            RecoveryAction::None
        };
        self.report(result, cpu, storage, action)
    }

    fn cpu_ok(&self, level: CpuFanLevel, rpm: u32) -> bool {
        match level {
            CpuFanLevel::High => rpm >= self.cpu_reference_rpm,
            CpuFanLevel::Low => rpm <= self.cpu_reference_rpm,
            CpuFanLevel::Med | CpuFanLevel::Unset => true,
        }
    }

    fn storage_ok(&self, duty: u8, rpm: u32) -> bool {
        if duty >= self.high_duty {
            rpm >= self.storage_reference_rpm
        } else if duty <= self.low_duty {
            rpm <= self.storage_reference_rpm
        } else {
            true
        }
    }

    fn report(
        &self,
        result: VerificationResult,
        cpu_rpm: Option<u32>,
        storage_rpm: Option<u32>,
        action: RecoveryAction,
    ) -> Verification {
        Verification {
            phase: self.phase,
            result,
            cpu_rpm,
            storage_rpm,
            consecutive_failures: self.consecutive_failures,
            action,
        }
    }
}
