//! PID controller for the storage fan zone
//!
//! Converts the average drive temperature into a duty cycle. The
//! correction is added onto the persisted duty (not a fixed baseline) so
//! sub-integer drift survives between polls. Gains are scaled per minute.

use crate::config::ControllerConfig;

/// Round half up to an integer duty.
pub fn round_duty(duty: f32) -> u8 {
    (duty + 0.5).floor().clamp(0.0, 100.0) as u8
}

/// The three correction terms of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

/// Which branch produced the duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidBranch {
    /// Regular PID correction.
    Normal,
    /// A drive reached the maximum allowed temperature.
    SafetyOverride,
    /// No usable drive temperature.
    InvalidReading,
}

/// Result of one controller step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidStep {
    /// Clamped duty to persist for the next step.
    pub duty_f: f32,
    /// Rounded duty to command.
    pub duty: u8,
    /// `hd_avg - target` (0 when the reading was invalid).
    pub error: f32,
    pub terms: PidTerms,
    pub branch: PidBranch,
    /// CPU fans must go High on the next evaluation.
    pub cpu_override: bool,
}

/// PID controller
pub struct StoragePid {
    kp: f32,
    ki: f32,
    kd: f32,
    setpoint: f32,
    /// Control period in minutes.
    dt: f32,
    max_allowed_temp: f32,
    integral: f32,
    prev_error: f32,
    output_min: f32,
    output_max: f32,
    cpu_override_threshold: u8,
    cross_cooling: bool,
}

impl StoragePid {
    pub fn new(kp: f32, ki: f32, kd: f32, setpoint: f32, dt_minutes: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint,
            dt: dt_minutes,
            max_allowed_temp: f32::INFINITY,
            integral: 0.0,
            prev_error: 0.0,
            output_min: 0.0,
            output_max: 100.0,
            cpu_override_threshold: 100,
            cross_cooling: false,
        }
    }

    /// Build the controller with every limit taken from `config`.
    pub fn from_config(config: &ControllerConfig) -> Self {
        let mut pid = Self::new(
            config.kp,
            config.ki,
            config.kd,
            config.hd_target_temp,
            config.storage_dt_minutes(),
        );
        pid.set_limits(f32::from(config.hd_low_duty), f32::from(config.hd_high_duty));
        pid.set_max_allowed_temp(config.hd_max_allowed_temp);
        pid.set_cpu_override(config.cpu_assists_storage, config.cpu_override_duty_threshold);
        pid
    }

    /// Set output limits
    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.output_min = min;
        self.output_max = max;
    }

    /// Drive temperature at which the PID is bypassed for maximum duty.
    pub fn set_max_allowed_temp(&mut self, temp: f32) {
        self.max_allowed_temp = temp;
    }

    /// Configure the storage→CPU coupling output.
    pub fn set_cpu_override(&mut self, enabled: bool, duty_threshold: u8) {
        self.cross_cooling = enabled;
        self.cpu_override_threshold = duty_threshold;
    }

    /// Compute the next duty from the hottest drive, the drive average and
    /// the previously persisted duty.
    ///
    /// The integral is frozen (neither accumulated nor cleared) in the
    /// safety-override and invalid-reading branches.
    pub fn step(&mut self, hd_max: f32, hd_avg: f32, old_duty: f32) -> PidStep {
        let invalid = !hd_max.is_finite() || hd_max < 0.0 || !hd_avg.is_finite() || hd_avg < 0.0;
        if invalid {
            return self.finish(self.output_max, 0.0, PidTerms::default(), PidBranch::InvalidReading);
        }

        let error = hd_avg - self.setpoint;

        if hd_max >= self.max_allowed_temp {
            self.prev_error = error;
            return self.finish(self.output_max, error, PidTerms::default(), PidBranch::SafetyOverride);
        }

        // Proportional
        let p = self.kp * error;

        // Integral
        self.integral += error * self.dt;
        let i = self.ki * self.integral;

        // Derivative, per minute of elapsed interval
        let derivative = if self.dt > 0.0 {
            (error - self.prev_error) / self.dt
        } else {
            0.0
        };
        let d = self.kd * derivative;

        self.prev_error = error;

        // Overflowing terms (inf - inf) fail toward maximum cooling.
        let raw = old_duty + p + i + d;
        let duty_f = if raw.is_nan() {
            self.output_max
        } else {
            raw.clamp(self.output_min, self.output_max)
        };
        self.finish(duty_f, error, PidTerms { p, i, d }, PidBranch::Normal)
    }

    /// Reset controller memory
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.prev_error
    }

    fn finish(&self, duty_f: f32, error: f32, terms: PidTerms, branch: PidBranch) -> PidStep {
        let duty = round_duty(duty_f);
        PidStep {
            duty_f,
            duty,
            error,
            terms,
            branch,
            cpu_override: self.cross_cooling && duty >= self.cpu_override_threshold,
        }
    }
}
