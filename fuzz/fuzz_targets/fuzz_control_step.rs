//! Fuzz target: one control decision per input
//!
//! Interprets the input as raw temperatures and gains and verifies:
//! - The storage duty never leaves [hd_low_duty, hd_high_duty]
//! - A drive at or above the maximum always commands the ceiling
//! - An invalid CPU reading always decides High
//!
//! cargo fuzz run fuzz_control_step

#![no_main]

use hybridfan::config::ControllerConfig;
use hybridfan::control::cpu_level::{CpuThresholds, decide_level};
use hybridfan::control::pid::StoragePid;
use hybridfan::control::state::{CpuFanLevel, valid_temp};
use libfuzzer_sys::fuzz_target;

fn f32_at(data: &[u8], i: usize) -> f32 {
    let mut b = [0u8; 4];
    for (k, slot) in b.iter_mut().enumerate() {
        *slot = data.get(i * 4 + k).copied().unwrap_or(0);
    }
    f32::from_le_bytes(b)
}

fuzz_target!(|data: &[u8]| {
    let cpu = f32_at(data, 0);
    let hd_max = f32_at(data, 1);
    let hd_avg = f32_at(data, 2);
    let old_duty = f32_at(data, 3);
    let kp = f32_at(data, 4);
    let kd = f32_at(data, 5);
    if !(kp.is_finite() && kd.is_finite() && old_duty.is_finite()) {
        return;
    }

    let config = ControllerConfig {
        kp: kp.clamp(-1e3, 1e3),
        kd: kd.clamp(-1e3, 1e3),
        ..ControllerConfig::default()
    };

    let level = decide_level(
        Some(cpu),
        CpuFanLevel::Unset,
        false,
        &CpuThresholds::from_config(&config),
    );
    if valid_temp(Some(cpu)).is_none() {
        assert_eq!(level, CpuFanLevel::High);
    }

    let mut pid = StoragePid::from_config(&config);
    let step = pid.step(hd_max, hd_avg, old_duty.clamp(30.0, 100.0));
    assert!((config.hd_low_duty..=config.hd_high_duty).contains(&step.duty));
    if hd_max.is_finite() && hd_avg.is_finite() && hd_avg >= 0.0 && hd_max >= config.hd_max_allowed_temp {
        assert_eq!(step.duty, config.hd_high_duty);
    }
});
