//! Fuzz target: host tool output parsers
//!
//! Feeds arbitrary text to every parser of ipmitool, smartctl, lm-sensors
//! and sysctl output and verifies:
//! - No panics on malformed or truncated output
//! - Parsed temperatures are finite
//! - A zone speed is only reported when every header was readable
//!
//! cargo fuzz run fuzz_tool_output

#![no_main]

use hybridfan::adapters::host_sensors::{
    parse_lm_sensors, parse_smartctl_scan, parse_smartctl_temperature, parse_sysctl_cpu,
};
use hybridfan::adapters::ipmi::{parse_fan_sdr, zone_speed};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    for t in [
        parse_lm_sensors(&text),
        parse_sysctl_cpu(&text),
        parse_smartctl_temperature(&text),
    ]
    .into_iter()
    .flatten()
    {
        assert!(t.is_finite(), "parser produced non-finite temperature {t}");
    }

    for dev in parse_smartctl_scan(&text) {
        assert!(!dev.is_empty() && !dev.starts_with('#'));
    }

    let readings = parse_fan_sdr(&text);
    let headers: Vec<String> = readings.keys().cloned().collect();
    if zone_speed(&readings, &headers).is_ok() {
        assert!(readings.values().all(Option::is_some));
    }
});
