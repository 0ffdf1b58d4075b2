//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `hardware`     | SensorPort         | `host_sensors`              |
//! |                | ActuatorPort       | `ipmi`                      |
//! | `host_sensors` | (used by hardware) | lm-sensors, sysctl, smartctl|
//! | `ipmi`         | (used by hardware) | ipmitool (raw, sdr, bmc)    |
//! | `log_sink`     | EventSink          | `log` facade                |
//! | `config_file`  | ConfigPort         | JSON file                   |
//! | `time`         | TimePort           | `std::time::Instant`        |

pub mod config_file;
pub mod hardware;
pub mod host_sensors;
pub mod ipmi;
pub mod log_sink;
pub mod time;
pub(super) mod utils;
