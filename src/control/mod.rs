//! Control algorithms — pure functions and small state holders, zero I/O.
//!
//! | Module      | Zone    | Role                                      |
//! |-------------|---------|-------------------------------------------|
//! | `cpu_level` | CPU     | Level state machine with hysteresis       |
//! | `pid`       | Storage | Duty-cycle PID with safety override       |
//! | `coupling`  | Both    | CPU → storage override latch              |
//! | `state`     | Both    | ControllerState and TemperatureSample     |

pub mod coupling;
pub mod cpu_level;
pub mod pid;
pub mod state;
