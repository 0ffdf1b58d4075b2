//! Application core — domain orchestration, zero direct I/O.
//!
//! This module contains the control loop of the two-zone fan controller:
//! CPU levels, storage PID, cross-zone overrides and fan verification.
//! All interaction with the host happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real hardware.

pub mod events;
pub mod ports;
pub mod service;
