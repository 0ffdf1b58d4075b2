//! hybridfan — two-zone thermal fan controller.
//!
//! Exposes the control core, its port traits and the host adapters so the
//! binary and the integration tests share one implementation.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod logging;
pub mod verification;

pub use error::Error;
