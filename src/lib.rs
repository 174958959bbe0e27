//! Grow box controller library.
//!
//! A periodic control loop that drives a grow light, an exhaust fan and
//! an irrigation pump from sensor readings, following a phase-based light
//! schedule.  All host interaction goes through the port traits in
//! [`app::ports`]; the [`adapters`] module provides in-process
//! implementations for simulation and testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod phase;
pub mod scheduler;
