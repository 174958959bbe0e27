//! Application core: pure domain logic, zero I/O.
//!
//! The [`service::ControlLoop`] sequences the light, climate and irrigation
//! controllers once per tick.  All interaction with the host happens
//! through the **port traits** defined in [`ports`].

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
