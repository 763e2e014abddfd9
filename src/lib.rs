//! Control logic for a BLE push-to-talk button.
//!
//! Everything in this library is hardware-agnostic and testable on the
//! host (no embedded hardware required). The embedded binary in `main.rs`
//! backs the [`hal`] traits with the SoftDevice, GPIO and SAADC.
//!
//! Usage: `cargo test --lib --tests`
//!
//! Per tick, [`control::ControlLoop`] runs:
//!
//! 1. **Event deriver** ([`events`]) - press edge, button level, idle and
//!    debounce timers, connection status.
//! 2. **State machine** ([`state`]) - pure transition function.
//! 3. **Entry actions** ([`actions`]) - characteristic updates, indicator,
//!    and a [`actions::Directive`] telling the board loop whether to idle,
//!    power off or halt.
//!
//! [`battery`] turns a raw ADC sample into the published percentage.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod actions;
pub mod battery;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod hal;
pub mod state;

pub use actions::Directive;
pub use config::Config;
pub use control::ControlLoop;
pub use error::Error;
pub use events::{ButtonEdge, Event, EventSet};
pub use state::{DeviceState, StateRecord};
