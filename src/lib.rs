//! # growlight
//!
//! Decision core and host process for a greenhouse grow-light LED bank.
//!
//! The library exists so the controller can be tested without hardware and
//! so `main.rs` stays a thin CLI dispatcher.
//!
//! - **Controller**: `core` holds the time window, mode classifier, sampling
//!   aggregator, decision engine and on-time tracker, driven by `Controller::tick`
//! - **Collaborators**: `ephemeris` (sunrise/sunset), `hardware` (light
//!   sensor, power monitor, LED actuator) and `ledger` (on-time records)
//! - **Configuration**: `config` for `growlight.toml` with hot reload
//! - **Host**: `growlight` runs the 1 Hz loop; `io` carries gateways, signals,
//!   the lock file and operator commands; `commands` implements subcommands
//! - **Infrastructure**: `common` (logging, constants, utilities), `error`, `time`

// Logger macros must be visible to every module below
#[macro_use]
pub mod common;

pub mod args;
pub mod commands;
pub mod config;
pub mod core;
pub mod ephemeris;
pub mod error;
pub mod hardware;
pub mod io;
pub mod ledger;
pub mod time;

mod growlight;

pub use self::growlight::Growlight;
