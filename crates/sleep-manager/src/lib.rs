//! Power/activity state machine for the wrist-watch firmware
//!
//! Decides when to blank the display, when to halt the MCU in light or deep
//! sleep, and how to quiesce and restore the UI engine and radio around the
//! halt. Every collaborator is a `platform` trait, so the whole state machine
//! runs on the host against `platform::mocks`.
//!
//! # Components
//!
//! ```text
//! input drivers ──notify_input──▶ monitor::run ──▶ SleepManager
//!                                                   ├── PowerState   (activity clocks, flags)
//!                                                   ├── DisplayPower (backlight + USB veto)
//!                                                   ├── UiQuiesce    (UI lock, timer snapshot)
//!                                                   └── Hardware<H>  (halt, radio, retained slot…)
//! ```
//!
//! # Features
//!
//! - `deep-sleep` (default): compile the destructive halt path
//! - `defmt`: defmt log backend and `defmt::Format` derives
//! - `tracing`: tracing log backend for desktop builds
//! - `std`: `std::error::Error` for [`SleepError`]

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::await_holding_lock)] // UI session guards are dropped before every await
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

pub mod activity;
pub mod backlight;
pub mod config;
pub mod error;
pub mod monitor;
pub mod orchestrator;
pub mod quiesce;
pub mod retained;

pub use activity::{ActivityClock, PowerState};
pub use backlight::DisplayPower;
pub use config::{ActivityMapping, ActivitySource, ClockSet, LockPolicy, SleepConfig};
pub use error::SleepError;
pub use monitor::{notify_input, poll_once, run, InputChannel, InputReceiver, PollOutcome};
pub use orchestrator::{wake_sources, Hardware, SleepHal, SleepManager, Veto};
pub use quiesce::{TimerSnapshot, UiQuiesce, SNAPSHOT_CAPACITY};
pub use retained::{take_sleep_kind, SleepKind};
