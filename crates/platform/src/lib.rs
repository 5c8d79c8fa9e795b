//! Hardware Abstraction Layer (HAL) for the wrist-watch firmware
//!
//! This crate provides trait-based abstractions for every collaborator the
//! power/activity state machine touches, enabling development and testing
//! without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Feature Layers (sleep-manager)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC)
//! ```
//!
//! # Abstraction Levels
//!
//! ## Collaborators of the sleep manager
//! - [`Backlight`] - Display backlight on/off
//! - [`UiEngine`] / [`UiSession`] - Render/timer engine behind a scoped lock
//! - [`HaltController`] - Light-sleep halt and destructive deep-sleep halt
//! - [`PowerMonitor`] - Battery and external power (VBUS) readings
//! - [`WakeLines`] - Level reads of the active-low wake lines
//! - [`RadioLink`] - Networking subsystem suspend/resume hooks
//! - [`RetainedSlot`] - One word of memory that survives deep sleep
//! - [`SettingsStore`] - Persistent timeout values
//! - [`UptimeStore`] - Best-effort persistence of uptime counters
//!
//! ## Supporting types
//! - [`clock`] - Monotonic microsecond time source
//! - [`input`] - Button and touch events
//! - [`bq25895`] - USB-C PMIC register map and [`PowerMonitor`] driver
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] module
//! - `hardware`: Physical hardware implementations
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{Backlight, PowerMonitor};
//!
//! fn dim_if_on_battery<B: Backlight, P: PowerMonitor>(backlight: &mut B, pmic: &mut P) {
//!     if !pmic.is_usb_connected() {
//!         backlight.off();
//!     }
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

#[cfg(feature = "std")]
extern crate std;

pub mod backlight;
pub mod bq25895;
pub mod clock;
pub mod config;
pub mod input;
pub mod power;
pub mod radio;
pub mod retained;
pub mod settings;
pub mod ui;
pub mod wake;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export main collaborator traits
pub use backlight::Backlight;
pub use clock::{EmbassyClock, MonotonicClock};
pub use input::{Button, InputEvent};
pub use radio::{AutoConnect, NoRadio, RadioLink};
pub use retained::RetainedSlot;
pub use settings::{NoSettings, NoUptime, SettingsStore, UptimeStore};
pub use ui::{UiEngine, UiSession};

// Re-export power types
pub use power::{HaltController, PowerMonitor, WakeCause, WakeReport};

// Re-export wake-line types
pub use wake::{WakeLevel, WakeLine, WakeLineKind, WakeLines, WakeSources, MAX_WAKE_LINES};
