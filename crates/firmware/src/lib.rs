//! Wrist-watch firmware
//!
//! Board layer for the power/activity state machine in `sleep-manager`:
//! the UI runtime it quiesces, the wake-line latch and Standby entry it halts
//! through, the backlight pin and the boot-time retained-slot check.
//!
//! # Architecture
//!
//! ```text
//! Application Layer (main.rs: tasks, statics)
//!         ↓
//! Board Layer (this crate: board, input, ui, wake, backlight, boot)
//!         ↓
//! Feature Layer (sleep-manager)
//!         ↓
//! Platform HAL (platform traits, Embassy, STM32)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for STM32H7 target (embassy executor, STM32 HAL)
//! - `defmt` - defmt logging and `defmt::Format` derives
//! - `tracing` - tracing log backend for desktop builds
//! - `std` - `std::error::Error` impls (host testing)
//!
//! # Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]
#![allow(clippy::unused_self)]
#![allow(clippy::unused_async)]

pub mod backlight;
pub mod board;
pub mod boot;
pub mod input;
pub mod ui;
pub mod wake;

// Re-export key types
pub use backlight::PinBacklight;
pub use boot::{boot_reason, BootReason};
pub use input::{LineReporter, LineRole};
pub use ui::{UiRuntime, UiState};
pub use wake::{LatchHalt, WakeLatch};

#[cfg(feature = "hardware")]
pub use board::hardware::{WatchBoard, WatchManager};
