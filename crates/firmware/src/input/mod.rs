//! Wake-line input handling.
//!
//! The side button and the touch controller's interrupt are the only two
//! input lines on the watch. Both are active-low EXTI lines and both wake the
//! MCU, so every debounced edge goes two places:
//!
//! | Sink                           | Used for                               |
//! |--------------------------------|----------------------------------------|
//! | [`WakeLatch`]                  | held-line sleep veto, ending a halt    |
//! | [`InputChannel`] (monitor)     | activity clocks, lighting the screen   |
//!
//! [`LineReporter`] does both in one call. The GPIO loops that drive it live
//! in [`hardware`] and only build for the target.
//!
//! # Example
//!
//! ```no_run
//! use firmware::input::{LineReporter, LineRole};
//! use firmware::wake::WakeLatch;
//! use platform::Button;
//! use sleep_manager::InputChannel;
//!
//! static LATCH: WakeLatch = WakeLatch::new();
//! static INPUTS: InputChannel = InputChannel::new();
//!
//! let reporter = LineReporter::new(&LATCH, &INPUTS);
//! reporter.report(13, LineRole::Button(Button::Boot), true);
//! ```

pub use platform::{Button, InputEvent};
use sleep_manager::{notify_input, InputChannel};

use crate::wake::WakeLatch;

/// Settle time after an edge before the level is sampled.
pub const DEBOUNCE_MS: u64 = 20;

/// What an input line is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineRole {
    /// A push button
    Button(Button),
    /// The touch controller interrupt
    Touch,
}

impl LineRole {
    /// Event for a debounced level change.
    ///
    /// The touch interrupt carries no coordinates; the controller is only read
    /// by the UI, so touch-down reports the origin.
    pub const fn event(self, asserted: bool) -> InputEvent {
        match (self, asserted) {
            (Self::Button(button), true) => InputEvent::ButtonPress(button),
            (Self::Button(button), false) => InputEvent::ButtonRelease(button),
            (Self::Touch, true) => InputEvent::TouchDown { x: 0, y: 0 },
            (Self::Touch, false) => InputEvent::TouchUp,
        }
    }
}

/// Fans a debounced line edge out to the wake latch and the monitor queue.
#[derive(Clone, Copy)]
pub struct LineReporter<'a> {
    latch: &'a WakeLatch,
    inputs: &'a InputChannel,
}

impl<'a> LineReporter<'a> {
    /// Reporter over the board's latch and input queue.
    pub const fn new(latch: &'a WakeLatch, inputs: &'a InputChannel) -> Self {
        Self { latch, inputs }
    }

    /// Record the level of EXTI `line` and queue the matching event.
    ///
    /// Never blocks. Returns `false` if the queue was full and the event was
    /// dropped (logged by [`notify_input`]); the latch is updated either way.
    pub fn report(&self, line: u8, role: LineRole, asserted: bool) -> bool {
        self.latch.record(line, asserted);
        notify_input(self.inputs, role.event(asserted))
    }
}

/// EXTI button and touch loops (hardware only).
#[cfg(feature = "hardware")]
pub mod hardware;
