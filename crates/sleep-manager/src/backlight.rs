//! Display power controller
//!
//! Owns the logical backlight state (`PowerState::is_backlight_off`) and
//! the "keep the screen on while on USB" veto. The hardware backlight is
//! passed in per call so the orchestrator can keep every collaborator in one
//! place.

use platform::{Backlight, MonotonicClock, PowerMonitor};

use crate::activity::PowerState;
use crate::config::ActivitySource;

/// Pure backlight timeout predicate.
///
/// True once `idle_ms` reaches `threshold_ms`, unless the backlight is
/// already off or the USB veto is active.
pub const fn backlight_due(idle_ms: u32, threshold_ms: u32, already_off: bool, vetoed: bool) -> bool {
    idle_ms >= threshold_ms && !already_off && !vetoed
}

/// Backlight on/off policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPower {
    prevent_off_on_usb: bool,
}

impl DisplayPower {
    /// Controller with the given USB veto setting.
    pub const fn new(prevent_off_on_usb: bool) -> Self {
        Self { prevent_off_on_usb }
    }

    /// True if the USB veto is configured and USB power is present.
    pub fn vetoed<P: PowerMonitor>(&self, power: &mut P) -> bool {
        self.prevent_off_on_usb && power.is_usb_connected()
    }

    /// Backlight timeout check against `threshold_ms`.
    pub fn should_turn_off<C, P>(&self, state: &PowerState<C>, power: &mut P, threshold_ms: u32) -> bool
    where
        C: MonotonicClock,
        P: PowerMonitor,
    {
        let idle = state.get_inactive_ms();
        if idle < threshold_ms || state.is_backlight_off() {
            return false;
        }
        backlight_due(idle, threshold_ms, false, self.vetoed(power))
    }

    /// Switch the backlight off unless it is already off or vetoed.
    ///
    /// Returns `true` if the backlight was switched.
    pub fn turn_off<C, B, P>(&self, state: &PowerState<C>, backlight: &mut B, power: &mut P) -> bool
    where
        C: MonotonicClock,
        B: Backlight,
        P: PowerMonitor,
    {
        if state.is_backlight_off() {
            return false;
        }
        if self.vetoed(power) {
            debug!("backlight off vetoed: usb connected");
            return false;
        }
        backlight.off();
        state.set_backlight_off(true);
        info!("backlight off");
        true
    }

    /// Switch the backlight on. Counts as activity.
    ///
    /// Returns `true` if the backlight was switched.
    pub fn turn_on<C, B>(&self, state: &PowerState<C>, backlight: &mut B) -> bool
    where
        C: MonotonicClock,
        B: Backlight,
    {
        if !state.is_backlight_off() {
            return false;
        }
        backlight.on();
        state.set_backlight_off(false);
        state.record_activity(ActivitySource::BacklightOn);
        info!("backlight on");
        true
    }

    /// Sleep entry: off regardless of the USB veto, so that a sleeping
    /// device always has a dark screen.
    pub(crate) fn force_off<C, B>(&self, state: &PowerState<C>, backlight: &mut B)
    where
        C: MonotonicClock,
        B: Backlight,
    {
        if !state.is_backlight_off() {
            backlight.off();
            state.set_backlight_off(true);
        }
    }

    /// Wake exit: on without touching the activity clocks.
    pub(crate) fn restore_on<C, B>(&self, state: &PowerState<C>, backlight: &mut B)
    where
        C: MonotonicClock,
        B: Backlight,
    {
        if state.is_backlight_off() {
            backlight.on();
            state.set_backlight_off(false);
        }
    }
}
