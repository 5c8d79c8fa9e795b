//! Activity clock and shared power flags
//!
//! [`PowerState`] is the part of the sleep manager that input drivers and UI
//! code share with the monitor task: two inactivity clocks and the
//! `is_sleeping` / `is_backlight_off` flags. It lives in a `static` on
//! hardware and is borrowed by [`SleepManager`](crate::SleepManager).
//!
//! The timestamps are `u64` microseconds. Cortex-M7 has no 64-bit atomics,
//! so they sit behind a critical-section blocking mutex; the flags are
//! lock-free `AtomicBool`s.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::MonotonicClock;

use crate::config::{ActivityMapping, ActivitySource, ClockSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamps {
    light_us: u64,
    user_us: u64,
}

/// Two monotonic "last activity" timestamps.
///
/// `light` drives the backlight and light-sleep timeouts; `user` drives the
/// deep-sleep timeout. Neither ever moves backwards.
pub struct ActivityClock<C> {
    clock: C,
    stamps: Mutex<CriticalSectionRawMutex, Cell<Stamps>>,
}

impl<C: MonotonicClock> ActivityClock<C> {
    /// Both clocks start at "now".
    pub fn new(clock: C) -> Self {
        let now = clock.now_us();
        Self {
            clock,
            stamps: Mutex::new(Cell::new(Stamps {
                light_us: now,
                user_us: now,
            })),
        }
    }

    /// Set both clocks to now.
    pub fn reset(&self) {
        self.touch(ClockSet::BOTH);
    }

    /// Set the selected clocks to now.
    pub fn touch(&self, clocks: ClockSet) {
        let now = self.clock.now_us();
        self.stamps.lock(|cell| {
            let mut s = cell.get();
            if clocks.light {
                s.light_us = s.light_us.max(now);
            }
            if clocks.user {
                s.user_us = s.user_us.max(now);
            }
            cell.set(s);
        });
    }

    /// Milliseconds since the light clock was last touched.
    pub fn inactive_ms(&self) -> u32 {
        let since = self.stamps.lock(|cell| cell.get().light_us);
        elapsed_ms(self.clock.now_us(), since)
    }

    /// Milliseconds since the user clock was last touched.
    pub fn user_inactive_ms(&self) -> u32 {
        let since = self.stamps.lock(|cell| cell.get().user_us);
        elapsed_ms(self.clock.now_us(), since)
    }

    /// Current time of the underlying clock.
    pub fn now_us(&self) -> u64 {
        self.clock.now_us()
    }
}

/// `now - since` in whole milliseconds, saturating at both ends.
pub(crate) fn elapsed_ms(now_us: u64, since_us: u64) -> u32 {
    u32::try_from(now_us.saturating_sub(since_us) / 1000).unwrap_or(u32::MAX)
}

/// Activity clocks plus the two power flags.
///
/// Invariant: `is_sleeping()` implies `is_backlight_off()`. The sleep path
/// sets the backlight flag before the sleeping flag; the wake path clears
/// them in the opposite order.
pub struct PowerState<C> {
    activity: ActivityClock<C>,
    mapping: Mutex<CriticalSectionRawMutex, Cell<ActivityMapping>>,
    sleeping: AtomicBool,
    backlight_off: AtomicBool,
}

impl<C: MonotonicClock> PowerState<C> {
    /// Awake, backlight on, both clocks at now, default mapping.
    pub fn new(clock: C) -> Self {
        Self {
            activity: ActivityClock::new(clock),
            mapping: Mutex::new(Cell::new(ActivityMapping::default())),
            sleeping: AtomicBool::new(false),
            backlight_off: AtomicBool::new(false),
        }
    }

    /// Replace the activity mapping.
    pub fn set_activity_mapping(&self, mapping: ActivityMapping) {
        self.mapping.lock(|cell| cell.set(mapping));
    }

    /// Current activity mapping.
    pub fn activity_mapping(&self) -> ActivityMapping {
        self.mapping.lock(Cell::get)
    }

    /// Reset the clocks mapped to `source`.
    pub fn record_activity(&self, source: ActivitySource) {
        let clocks = self.activity_mapping().clocks_for(source);
        trace!(
            "activity from {}: light={} user={}",
            source.as_str(),
            clocks.light,
            clocks.user
        );
        self.activity.touch(clocks);
    }

    /// Explicit activity reset.
    pub fn reset_activity_timer(&self) {
        self.record_activity(ActivitySource::Explicit);
    }

    /// Milliseconds since last activity (light clock).
    pub fn get_inactive_ms(&self) -> u32 {
        self.activity.inactive_ms()
    }

    /// Milliseconds since last user activity (deep-sleep clock).
    pub fn user_inactive_ms(&self) -> u32 {
        self.activity.user_inactive_ms()
    }

    /// Inside a light-sleep cycle.
    pub fn is_sleeping(&self) -> bool {
        self.sleeping.load(Ordering::Acquire)
    }

    /// Backlight logically off.
    pub fn is_backlight_off(&self) -> bool {
        self.backlight_off.load(Ordering::Acquire)
    }

    /// The activity clocks.
    pub fn activity(&self) -> &ActivityClock<C> {
        &self.activity
    }

    pub(crate) fn set_sleeping(&self, sleeping: bool) {
        self.sleeping.store(sleeping, Ordering::Release);
    }

    pub(crate) fn set_backlight_off(&self, off: bool) {
        self.backlight_off.store(off, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::MockClock;

    #[test]
    fn fresh_clock_reads_zero() {
        let clock = MockClock::at_ms(1_000);
        let activity = ActivityClock::new(clock.clone());
        assert_eq!(activity.inactive_ms(), 0);
        assert_eq!(activity.user_inactive_ms(), 0);
    }

    #[test]
    fn reset_restarts_both_clocks() {
        let clock = MockClock::new();
        let activity = ActivityClock::new(clock.clone());
        clock.advance_ms(750);
        assert_eq!(activity.inactive_ms(), 750);
        activity.reset();
        assert_eq!(activity.inactive_ms(), 0);
        assert_eq!(activity.user_inactive_ms(), 0);
    }

    #[test]
    fn touch_only_moves_selected_clock() {
        let clock = MockClock::new();
        let activity = ActivityClock::new(clock.clone());
        clock.advance_ms(400);
        activity.touch(ClockSet::LIGHT);
        clock.advance_ms(100);
        assert_eq!(activity.inactive_ms(), 100);
        assert_eq!(activity.user_inactive_ms(), 500);
    }

    #[test]
    fn stamps_never_move_backwards() {
        let clock = MockClock::at_ms(10_000);
        let activity = ActivityClock::new(clock.clone());
        // A clock that jumps back must not push the stamp into the past.
        clock.set_us(2_000_000);
        activity.reset();
        clock.set_us(10_500_000);
        assert_eq!(activity.inactive_ms(), 500);
    }

    #[test]
    fn elapsed_saturates() {
        assert_eq!(elapsed_ms(5, 10), 0);
        assert_eq!(elapsed_ms(u64::MAX, 0), u32::MAX);
        assert_eq!(elapsed_ms(2_500, 1_000), 1);
    }

    #[test]
    fn mapping_controls_which_clock_moves() {
        let clock = MockClock::new();
        let state = PowerState::new(clock.clone());
        state.set_activity_mapping(ActivityMapping {
            touch: ClockSet::NONE,
            ..ActivityMapping::default()
        });
        clock.advance_ms(300);
        state.record_activity(ActivitySource::Touch);
        assert_eq!(state.get_inactive_ms(), 300);
        state.record_activity(ActivitySource::Button);
        assert_eq!(state.get_inactive_ms(), 0);
    }

    #[test]
    fn flags_start_awake_and_lit() {
        let state = PowerState::new(MockClock::new());
        assert!(!state.is_sleeping());
        assert!(!state.is_backlight_off());
        state.set_backlight_off(true);
        state.set_sleeping(true);
        assert!(state.is_sleeping() && state.is_backlight_off());
    }
}
