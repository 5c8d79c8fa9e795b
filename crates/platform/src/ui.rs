//! UI engine capability
//!
//! The render/timer engine is owned by the UI task. The sleep manager only
//! needs to walk its timer list, pause and resume timers, and toggle screen
//! invalidation, all while holding the engine's lock. The lock is modelled
//! as a session guard: dropping the session releases it.

use embassy_time::Duration;

/// A UI engine guarded by a lock.
pub trait UiEngine {
    /// Opaque timer handle
    type Timer: Copy + PartialEq;

    /// Locked view of the engine
    type Session<'a>: UiSession<Timer = Self::Timer>
    where
        Self: 'a;

    /// Try to take the lock, giving up after `timeout`.
    fn lock(
        &self,
        timeout: Duration,
    ) -> impl core::future::Future<Output = Option<Self::Session<'_>>>;
}

/// Operations available while the UI lock is held.
pub trait UiSession {
    /// Opaque timer handle
    type Timer: Copy + PartialEq;

    /// False if no display has been registered with the engine yet.
    fn has_display(&self) -> bool;

    /// Iterate timers: `None` yields the first, `Some(t)` the one after `t`.
    fn next_timer(&self, after: Option<Self::Timer>) -> Option<Self::Timer>;

    /// True if `timer` is currently paused.
    fn is_timer_paused(&self, timer: Self::Timer) -> bool;

    /// Pause `timer`. Unknown handles are ignored.
    fn pause_timer(&mut self, timer: Self::Timer);

    /// Resume `timer`. Unknown handles are ignored.
    fn resume_timer(&mut self, timer: Self::Timer);

    /// Run `timer` on the next engine tick regardless of its period.
    fn make_ready(&mut self, timer: Self::Timer);

    /// Enable or disable screen invalidation (redraw work).
    fn set_invalidation(&mut self, enabled: bool);
}
