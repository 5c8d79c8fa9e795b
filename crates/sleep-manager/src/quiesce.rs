//! UI quiesce coordinator
//!
//! Before a halt the UI engine's running timers are paused (and, optionally,
//! screen invalidation is disabled) under the engine's lock, so nothing in
//! the engine fires half-way through the sleep sequence. After the halt the
//! same timers are resumed and forced to run once so the watch face redraws
//! immediately instead of on its next natural tick.

use embassy_time::{Duration, Timer};
use heapless::Vec;
use platform::{UiEngine, UiSession};

use crate::config::{LockPolicy, SleepConfig};
use crate::error::SleepError;

/// Maximum number of timers paused for one sleep.
pub const SNAPSHOT_CAPACITY: usize = 8;

// ─── Timer snapshot ──────────────────────────────────────────────────────────

/// Timers paused for the current sleep, in engine order.
///
/// Only timers that were running are recorded, so resuming exactly this list
/// restores every timer's pause state. Timers past the capacity are left
/// running and flagged via [`TimerSnapshot::overflowed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot<T> {
    timers: Vec<T, SNAPSHOT_CAPACITY>,
    skipped: usize,
}

impl<T: Copy + PartialEq> TimerSnapshot<T> {
    /// Empty snapshot.
    pub const fn new() -> Self {
        Self {
            timers: Vec::new(),
            skipped: 0,
        }
    }

    /// Recorded handles.
    pub fn timers(&self) -> &[T] {
        &self.timers
    }

    /// Number of recorded handles.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// True if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// True if running timers were left unpaused for lack of space.
    pub fn overflowed(&self) -> bool {
        self.skipped > 0
    }

    /// Running timers left unpaused.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn clear(&mut self) {
        self.timers.clear();
        self.skipped = 0;
    }
}

impl<T: Copy + PartialEq> Default for TimerSnapshot<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Lock acquisition ────────────────────────────────────────────────────────

/// Take the UI lock with bounded retries.
///
/// Makes `policy.attempts()` attempts of `policy.timeout_ms` each, sleeping
/// `policy.backoff_ms` between them. No backoff follows the last attempt.
pub async fn acquire_ui_lock<'u, U: UiEngine>(ui: &'u U, policy: &LockPolicy) -> Option<U::Session<'u>> {
    let attempts = policy.attempts();
    let timeout = Duration::from_millis(u64::from(policy.timeout_ms));
    for attempt in 1..=attempts {
        if let Some(session) = ui.lock(timeout).await {
            if attempt > 1 {
                debug!("ui lock acquired on attempt {}", attempt);
            }
            return Some(session);
        }
        warn!("ui lock attempt {} of {} timed out", attempt, attempts);
        if attempt < attempts && policy.backoff_ms > 0 {
            Timer::after_millis(u64::from(policy.backoff_ms)).await;
        }
    }
    None
}

// ─── Pause / resume under the lock ───────────────────────────────────────────

/// Pause every running timer, recording up to [`SNAPSHOT_CAPACITY`] handles.
///
/// Already-paused timers are not touched.
pub fn snapshot_and_pause<S: UiSession>(session: &mut S, snapshot: &mut TimerSnapshot<S::Timer>) {
    snapshot.clear();
    let mut cursor = session.next_timer(None);
    while let Some(timer) = cursor {
        if !session.is_timer_paused(timer) {
            if snapshot.timers.push(timer).is_ok() {
                session.pause_timer(timer);
            } else {
                snapshot.skipped = snapshot.skipped.saturating_add(1);
            }
        }
        cursor = session.next_timer(Some(timer));
    }
    if snapshot.overflowed() {
        warn!(
            "timer snapshot full: {} timers left running during sleep",
            snapshot.skipped
        );
    }
    debug!("paused {} ui timers", snapshot.len());
}

/// Resume and force-run every recorded timer, then clear the snapshot.
pub fn resume_timers<S: UiSession>(session: &mut S, snapshot: &mut TimerSnapshot<S::Timer>) {
    for &timer in snapshot.timers() {
        session.resume_timer(timer);
        session.make_ready(timer);
    }
    debug!("resumed {} ui timers", snapshot.len());
    snapshot.clear();
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// Suspend/restore of the UI engine around a halt.
#[derive(Debug, Clone)]
pub struct UiQuiesce<T> {
    policy: LockPolicy,
    pause_timers: bool,
    toggle_rendering: bool,
    snapshot: TimerSnapshot<T>,
}

impl<T: Copy + PartialEq> UiQuiesce<T> {
    /// Coordinator configured from `config`.
    pub fn new(config: &SleepConfig) -> Self {
        Self {
            policy: config.ui_lock,
            pause_timers: config.pause_ui_timers,
            toggle_rendering: config.toggle_rendering,
            snapshot: TimerSnapshot::new(),
        }
    }

    /// Current snapshot (empty outside a sleep cycle).
    pub fn snapshot(&self) -> &TimerSnapshot<T> {
        &self.snapshot
    }

    /// Lock, pause timers, optionally disable invalidation, unlock.
    ///
    /// On error the engine is untouched and the lock is released.
    pub async fn suspend<U>(&mut self, ui: &U) -> Result<(), SleepError>
    where
        U: UiEngine<Timer = T>,
    {
        let Some(mut session) = acquire_ui_lock(ui, &self.policy).await else {
            warn!("sleep aborted: ui lock not acquired");
            return Err(SleepError::UiLockTimeout);
        };
        if !session.has_display() {
            warn!("sleep aborted: no display registered");
            return Err(SleepError::NoDisplay);
        }
        if self.pause_timers {
            snapshot_and_pause(&mut session, &mut self.snapshot);
        }
        if self.toggle_rendering {
            session.set_invalidation(false);
        }
        Ok(())
    }

    /// Lock, re-enable invalidation, resume recorded timers, unlock.
    ///
    /// On lock failure the timers stay paused and the snapshot is kept so a
    /// later call can finish the job.
    pub async fn restore<U>(&mut self, ui: &U) -> Result<(), SleepError>
    where
        U: UiEngine<Timer = T>,
    {
        let Some(mut session) = acquire_ui_lock(ui, &self.policy).await else {
            warn!("wake incomplete: ui lock not acquired, {} timers still paused", self.snapshot.len());
            return Err(SleepError::UiLockTimeout);
        };
        if self.toggle_rendering {
            session.set_invalidation(true);
        }
        resume_timers(&mut session, &mut self.snapshot);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::mocks::MockUi;

    fn fast_policy() -> LockPolicy {
        LockPolicy {
            timeout_ms: 1,
            retries: 5,
            backoff_ms: 0,
        }
    }

    #[tokio::test]
    async fn acquire_gives_up_after_retries_plus_one() {
        let ui = MockUi::with_timers(1);
        ui.fail_next_locks(usize::MAX);
        assert!(acquire_ui_lock(&ui, &fast_policy()).await.is_none());
        assert_eq!(ui.lock_attempts(), 6);
    }

    #[tokio::test]
    async fn acquire_succeeds_on_last_attempt() {
        let ui = MockUi::with_timers(1);
        ui.fail_next_locks(5);
        assert!(acquire_ui_lock(&ui, &fast_policy()).await.is_some());
        assert_eq!(ui.lock_attempts(), 6);
    }

    #[tokio::test]
    async fn acquire_backs_off_between_attempts() {
        let ui = MockUi::with_timers(1);
        ui.fail_next_locks(2);
        let policy = LockPolicy {
            timeout_ms: 1,
            retries: 2,
            backoff_ms: 20,
        };
        let start = embassy_time::Instant::now();
        assert!(acquire_ui_lock(&ui, &policy).await.is_some());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn pause_skips_already_paused_timers() {
        let ui = MockUi::with_timers(2);
        let paused = ui.add_paused_timer();
        let mut snapshot = TimerSnapshot::new();
        {
            let mut session = ui.lock(Duration::from_millis(1)).await.unwrap();
            snapshot_and_pause(&mut session, &mut snapshot);
        }
        assert_eq!(snapshot.timers(), [0, 1]);
        assert_eq!(ui.paused_flags(), [true, true, true]);
        assert_eq!(ui.snapshot().timers[paused].pause_count, 0);

        {
            let mut session = ui.lock(Duration::from_millis(1)).await.unwrap();
            resume_timers(&mut session, &mut snapshot);
        }
        assert!(snapshot.is_empty());
        assert_eq!(ui.paused_flags(), [false, false, true]);
        assert_eq!(ui.snapshot().timers[paused].ready_count, 0);
    }

    #[tokio::test]
    async fn overflow_leaves_excess_timers_running() {
        let ui = MockUi::with_timers(SNAPSHOT_CAPACITY + 3);
        let mut snapshot = TimerSnapshot::new();
        {
            let mut session = ui.lock(Duration::from_millis(1)).await.unwrap();
            snapshot_and_pause(&mut session, &mut snapshot);
        }
        assert_eq!(snapshot.len(), SNAPSHOT_CAPACITY);
        assert!(snapshot.overflowed());
        assert_eq!(snapshot.skipped(), 3);
        let flags = ui.paused_flags();
        assert!(flags[..SNAPSHOT_CAPACITY].iter().all(|p| *p));
        assert!(flags[SNAPSHOT_CAPACITY..].iter().all(|p| !*p));
    }

    #[tokio::test]
    async fn suspend_without_display_touches_nothing() {
        let ui = MockUi::with_timers(3);
        ui.remove_display();
        let mut quiesce = UiQuiesce::new(&SleepConfig::default().with_ui_lock(fast_policy()));
        assert_eq!(quiesce.suspend(&ui).await, Err(SleepError::NoDisplay));
        assert_eq!(ui.paused_flags(), [false, false, false]);
        // Lock released: a second session can be taken.
        assert!(ui.lock(Duration::from_millis(1)).await.is_some());
    }

    #[tokio::test]
    async fn rendering_toggle_round_trips() {
        let ui = MockUi::with_timers(1);
        let config = SleepConfig::default()
            .with_ui_lock(fast_policy())
            .with_rendering_toggle(true);
        let mut quiesce = UiQuiesce::new(&config);
        quiesce.suspend(&ui).await.unwrap();
        assert!(!ui.snapshot().invalidation);
        quiesce.restore(&ui).await.unwrap();
        assert!(ui.snapshot().invalidation);
        assert_eq!(ui.snapshot().invalidation_calls, 2);
    }

    #[tokio::test]
    async fn failed_restore_keeps_snapshot_for_retry() {
        let ui = MockUi::with_timers(2);
        let mut quiesce = UiQuiesce::new(&SleepConfig::default().with_ui_lock(fast_policy()));
        quiesce.suspend(&ui).await.unwrap();
        ui.fail_next_locks(usize::MAX);
        assert_eq!(quiesce.restore(&ui).await, Err(SleepError::UiLockTimeout));
        assert_eq!(quiesce.snapshot().len(), 2);
        assert_eq!(ui.paused_flags(), [true, true]);

        ui.fail_next_locks(0);
        quiesce.restore(&ui).await.unwrap();
        assert!(quiesce.snapshot().is_empty());
        assert_eq!(ui.paused_flags(), [false, false]);
    }
}
