//! UI runtime
//!
//! The UI task owns a small timer/render engine: a bounded table of periodic
//! timers plus a dirty flag the renderer polls. The engine sits behind an
//! async mutex so the sleep manager can take it over around a halt
//! (pause every running timer, stop invalidation) and hand it back.
//!
//! Timers are identified by [`TimerId`] slot handles. Deleting a timer frees
//! its slot; handles are not reused while the slot is occupied.
//!
//! [`UiRuntime::run`] sleeps until the next running timer is due. With every
//! timer paused it waits for a change notification, so a quiesced UI adds no
//! wakeups of its own during a light sleep.

use core::future::Future;

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Instant, Timer};
use heapless::Vec;
use platform::{UiEngine, UiSession};

/// Capacity of the timer table.
pub const MAX_UI_TIMERS: usize = 16;

/// Handle to a registered UI timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerId(u8);

impl TimerId {
    /// Slot index
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// UI engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UiError {
    /// All [`MAX_UI_TIMERS`] slots are in use
    TimerTableFull,
    /// A timer period of zero was requested
    ZeroPeriod,
}

impl core::fmt::Display for UiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TimerTableFull => write!(f, "UI timer table full"),
            Self::ZeroPeriod => write!(f, "UI timer period must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UiError {}

#[derive(Debug, Clone, Copy)]
struct UiTimer {
    period_ms: u32,
    next_due_ms: u64,
    paused: bool,
    ready: bool,
}

/// Timer table and render flags. Only reachable through the runtime's lock.
#[derive(Debug)]
pub struct UiState {
    timers: [Option<UiTimer>; MAX_UI_TIMERS],
    invalidation: bool,
    dirty: bool,
    display_attached: bool,
}

impl UiState {
    /// Empty engine: no timers, invalidation on, no display.
    pub const fn new() -> Self {
        Self {
            timers: [None; MAX_UI_TIMERS],
            invalidation: true,
            dirty: false,
            display_attached: false,
        }
    }

    /// Mark the panel as registered. Sleep is refused until this is called.
    pub fn attach_display(&mut self) {
        self.display_attached = true;
        self.dirty = true;
    }

    /// Register a periodic timer first due `period_ms` after `now_ms`.
    pub fn create_timer(&mut self, period_ms: u32, now_ms: u64) -> Result<TimerId, UiError> {
        if period_ms == 0 {
            return Err(UiError::ZeroPeriod);
        }
        let (index, slot) = self
            .timers
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(UiError::TimerTableFull)?;
        let id = u8::try_from(index).map_err(|_| UiError::TimerTableFull)?;
        *slot = Some(UiTimer {
            period_ms,
            next_due_ms: now_ms.saturating_add(u64::from(period_ms)),
            paused: false,
            ready: false,
        });
        Ok(TimerId(id))
    }

    /// Remove a timer. Unknown handles are ignored.
    pub fn delete_timer(&mut self, id: TimerId) {
        if let Some(slot) = self.timers.get_mut(id.index()) {
            *slot = None;
        }
    }

    /// Number of registered timers.
    pub fn timer_count(&self) -> usize {
        self.timers.iter().flatten().count()
    }

    /// Paused flag of `id` (`None` for an empty slot).
    pub fn is_paused(&self, id: TimerId) -> Option<bool> {
        self.timer(id).map(|t| t.paused)
    }

    /// Request a redraw. Ignored while invalidation is disabled.
    ///
    /// Returns `true` if the request was recorded.
    pub fn invalidate(&mut self) -> bool {
        if self.invalidation {
            self.dirty = true;
        }
        self.invalidation
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::take(&mut self.dirty)
    }

    /// Screen invalidation currently enabled.
    pub fn invalidation_enabled(&self) -> bool {
        self.invalidation
    }

    /// Collect every running timer that is due at `now_ms` and reschedule it.
    ///
    /// A timer forced with `make_ready` is due immediately. Paused timers are
    /// never due.
    pub fn due_timers(&mut self, now_ms: u64) -> Vec<TimerId, MAX_UI_TIMERS> {
        let mut due = Vec::new();
        for (index, slot) in self.timers.iter_mut().enumerate() {
            let Some(timer) = slot else { continue };
            if timer.paused || !(timer.ready || now_ms >= timer.next_due_ms) {
                continue;
            }
            timer.ready = false;
            timer.next_due_ms = now_ms.saturating_add(u64::from(timer.period_ms));
            if let Ok(id) = u8::try_from(index) {
                // same capacity as the table
                let _ = due.push(TimerId(id));
            }
        }
        due
    }

    /// Earliest time a running timer is due, `None` if all are paused.
    ///
    /// A timer forced with `make_ready` is due at 0.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.timers
            .iter()
            .flatten()
            .filter(|t| !t.paused)
            .map(|t| if t.ready { 0 } else { t.next_due_ms })
            .min()
    }

    fn timer(&self, id: TimerId) -> Option<&UiTimer> {
        self.timers.get(id.index()).and_then(Option::as_ref)
    }

    fn timer_mut(&mut self, id: TimerId) -> Option<&mut UiTimer> {
        self.timers.get_mut(id.index()).and_then(Option::as_mut)
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

/// The UI engine shared between the UI task and the sleep manager.
///
/// `const`-constructible so it can live in a `static`.
pub struct UiRuntime {
    state: Mutex<CriticalSectionRawMutex, UiState>,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl UiRuntime {
    /// Empty engine.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(UiState::new()),
            changed: Signal::new(),
        }
    }

    /// Wait for the lock without a deadline (UI task side).
    ///
    /// Call [`notify`](Self::notify) after adding or resuming timers so a
    /// running [`run`](Self::run) loop reschedules.
    pub async fn state(&self) -> MutexGuard<'_, CriticalSectionRawMutex, UiState> {
        self.state.lock().await
    }

    /// Take the lock if it is free right now.
    pub fn try_state(&self) -> Option<MutexGuard<'_, CriticalSectionRawMutex, UiState>> {
        self.state.try_lock().ok()
    }

    /// Wake the [`run`](Self::run) loop to re-read the timer table.
    pub fn notify(&self) {
        self.changed.signal(());
    }

    /// UI loop. Never returns.
    ///
    /// Runs a frame, hands it to `on_frame`, then sleeps until the next
    /// running timer is due or the timer table changes.
    pub async fn run<F: FnMut(&Frame)>(&self, mut on_frame: F) -> ! {
        loop {
            let frame = self.frame(Instant::now().as_millis()).await;
            on_frame(&frame);
            match frame.next_due_ms {
                Some(at) => {
                    select(Timer::at(Instant::from_millis(at)), self.changed.wait()).await;
                }
                None => self.changed.wait().await,
            }
        }
    }

    /// Run one UI frame at `now_ms`.
    ///
    /// Every due timer redraws the watch face, so firing any timer
    /// invalidates the screen. Returns the fired timers and whether a redraw
    /// is pending.
    pub async fn frame(&self, now_ms: u64) -> Frame {
        let mut state = self.state.lock().await;
        let fired = state.due_timers(now_ms);
        if !fired.is_empty() {
            state.invalidate();
        }
        Frame {
            redraw: state.take_dirty(),
            next_due_ms: state.next_due_ms(),
            fired,
        }
    }

    async fn lock_within(&self, timeout: Duration) -> Option<UiGuard<'_>> {
        match with_timeout(timeout, self.state.lock()).await {
            Ok(guard) => Some(UiGuard {
                guard,
                changed: &self.changed,
            }),
            Err(_) => None,
        }
    }
}

impl Default for UiRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`UiRuntime::frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Timers that fired this frame
    pub fired: Vec<TimerId, MAX_UI_TIMERS>,
    /// The screen needs redrawing
    pub redraw: bool,
    /// Earliest time a running timer is due next
    pub next_due_ms: Option<u64>,
}

/// Locked engine as seen by the sleep manager. Dropping it unlocks and wakes
/// the UI loop.
pub struct UiGuard<'a> {
    guard: MutexGuard<'a, CriticalSectionRawMutex, UiState>,
    changed: &'a Signal<CriticalSectionRawMutex, ()>,
}

impl Drop for UiGuard<'_> {
    fn drop(&mut self) {
        self.changed.signal(());
    }
}

impl UiEngine for UiRuntime {
    type Timer = TimerId;
    type Session<'a> = UiGuard<'a>;

    fn lock(&self, timeout: Duration) -> impl Future<Output = Option<UiGuard<'_>>> {
        self.lock_within(timeout)
    }
}

impl<'r> UiEngine for &'r UiRuntime {
    type Timer = TimerId;
    type Session<'a> = UiGuard<'r> where Self: 'a;

    fn lock(&self, timeout: Duration) -> impl Future<Output = Option<UiGuard<'r>>> {
        let runtime: &'r UiRuntime = *self;
        runtime.lock_within(timeout)
    }
}

impl UiSession for UiGuard<'_> {
    type Timer = TimerId;

    fn has_display(&self) -> bool {
        self.guard.display_attached
    }

    fn next_timer(&self, after: Option<TimerId>) -> Option<TimerId> {
        let start = after.map_or(0, |t| t.index().saturating_add(1));
        (start..MAX_UI_TIMERS)
            .find(|&i| self.guard.timers.get(i).is_some_and(Option::is_some))
            .and_then(|i| u8::try_from(i).ok())
            .map(TimerId)
    }

    fn is_timer_paused(&self, timer: TimerId) -> bool {
        self.guard.is_paused(timer).unwrap_or(false)
    }

    fn pause_timer(&mut self, timer: TimerId) {
        if let Some(t) = self.guard.timer_mut(timer) {
            t.paused = true;
        }
    }

    fn resume_timer(&mut self, timer: TimerId) {
        if let Some(t) = self.guard.timer_mut(timer) {
            t.paused = false;
        }
    }

    fn make_ready(&mut self, timer: TimerId) {
        if let Some(t) = self.guard.timer_mut(timer) {
            t.ready = true;
        }
    }

    fn set_invalidation(&mut self, enabled: bool) {
        self.guard.invalidation = enabled;
        if enabled {
            // redraw whatever changed while rendering was off
            self.guard.dirty = true;
        }
    }
}
