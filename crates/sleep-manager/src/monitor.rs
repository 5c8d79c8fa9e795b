//! Monitor task
//!
//! One cooperative loop drives every timeout-based transition. It wakes on a
//! fixed [`Ticker`] and on input events arriving through a bounded channel;
//! input drivers never call into the orchestrator directly.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::{Duration, Ticker};
use platform::{InputEvent, MonotonicClock};

use crate::error::SleepError;
use crate::orchestrator::{SleepHal, SleepManager};

/// Depth of the input event queue.
pub const INPUT_QUEUE_DEPTH: usize = 8;

/// Input events for the monitor task.
pub type InputChannel = Channel<CriticalSectionRawMutex, InputEvent, INPUT_QUEUE_DEPTH>;

/// Receiving end of an [`InputChannel`].
pub type InputReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, InputEvent, INPUT_QUEUE_DEPTH>;

/// Queue an input event without blocking.
///
/// Returns `false` (and logs) if the queue was full and the event dropped.
/// Safe to call from any task.
pub fn notify_input(channel: &InputChannel, event: InputEvent) -> bool {
    match channel.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!("input queue full, event dropped");
            false
        }
    }
}

/// What one monitor poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollOutcome {
    /// Nothing due
    Idle,
    /// Backlight timeout fired
    BacklightOff,
    /// `sleep()` ran and returned (woken, or vetoed)
    SleepCycle,
    /// A previously incomplete wake was finished
    WakeRecovered,
    /// A transition failed; retried on the next poll
    Failed(SleepError),
}

/// Run one iteration of the monitor checks.
///
/// Order: finish an incomplete wake, backlight timeout, deep sleep, light
/// sleep. Light sleep blocks until the device wakes.
pub async fn poll_once<H: SleepHal, C: MonotonicClock>(mgr: &mut SleepManager<'_, H, C>) -> PollOutcome {
    if mgr.is_sleeping() {
        return match mgr.wake().await {
            Ok(()) => PollOutcome::WakeRecovered,
            Err(e) => PollOutcome::Failed(e),
        };
    }

    let mut outcome = PollOutcome::Idle;
    if mgr.should_turn_off_backlight() && mgr.backlight_off() {
        outcome = PollOutcome::BacklightOff;
    }

    #[cfg(feature = "deep-sleep")]
    if mgr.should_enter_deep_sleep() {
        if let Err(e) = mgr.enter_deep_sleep() {
            return PollOutcome::Failed(e);
        }
    }

    if mgr.should_sleep() {
        return match mgr.sleep().await {
            Ok(()) => PollOutcome::SleepCycle,
            Err(e) => PollOutcome::Failed(e),
        };
    }
    outcome
}

/// Monitor loop. Never returns.
///
/// Polls every `poll_interval_ms` and feeds queued input events to
/// [`SleepManager::handle_input`] as they arrive. After a sleep cycle the
/// ticker restarts so missed ticks are not replayed back to back.
pub async fn run<H: SleepHal, C: MonotonicClock>(
    mgr: &mut SleepManager<'_, H, C>,
    inputs: InputReceiver<'_>,
) -> ! {
    let period = Duration::from_millis(u64::from(mgr.config().poll_interval_ms));
    let mut ticker = Ticker::every(period);
    info!("monitor running every {} ms", mgr.config().poll_interval_ms);
    loop {
        match select(ticker.next(), inputs.receive()).await {
            Either::First(()) => match poll_once(mgr).await {
                PollOutcome::Failed(e) => {
                    warn!("monitor: {}, retrying next poll", e.as_str());
                }
                PollOutcome::SleepCycle | PollOutcome::WakeRecovered => {
                    ticker = Ticker::every(period);
                }
                PollOutcome::Idle | PollOutcome::BacklightOff => {}
            },
            Either::Second(event) => mgr.handle_input(event),
        }
    }
}
