//! Integration test: light sleep through the firmware UI runtime and latch.
//!
//! The halt parks on the real [`firmware::WakeLatch`]; a second future plays
//! the input task and asserts a line while the manager is asleep.
//!
//! Run with: cargo test -p firmware --test integration_sleep_cycle

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use common::{host_config, Watch};
use firmware::board::{BUTTON_EXTI, TOUCH_EXTI};
use firmware::{BootReason, LineReporter, LineRole};
use platform::{Button, InputEvent};
use sleep_manager::{poll_once, InputChannel, PollOutcome, SleepError};

const IDLE_MS: u64 = 30_000;

#[tokio::test]
async fn button_press_ends_light_sleep() {
    let watch = Watch::new().with_face(2).await;
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(IDLE_MS);

    let inputs = InputChannel::new();
    let reporter = LineReporter::new(watch.latch, &inputs);
    let press = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Asleep: timers paused, backlight dark.
        assert_eq!(watch.ui.try_state().unwrap().next_due_ms(), None);
        assert!(!watch.backlight.is_high());
        reporter.report(BUTTON_EXTI, LineRole::Button(Button::Boot), true);
    };

    let (outcome, ()) = tokio::join!(poll_once(&mut mgr), press);

    assert_eq!(outcome, PollOutcome::SleepCycle);
    assert!(!mgr.is_sleeping());
    assert!(watch.backlight.is_high());
    assert!(watch.ui.try_state().unwrap().next_due_ms().is_some());
    assert_eq!(inputs.try_receive().ok(), Some(InputEvent::ButtonPress(Button::Boot)));
}

#[tokio::test]
async fn touch_interrupt_ends_light_sleep() {
    let watch = Watch::new().with_face(1).await;
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(IDLE_MS);

    let touch = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        watch.latch.record(TOUCH_EXTI, true);
    };
    let (result, ()) = tokio::join!(mgr.sleep(), touch);

    assert!(result.is_ok());
    assert!(!mgr.is_sleeping());
}

#[tokio::test]
async fn timer_wake_ends_light_sleep_without_input() {
    let watch = Watch::new().with_face(1).await;
    let mut mgr = watch.manager(host_config().with_light_sleep_wake_interval_ms(Some(20)));
    watch.clock.advance_ms(IDLE_MS);

    let slept = tokio::time::timeout(Duration::from_secs(1), mgr.sleep()).await;

    assert!(matches!(slept, Ok(Ok(()))), "timer wake never fired");
    assert!(!mgr.is_sleeping());
}

#[tokio::test]
async fn held_button_vetoes_sleep() {
    let watch = Watch::new().with_face(1).await;
    let mut mgr = watch.manager(host_config());
    watch.latch.record(BUTTON_EXTI, true);
    watch.clock.advance_ms(IDLE_MS);

    assert_eq!(poll_once(&mut mgr).await, PollOutcome::SleepCycle);
    assert!(!mgr.is_sleeping());
    assert!(mgr.get_inactive_ms() < 1_000, "veto counts as activity");
    assert!(watch.ui.try_state().unwrap().next_due_ms().is_some());
}

#[tokio::test]
async fn busy_ui_lock_aborts_sleep() {
    let watch = Watch::new().with_face(1).await;
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(IDLE_MS);

    let held = watch.ui.state().await;
    let result = mgr.sleep().await;
    drop(held);

    assert_eq!(result, Err(SleepError::UiLockTimeout));
    assert!(!mgr.is_sleeping());
    assert!(watch.backlight.is_high());
    assert!(watch.ui.try_state().unwrap().next_due_ms().is_some());
}

#[tokio::test]
async fn missing_panel_aborts_sleep() {
    let watch = Watch::new();
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(IDLE_MS);

    assert_eq!(mgr.sleep().await, Err(SleepError::NoDisplay));
    assert!(!mgr.is_sleeping());
}

#[tokio::test]
async fn usb_keeps_backlight_on() {
    let watch = Watch::new().with_face(1).await;
    watch.pmic.plug_usb();
    let mut mgr = watch.manager(host_config());
    // Past the backlight timeout, short of the sleep timeout.
    watch.clock.advance_ms(15_000);

    assert_eq!(poll_once(&mut mgr).await, PollOutcome::Idle);
    assert!(watch.backlight.is_high());

    watch.pmic.unplug_usb();
    assert_eq!(poll_once(&mut mgr).await, PollOutcome::BacklightOff);
}

#[tokio::test]
async fn reset_after_light_sleep_is_classified() {
    let watch = Watch::new().with_face(1).await;
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(IDLE_MS);

    let press = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        watch.latch.record(BUTTON_EXTI, true);
    };
    let (result, ()) = tokio::join!(mgr.sleep(), press);
    assert!(result.is_ok());

    let mut slot = watch.retained.clone();
    assert_eq!(firmware::boot_reason(&mut slot), BootReason::ResetDuringLightSleep);
}

#[tokio::test]
async fn button_held_during_ui_lock_wait_ends_halt() {
    let watch = Watch::new().with_face(1).await;
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(IDLE_MS);

    // The press lands after the veto check, while sleep() waits for the UI.
    let held = watch.ui.state().await;
    let latch = watch.latch;
    let press = async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        latch.record(BUTTON_EXTI, true);
        drop(held);
    };

    let (slept, ()) = tokio::join!(tokio::time::timeout(Duration::from_secs(1), mgr.sleep()), press);

    assert!(matches!(slept, Ok(Ok(()))), "held button never ended the halt");
    assert!(!mgr.is_sleeping());
    assert!(watch.backlight.is_high());
}
