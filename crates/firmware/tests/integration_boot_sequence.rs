//! Integration test: boot sequence on a host board.
//!
//! Tests that:
//!   1. The retained sleep kind is consumed once and classifies the boot
//!   2. PMIC init writes every required register before the manager starts
//!   3. The sleep manager arms both board wake lines on the latch halt
//!   4. A refused Standby entry programs the WKUP pins and leaves the next
//!      boot classified as cold
//!
//! Does NOT require physical hardware.
//!
//! Run with: cargo test -p firmware --test integration_boot_sequence

// Integration test file -- intentional test patterns permitted.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]

mod common;

use std::sync::atomic::Ordering;

use common::{host_config, Watch, LAST_WKUPEPR};
use firmware::board::{BUTTON_EXTI, DEEP_SLEEP_AFTER_MS, TOUCH_EXTI};
use firmware::boot::BOOT_SEQUENCE_STEPS;
use firmware::{boot_reason, BootReason};
use platform::{bq25895, RetainedSlot};
use sleep_manager::{poll_once, PollOutcome, SleepError, SleepKind};

#[test]
fn boot_steps_are_numbered_in_order() {
    for (i, step) in BOOT_SEQUENCE_STEPS.iter().enumerate() {
        assert!(step.starts_with(&format!("{}.", i + 1)), "step {i}: {step}");
    }
}

#[test]
fn deep_sleep_wake_is_reported_once() {
    let watch = Watch::new();
    let mut slot = watch.retained.clone();
    slot.store(SleepKind::Deep.to_word());

    assert_eq!(boot_reason(&mut slot), BootReason::DeepSleepWake);
    assert_eq!(boot_reason(&mut slot), BootReason::ColdBoot);
}

#[test]
fn power_on_garbage_is_a_cold_boot() {
    let watch = Watch::new();
    let mut slot = watch.retained.clone();
    slot.store(0xDEAD_BEEF);

    assert_eq!(boot_reason(&mut slot), BootReason::ColdBoot);
    assert_eq!(SleepKind::from_word(slot.load()), Some(SleepKind::None));
}

#[tokio::test]
async fn pmic_is_configured_before_manager_starts() {
    let watch = Watch::new().with_face(1).await;
    let _mgr = watch.manager(host_config());

    for reg in [
        bq25895::REG00_INPUT_SOURCE,
        bq25895::REG02_CHARGE_CURRENT,
        bq25895::REG04_CHARGE_VOLTAGE,
        bq25895::REG01_POWER_ON_CONFIG,
    ] {
        assert!(watch.pmic.wrote_register(reg), "REG{reg:02X} not written");
    }
}

#[tokio::test]
async fn manager_arms_board_wake_lines() {
    let watch = Watch::new().with_face(1).await;
    let mgr = watch.manager(host_config());

    let armed = mgr.hardware().halt.armed_mask();
    assert_eq!(armed, (1 << BUTTON_EXTI) | (1 << TOUCH_EXTI));
    assert!(watch.backlight.is_high());
}

#[tokio::test]
async fn refused_standby_arms_wkup_pins_and_clears_slot() {
    let watch = Watch::new().with_face(1).await;
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(u64::from(DEEP_SLEEP_AFTER_MS));

    assert_eq!(poll_once(&mut mgr).await, PollOutcome::Failed(SleepError::HaltFailed));

    // WKUP1 (PA0, touch) and WKUP4 (PC13, button)
    assert_eq!(LAST_WKUPEPR.load(Ordering::SeqCst) & 0x3F, 0b00_1001);
    assert!(watch.backlight.is_high(), "backlight restored after refusal");
    let mut slot = watch.retained.clone();
    assert_eq!(boot_reason(&mut slot), BootReason::ColdBoot);
}

#[tokio::test]
async fn usb_power_blocks_deep_sleep() {
    let watch = Watch::new().with_face(1).await;
    watch.pmic.plug_usb();
    let mut mgr = watch.manager(host_config());
    watch.clock.advance_ms(u64::from(DEEP_SLEEP_AFTER_MS));

    assert!(!mgr.should_enter_deep_sleep());
    assert_eq!(poll_once(&mut mgr).await, PollOutcome::Idle);
    assert!(watch.backlight.is_high());
}
