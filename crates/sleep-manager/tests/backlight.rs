//! Backlight timeout and input handling through the manager.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{test_config, Rig};
use platform::{Button, InputEvent};
use sleep_manager::{ActivityMapping, ClockSet};

#[tokio::test]
async fn backlight_times_out_on_battery() {
    let rig = Rig::new();
    let mut mgr = rig.manager(test_config(), 0);

    rig.clock.advance_ms(9_999);
    assert!(!mgr.should_turn_off_backlight());

    rig.clock.advance_ms(1);
    assert!(mgr.should_turn_off_backlight());
    assert!(mgr.backlight_off());
    assert!(mgr.is_backlight_off());
    assert!(!mgr.hardware().backlight.is_on());

    assert!(!mgr.should_turn_off_backlight(), "already off");
    assert!(!mgr.backlight_off());
    assert_eq!(mgr.hardware().backlight.off_calls(), 1);
}

#[tokio::test]
async fn usb_keeps_backlight_on() {
    let rig = Rig::new();
    let mut mgr = rig.manager(test_config(), 0);
    mgr.hardware_mut().power.usb = true;
    rig.clock.advance_ms(60_000);

    assert!(!mgr.should_turn_off_backlight());
    assert!(!mgr.backlight_off());
    assert!(mgr.hardware().backlight.is_on());
}

#[tokio::test]
async fn backlight_on_counts_as_activity() {
    let rig = Rig::new();
    let mut mgr = rig.manager(test_config(), 0);
    rig.clock.advance_ms(15_000);
    mgr.backlight_off();

    assert!(mgr.backlight_on());

    assert_eq!(mgr.get_inactive_ms(), 0);
    assert!(!mgr.backlight_on(), "already on");
    assert_eq!(mgr.hardware().backlight.on_calls(), 1);
}

#[tokio::test]
async fn backlight_on_can_be_excluded_from_user_activity() {
    let rig = Rig::new();
    let mapping = ActivityMapping {
        backlight_on: ClockSet::LIGHT,
        ..ActivityMapping::default()
    };
    let mut mgr = rig.manager(test_config().with_activity(mapping), 0);
    rig.clock.advance_ms(15_000);
    mgr.backlight_off();
    mgr.backlight_on();

    assert_eq!(mgr.get_inactive_ms(), 0);
    assert_eq!(rig.state.user_inactive_ms(), 15_000);
}

#[tokio::test]
async fn press_lights_a_dark_screen() {
    let rig = Rig::new();
    let mut mgr = rig.manager(test_config(), 0);
    rig.clock.advance_ms(12_000);
    mgr.backlight_off();

    mgr.handle_input(InputEvent::TouchDown { x: 10, y: 20 });

    assert!(!mgr.is_backlight_off());
    assert_eq!(mgr.get_inactive_ms(), 0);
}

#[tokio::test]
async fn release_resets_activity_without_lighting() {
    let rig = Rig::new();
    let mut mgr = rig.manager(test_config(), 0);
    rig.clock.advance_ms(12_000);
    mgr.backlight_off();

    mgr.handle_input(InputEvent::ButtonRelease(Button::Boot));

    assert!(mgr.is_backlight_off());
    assert_eq!(mgr.get_inactive_ms(), 0);
}

#[tokio::test]
async fn touch_can_be_excluded_from_user_activity() {
    let rig = Rig::new();
    let mapping = ActivityMapping {
        touch: ClockSet::LIGHT,
        ..ActivityMapping::default()
    };
    let mut mgr = rig.manager(test_config().with_activity(mapping), 0);
    rig.clock.advance_ms(5_000);

    mgr.handle_input(InputEvent::TouchUp);

    assert_eq!(mgr.get_inactive_ms(), 0);
    assert_eq!(rig.state.user_inactive_ms(), 5_000);
}
