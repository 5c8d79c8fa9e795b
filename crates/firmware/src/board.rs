//! Wrist-watch board wiring.
//!
//! # Pin assignments
//!
//! | Signal          | MCU pin   | Notes                                  |
//! |-----------------|-----------|----------------------------------------|
//! | Side button     | PC13      | EXTI13, WKUP4, active-low              |
//! | Touch INT       | PA0       | EXTI0, WKUP1, active-low               |
//! | Backlight EN    | PE10      | Load switch, active-high               |
//! | PMIC SCL / SDA  | PF1 / PF0 | I2C2 @ 100 kHz, BQ25895 at 0x6A        |
//!
//! The platform defaults (GPIO 9 and 15) describe the reference wiring; this
//! board moves both lines onto WKUP pins so they can leave Standby.

use sleep_manager::SleepConfig;

/// EXTI line of the side button (PC13).
pub const BUTTON_EXTI: u8 = 13;

/// EXTI line of the touch controller interrupt (PA0).
pub const TOUCH_EXTI: u8 = 0;

/// Deep sleep after ten minutes without user input.
pub const DEEP_SLEEP_AFTER_MS: u32 = 600_000;

/// Light sleeps end on this timer so the monitor can re-check the deep-sleep
/// deadline. Without it only a wake line ends a light sleep, and the user
/// clock never gets a chance to reach [`DEEP_SLEEP_AFTER_MS`].
pub const LIGHT_SLEEP_CHECK_MS: u32 = 60_000;

/// Sleep manager configuration for this board, before stored settings are
/// applied.
pub fn board_config() -> SleepConfig {
    let mut config = SleepConfig::default()
        .with_deep_sleep_timeout_ms(Some(DEEP_SLEEP_AFTER_MS))
        .with_light_sleep_wake_interval_ms(Some(LIGHT_SLEEP_CHECK_MS));
    config.button_wake_gpio = Some(BUTTON_EXTI);
    config.touch_wake_gpio = Some(TOUCH_EXTI);
    config
}

#[cfg(feature = "hardware")]
pub mod hardware {
    //! Concrete collaborator types. Only compiled for the target.

    use embassy_stm32::gpio::{AnyPin, Output};
    use embassy_stm32::i2c::I2c;
    use embassy_stm32::peripherals::I2C2;
    use platform::bq25895::Bq25895Monitor;
    use platform::{EmbassyClock, NoRadio, NoUptime};
    use sleep_manager::{SleepHal, SleepManager};

    use crate::backlight::PinBacklight;
    use crate::boot::hardware::BackupRegister;
    use crate::ui::UiRuntime;
    use crate::wake::{LatchHalt, WakeLatch};

    /// The watch as seen by the sleep manager.
    pub struct WatchBoard;

    impl SleepHal for WatchBoard {
        type Backlight = PinBacklight<Output<'static, AnyPin>>;
        type Ui = &'static UiRuntime;
        type Halt = LatchHalt<'static>;
        type Power = Bq25895Monitor<I2c<'static, I2C2>>;
        type Lines = &'static WakeLatch;
        type Radio = NoRadio;
        type Retained = BackupRegister;
        type Uptime = NoUptime;
    }

    /// Sleep manager owned by the monitor task.
    pub type WatchManager = SleepManager<'static, WatchBoard, EmbassyClock>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wake::{standby_registers, WKUP_EXTI_LINES};
    use sleep_manager::wake_sources;

    #[test]
    fn wake_lines_are_wkup_pins() {
        assert!(WKUP_EXTI_LINES.contains(&BUTTON_EXTI));
        assert!(WKUP_EXTI_LINES.contains(&TOUCH_EXTI));
    }

    #[test]
    fn board_config_arms_both_lines_for_standby() {
        let config = board_config();
        assert!(config.validate().is_ok());

        let sources = wake_sources(&config);
        assert_eq!(sources.lines().len(), 2);
        let mask = u32::try_from(sources.gpio_mask()).unwrap_or(0);
        assert!(standby_registers(mask).is_ok());
    }

    #[test]
    fn deep_sleep_enabled_on_this_board() {
        assert_eq!(board_config().deep_sleep_timeout_ms, Some(DEEP_SLEEP_AFTER_MS));
    }

    #[test]
    fn light_sleep_wakes_in_time_to_reach_deep_sleep() {
        let config = board_config();
        let interval = config.light_sleep_wake_interval_ms.unwrap_or(u32::MAX);
        assert_eq!(interval, LIGHT_SLEEP_CHECK_MS);
        assert!(interval < DEEP_SLEEP_AFTER_MS);
    }
}
