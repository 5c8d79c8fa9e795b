//! Sleep manager configuration
//!
//! All timeouts are in milliseconds. [`SleepConfig::default`] matches the
//! watch's factory settings; [`SleepConfig::apply_settings`] overlays the
//! values the user picked on the settings screen.

use platform::settings::keys;
use platform::SettingsStore;

use crate::error::SleepError;

/// Bounded retry policy for the UI lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockPolicy {
    /// Per-attempt lock timeout
    pub timeout_ms: u32,
    /// Extra attempts after the first
    pub retries: u8,
    /// Pause between attempts
    pub backoff_ms: u32,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 200,
            retries: 5,
            backoff_ms: 50,
        }
    }
}

impl LockPolicy {
    /// Total attempts (`retries + 1`)
    pub const fn attempts(&self) -> u16 {
        (self.retries as u16).saturating_add(1)
    }
}

/// Which inactivity clocks an event resets.
///
/// `light` feeds the backlight and light-sleep timeouts, `user` feeds the
/// deep-sleep timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSet {
    /// Reset the light-sleep clock
    pub light: bool,
    /// Reset the user (deep-sleep) clock
    pub user: bool,
}

impl ClockSet {
    /// Both clocks
    pub const BOTH: Self = Self {
        light: true,
        user: true,
    };
    /// Light-sleep clock only
    pub const LIGHT: Self = Self {
        light: true,
        user: false,
    };
    /// User clock only
    pub const USER: Self = Self {
        light: false,
        user: true,
    };
    /// Neither clock
    pub const NONE: Self = Self {
        light: false,
        user: false,
    };
}

/// Origin of an activity reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivitySource {
    /// Touch panel event
    Touch,
    /// Button event
    Button,
    /// Backlight switched on by [`SleepManager::backlight_on`](crate::SleepManager::backlight_on)
    BacklightOn,
    /// [`reset_activity_timer`](crate::PowerState::reset_activity_timer) call
    Explicit,
    /// Sleep was vetoed (USB, held wake line, already sleeping)
    Veto,
}

impl ActivitySource {
    /// Short name for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Touch => "touch",
            Self::Button => "button",
            Self::BacklightOn => "backlight on",
            Self::Explicit => "explicit",
            Self::Veto => "veto",
        }
    }
}

/// Per-source choice of which clocks to reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActivityMapping {
    /// Touch events
    pub touch: ClockSet,
    /// Button events
    pub button: ClockSet,
    /// Backlight turned on
    pub backlight_on: ClockSet,
    /// Explicit resets
    pub explicit: ClockSet,
    /// Sleep vetoes
    pub veto: ClockSet,
}

impl Default for ActivityMapping {
    fn default() -> Self {
        Self {
            touch: ClockSet::BOTH,
            button: ClockSet::BOTH,
            backlight_on: ClockSet::BOTH,
            explicit: ClockSet::BOTH,
            veto: ClockSet::BOTH,
        }
    }
}

impl ActivityMapping {
    /// Clocks reset by `source`.
    pub const fn clocks_for(&self, source: ActivitySource) -> ClockSet {
        match source {
            ActivitySource::Touch => self.touch,
            ActivitySource::Button => self.button,
            ActivitySource::BacklightOn => self.backlight_on,
            ActivitySource::Explicit => self.explicit,
            ActivitySource::Veto => self.veto,
        }
    }
}

/// Sleep manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepConfig {
    /// Inactivity before the backlight goes off
    pub backlight_timeout_ms: u32,
    /// Inactivity before light sleep
    pub sleep_timeout_ms: u32,
    /// User inactivity before deep sleep (`None` = never)
    pub deep_sleep_timeout_ms: Option<u32>,
    /// Timer wake during light sleep (`None` = GPIO wake only)
    pub light_sleep_wake_interval_ms: Option<u32>,
    /// Button wake line GPIO (`None` = not a wake source)
    pub button_wake_gpio: Option<u8>,
    /// Touch interrupt wake line GPIO (`None` = touch does not wake)
    pub touch_wake_gpio: Option<u8>,
    /// Veto sleep while USB power is present
    pub prevent_sleep_on_usb: bool,
    /// Veto backlight-off while USB power is present
    pub prevent_backlight_off_on_usb: bool,
    /// Shut the radio down around light sleep
    pub suspend_radio: bool,
    /// Reconnect to the saved network after the radio comes back
    pub radio_auto_reconnect: bool,
    /// Pause UI timers during light sleep
    pub pause_ui_timers: bool,
    /// Disable screen invalidation during light sleep
    pub toggle_rendering: bool,
    /// UI lock retry policy
    pub ui_lock: LockPolicy,
    /// Monitor task poll period
    pub poll_interval_ms: u32,
    /// Which clocks each activity source resets
    pub activity: ActivityMapping,
    /// Log battery state around sleep and backlight transitions
    pub power_logs: bool,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            backlight_timeout_ms: 10_000,
            sleep_timeout_ms: 30_000,
            deep_sleep_timeout_ms: None,
            light_sleep_wake_interval_ms: None,
            button_wake_gpio: Some(platform::config::BUTTON_WAKE_GPIO),
            touch_wake_gpio: Some(platform::config::TOUCH_WAKE_GPIO),
            prevent_sleep_on_usb: true,
            prevent_backlight_off_on_usb: true,
            suspend_radio: false,
            radio_auto_reconnect: true,
            pause_ui_timers: true,
            toggle_rendering: false,
            ui_lock: LockPolicy::default(),
            poll_interval_ms: 500,
            activity: ActivityMapping::default(),
            power_logs: false,
        }
    }
}

impl SleepConfig {
    /// Set backlight timeout
    #[must_use]
    pub fn with_backlight_timeout_ms(mut self, ms: u32) -> Self {
        self.backlight_timeout_ms = ms;
        self
    }

    /// Set light-sleep timeout
    #[must_use]
    pub fn with_sleep_timeout_ms(mut self, ms: u32) -> Self {
        self.sleep_timeout_ms = ms;
        self
    }

    /// Set deep-sleep timeout
    #[must_use]
    pub fn with_deep_sleep_timeout_ms(mut self, ms: Option<u32>) -> Self {
        self.deep_sleep_timeout_ms = ms;
        self
    }

    /// Set light-sleep timer wake
    #[must_use]
    pub fn with_light_sleep_wake_interval_ms(mut self, ms: Option<u32>) -> Self {
        self.light_sleep_wake_interval_ms = ms;
        self
    }

    /// Set both USB vetoes
    #[must_use]
    pub fn with_usb_vetoes(mut self, sleep: bool, backlight_off: bool) -> Self {
        self.prevent_sleep_on_usb = sleep;
        self.prevent_backlight_off_on_usb = backlight_off;
        self
    }

    /// Enable radio suspend
    #[must_use]
    pub fn with_radio_suspend(mut self, enabled: bool) -> Self {
        self.suspend_radio = enabled;
        self
    }

    /// Enable render invalidation toggling
    #[must_use]
    pub fn with_rendering_toggle(mut self, enabled: bool) -> Self {
        self.toggle_rendering = enabled;
        self
    }

    /// Set UI lock policy
    #[must_use]
    pub fn with_ui_lock(mut self, policy: LockPolicy) -> Self {
        self.ui_lock = policy;
        self
    }

    /// Set activity mapping
    #[must_use]
    pub fn with_activity(mut self, mapping: ActivityMapping) -> Self {
        self.activity = mapping;
        self
    }

    /// Set monitor poll period
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Reject zero timeouts and a zero poll period.
    pub fn validate(&self) -> Result<(), SleepError> {
        let zero_timeout = self.backlight_timeout_ms == 0
            || self.sleep_timeout_ms == 0
            || self.deep_sleep_timeout_ms == Some(0)
            || self.light_sleep_wake_interval_ms == Some(0)
            || self.ui_lock.timeout_ms == 0;
        if zero_timeout || self.poll_interval_ms == 0 {
            return Err(SleepError::InvalidConfig);
        }
        Ok(())
    }

    /// Overlay timeouts stored by the settings screen.
    ///
    /// Values are stored in seconds. Missing keys keep the current value, as
    /// do read errors (logged). A stored zero disables deep sleep; a zero
    /// backlight or sleep timeout is ignored.
    pub fn apply_settings<S: SettingsStore>(&mut self, store: &mut S) {
        if let Some(s) = read_seconds(store, keys::BACKLIGHT_TIMEOUT_S) {
            if s == 0 {
                warn!("settings: ignoring zero {}", keys::BACKLIGHT_TIMEOUT_S);
            } else {
                self.backlight_timeout_ms = seconds_to_ms(s);
            }
        }
        if let Some(s) = read_seconds(store, keys::SLEEP_TIME_S) {
            if s == 0 {
                warn!("settings: ignoring zero {}", keys::SLEEP_TIME_S);
            } else {
                self.sleep_timeout_ms = seconds_to_ms(s);
            }
        }
        if let Some(s) = read_seconds(store, keys::DEEP_SLEEP_S) {
            self.deep_sleep_timeout_ms = (s != 0).then(|| seconds_to_ms(s));
        }
        debug!(
            "settings: backlight {} ms, sleep {} ms, deep sleep {} ms",
            self.backlight_timeout_ms,
            self.sleep_timeout_ms,
            self.deep_sleep_timeout_ms.unwrap_or(0)
        );
    }
}

fn read_seconds<S: SettingsStore>(store: &mut S, key: &'static str) -> Option<u32> {
    match store.get_u32(key) {
        Ok(value) => value,
        Err(_) => {
            warn!("settings: reading {} failed, keeping default", key);
            None
        }
    }
}

fn seconds_to_ms(s: u32) -> u32 {
    s.saturating_mul(1000)
}
