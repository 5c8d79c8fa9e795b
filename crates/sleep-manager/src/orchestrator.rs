//! Sleep/wake orchestrator
//!
//! The state machine that moves the watch between
//!
//! ```text
//!   Active ──backlight timeout──▶ BacklitOff
//!     │                               │
//!     └──────── sleep() ──────────────┴──▶ LightAsleep ──wake()──▶ Active
//!     │                               │
//!     └──── enter_deep_sleep() ───────┴──▶ DeepAsleep ──reset──▶ (boot)
//! ```
//!
//! `sleep()` blocks the calling task for the whole halt. It is driven by the
//! monitor task; nothing else may call `sleep()`, `wake()` or
//! `enter_deep_sleep()` concurrently.

use embassy_time::Duration;
use platform::{
    AutoConnect, Backlight, HaltController, MonotonicClock, PowerMonitor, RadioLink,
    RetainedSlot, UiEngine, UptimeStore, WakeCause, WakeLine, WakeLines, WakeReport,
    WakeSources,
};

use crate::activity::{elapsed_ms, PowerState};
use crate::backlight::DisplayPower;
use crate::config::{ActivitySource, ClockSet, SleepConfig};
use crate::error::SleepError;
use crate::quiesce::{TimerSnapshot, UiQuiesce};
use crate::retained::{record_sleep_kind, take_sleep_kind, SleepKind};

/// The set of collaborators a board provides.
pub trait SleepHal {
    /// Display backlight
    type Backlight: Backlight;
    /// UI render/timer engine
    type Ui: UiEngine;
    /// Halt primitive
    type Halt: HaltController;
    /// Battery / VBUS monitor
    type Power: PowerMonitor;
    /// Wake line level reads
    type Lines: WakeLines;
    /// Radio suspend/resume hooks
    type Radio: RadioLink;
    /// Word surviving deep sleep
    type Retained: RetainedSlot;
    /// Uptime persistence
    type Uptime: UptimeStore;
}

/// Collaborator instances owned by the [`SleepManager`].
pub struct Hardware<H: SleepHal> {
    /// Display backlight
    pub backlight: H::Backlight,
    /// UI render/timer engine
    pub ui: H::Ui,
    /// Halt primitive
    pub halt: H::Halt,
    /// Battery / VBUS monitor
    pub power: H::Power,
    /// Wake line level reads
    pub lines: H::Lines,
    /// Radio suspend/resume hooks
    pub radio: H::Radio,
    /// Word surviving deep sleep
    pub retained: H::Retained,
    /// Uptime persistence
    pub uptime: H::Uptime,
}

/// Why a sleep request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Veto {
    /// Already inside a sleep cycle
    AlreadySleeping,
    /// External power present and the USB veto is on
    UsbPower,
    /// A wake line is asserted (button held, finger on the panel)
    WakeLineAsserted(WakeLine),
}

impl Veto {
    /// Short name for log lines.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadySleeping => "already sleeping",
            Self::UsbPower => "usb connected",
            Self::WakeLineAsserted(line) => match line.kind {
                platform::WakeLineKind::Button => "button held",
                platform::WakeLineKind::Touch => "touch asserted",
            },
        }
    }
}

/// The power/activity state machine.
pub struct SleepManager<'s, H: SleepHal, C: MonotonicClock> {
    config: SleepConfig,
    state: &'s PowerState<C>,
    hw: Hardware<H>,
    display: DisplayPower,
    quiesce: UiQuiesce<<H::Ui as UiEngine>::Timer>,
    sources: WakeSources,
    radio_suspended: bool,
}

impl<'s, H: SleepHal, C: MonotonicClock> SleepManager<'s, H, C> {
    /// Validate `config`, register wake sources and reset activity.
    ///
    /// Apply stored settings with [`SleepConfig::apply_settings`] first. The
    /// caller spawns [`monitor::run`](crate::monitor::run) afterwards.
    pub fn init(config: SleepConfig, state: &'s PowerState<C>, mut hw: Hardware<H>) -> Result<Self, SleepError> {
        config.validate()?;

        let sources = wake_sources(&config);
        if hw.halt.enable_wake_sources(&sources).is_err() {
            error!("registering {} wake sources failed", sources.lines().len());
            return Err(SleepError::WakeSourceSetup);
        }
        for line in sources.lines() {
            debug!("wake source: gpio {} ({}, active low)", line.gpio, line.kind.as_str());
        }

        state.set_activity_mapping(config.activity);
        state.reset_activity_timer();

        info!(
            "sleep manager ready: backlight {} ms, sleep {} ms, deep sleep {} ms",
            config.backlight_timeout_ms,
            config.sleep_timeout_ms,
            config.deep_sleep_timeout_ms.unwrap_or(0)
        );

        Ok(Self {
            display: DisplayPower::new(config.prevent_backlight_off_on_usb),
            quiesce: UiQuiesce::new(&config),
            config,
            state,
            hw,
            sources,
            radio_suspended: false,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    /// Active configuration.
    pub fn config(&self) -> &SleepConfig {
        &self.config
    }

    /// Shared activity clocks and flags.
    pub fn state(&self) -> &'s PowerState<C> {
        self.state
    }

    /// Collaborators.
    pub fn hardware(&self) -> &Hardware<H> {
        &self.hw
    }

    /// Collaborators, mutably.
    pub fn hardware_mut(&mut self) -> &mut Hardware<H> {
        &mut self.hw
    }

    /// Tear down and return the collaborators.
    pub fn into_hardware(self) -> Hardware<H> {
        self.hw
    }

    /// Registered wake lines.
    pub fn wake_sources(&self) -> &WakeSources {
        &self.sources
    }

    /// Timers paused by the current sleep (empty while awake).
    pub fn paused_timers(&self) -> &TimerSnapshot<<H::Ui as UiEngine>::Timer> {
        self.quiesce.snapshot()
    }

    // ─── Activity ────────────────────────────────────────────────────────────

    /// Explicit activity reset.
    pub fn reset_activity_timer(&self) {
        self.state.reset_activity_timer();
    }

    /// Milliseconds since last activity.
    pub fn get_inactive_ms(&self) -> u32 {
        self.state.get_inactive_ms()
    }

    /// Inside a light-sleep cycle.
    pub fn is_sleeping(&self) -> bool {
        self.state.is_sleeping()
    }

    /// Input event from a button or the touch panel.
    ///
    /// Ignored while sleeping. Otherwise counts as activity for its source,
    /// and a press lights a dark screen.
    pub fn handle_input(&mut self, event: platform::InputEvent) {
        if self.state.is_sleeping() {
            trace!("input ignored while sleeping");
            return;
        }
        let source = if event.is_touch() {
            ActivitySource::Touch
        } else {
            ActivitySource::Button
        };
        self.state.record_activity(source);
        if event.is_press() && self.state.is_backlight_off() {
            self.backlight_on();
        }
    }

    // ─── Backlight ───────────────────────────────────────────────────────────

    /// External power present.
    pub fn is_usb_connected(&mut self) -> bool {
        self.hw.power.is_usb_connected()
    }

    /// Backlight timeout reached and not vetoed.
    pub fn should_turn_off_backlight(&mut self) -> bool {
        self.display
            .should_turn_off(self.state, &mut self.hw.power, self.config.backlight_timeout_ms)
    }

    /// Switch the backlight off (USB veto applies). Returns `true` on a
    /// transition.
    pub fn backlight_off(&mut self) -> bool {
        let switched = self.display.turn_off(self.state, &mut self.hw.backlight, &mut self.hw.power);
        if switched {
            self.log_power("backlight off");
        }
        switched
    }

    /// Switch the backlight on; counts as activity. Returns `true` on a
    /// transition.
    pub fn backlight_on(&mut self) -> bool {
        let switched = self.display.turn_on(self.state, &mut self.hw.backlight);
        if switched {
            self.log_power("backlight on");
        }
        switched
    }

    /// Backlight logically off.
    pub fn is_backlight_off(&self) -> bool {
        self.state.is_backlight_off()
    }

    // ─── Light sleep ─────────────────────────────────────────────────────────

    /// Light-sleep timeout reached, not sleeping, and not vetoed by USB.
    ///
    /// Wake lines are not read here; [`sleep`](Self::sleep) checks them.
    pub fn should_sleep(&mut self) -> bool {
        if self.state.is_sleeping() || self.state.get_inactive_ms() < self.config.sleep_timeout_ms {
            return false;
        }
        !self.usb_vetoes_sleep()
    }

    /// First reason to skip a sleep right now, if any.
    pub fn sleep_veto(&mut self) -> Option<Veto> {
        if self.state.is_sleeping() {
            return Some(Veto::AlreadySleeping);
        }
        if self.usb_vetoes_sleep() {
            return Some(Veto::UsbPower);
        }
        self.hw.lines.first_asserted(&self.sources).map(Veto::WakeLineAsserted)
    }

    /// Enter light sleep and block until woken.
    ///
    /// A veto makes this a no-op that resets the activity timer. A UI lock
    /// failure aborts before anything changes. A halt failure still restores
    /// the UI and backlight before returning [`SleepError::HaltFailed`].
    pub async fn sleep(&mut self) -> Result<(), SleepError> {
        if let Some(veto) = self.sleep_veto() {
            debug!("sleep vetoed: {}", veto.as_str());
            self.state.record_activity(ActivitySource::Veto);
            return Ok(());
        }

        info!("entering light sleep after {} ms idle", self.state.get_inactive_ms());

        if self.hw.uptime.save().is_err() {
            warn!("saving uptime before sleep failed");
        }

        self.quiesce.suspend(&self.hw.ui).await?;

        self.display.force_off(self.state, &mut self.hw.backlight);
        self.state.set_sleeping(true);
        self.log_power("sleep entry");

        self.suspend_radio().await;
        record_sleep_kind(&mut self.hw.retained, SleepKind::Light);

        let timer = self
            .config
            .light_sleep_wake_interval_ms
            .map(|ms| Duration::from_millis(u64::from(ms)));
        let started_us = self.state.activity().now_us();
        let halted = self.hw.halt.halt_until_wake(&self.sources, timer).await;
        let slept_ms = elapsed_ms(self.state.activity().now_us(), started_us);

        match halted {
            Ok(report) => {
                self.log_wake(report, slept_ms);
                self.log_power("sleep exit");
                self.wake().await
            }
            Err(_) => {
                error!("light sleep halt failed after {} ms; restoring", slept_ms);
                if let Err(e) = self.wake().await {
                    warn!("restore after failed halt incomplete: {}", e.as_str());
                }
                Err(SleepError::HaltFailed)
            }
        }
    }

    /// Restore UI, backlight and radio after a light sleep.
    ///
    /// No-op when not sleeping. On a UI lock failure the device stays in the
    /// sleeping state with timers paused; call again to finish.
    pub async fn wake(&mut self) -> Result<(), SleepError> {
        if !self.state.is_sleeping() {
            return Ok(());
        }
        self.log_power("wake start");

        self.quiesce.restore(&self.hw.ui).await?;

        self.state.activity().touch(ClockSet::LIGHT);
        self.state.set_sleeping(false);
        self.display.restore_on(self.state, &mut self.hw.backlight);

        self.resume_radio().await;

        self.log_power("wake complete");
        info!("awake");
        Ok(())
    }

    // ─── Deep sleep ──────────────────────────────────────────────────────────

    /// Deep-sleep timeout reached on the user clock, and no veto applies.
    pub fn should_enter_deep_sleep(&mut self) -> bool {
        if !cfg!(feature = "deep-sleep") {
            return false;
        }
        let Some(threshold) = self.config.deep_sleep_timeout_ms else {
            return false;
        };
        if self.state.is_sleeping() || self.state.user_inactive_ms() < threshold {
            return false;
        }
        if self.usb_vetoes_sleep() {
            return false;
        }
        self.hw.lines.first_asserted(&self.sources).is_none()
    }

    /// Enter deep sleep. Does not return on success.
    ///
    /// Returns `Ok(())` without doing anything if the deep-sleep conditions
    /// are not met. If the hardware refuses the halt, the backlight is
    /// restored, the retained slot cleared, and
    /// [`SleepError::HaltFailed`] returned.
    #[cfg(feature = "deep-sleep")]
    pub fn enter_deep_sleep(&mut self) -> Result<(), SleepError> {
        if !self.should_enter_deep_sleep() {
            debug!("deep sleep conditions not met");
            return Ok(());
        }
        info!(
            "entering deep sleep after {} ms without user activity",
            self.state.user_inactive_ms()
        );

        if self.hw.uptime.save().is_err() {
            warn!("saving uptime before deep sleep failed");
        }
        self.display.force_off(self.state, &mut self.hw.backlight);
        self.log_power("deep sleep entry");
        record_sleep_kind(&mut self.hw.retained, SleepKind::Deep);

        match self.hw.halt.enter_deep_sleep(&self.sources) {
            Ok(never) => match never {},
            Err(_) => {
                error!("deep sleep entry refused");
                record_sleep_kind(&mut self.hw.retained, SleepKind::None);
                self.display.restore_on(self.state, &mut self.hw.backlight);
                Err(SleepError::HaltFailed)
            }
        }
    }

    /// Read and clear the sleep kind left in the retained slot.
    pub fn take_last_sleep_kind(&mut self) -> Option<SleepKind> {
        take_sleep_kind(&mut self.hw.retained)
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn usb_vetoes_sleep(&mut self) -> bool {
        self.config.prevent_sleep_on_usb && self.hw.power.is_usb_connected()
    }

    async fn suspend_radio(&mut self) {
        if !self.config.suspend_radio {
            return;
        }
        match self.hw.radio.deinit().await {
            Ok(()) => {
                self.radio_suspended = true;
                debug!("radio suspended");
            }
            Err(_) => warn!("radio deinit failed; leaving it up"),
        }
    }

    async fn resume_radio(&mut self) {
        if !core::mem::take(&mut self.radio_suspended) {
            return;
        }
        if self.hw.radio.init().await.is_err() {
            warn!("radio init after wake failed");
            return;
        }
        if !self.config.radio_auto_reconnect {
            debug!("radio resumed");
            return;
        }
        match self.hw.radio.auto_reconnect().await {
            Ok(AutoConnect::Connecting) => debug!("radio resumed, reconnecting"),
            Ok(AutoConnect::NoSavedNetwork) => debug!("radio resumed, no saved network"),
            Err(_) => warn!("radio auto-reconnect failed"),
        }
    }

    fn log_wake(&self, report: WakeReport, slept_ms: u32) {
        info!("woke after {} ms, cause: {}", slept_ms, report.cause.as_str());
        if report.cause != WakeCause::Gpio {
            return;
        }
        let mut named = 0u8;
        for line in self.sources.lines().iter().filter(|l| report.woke_by(l.gpio)) {
            info!("wake pin: gpio {} ({})", line.gpio, line.kind.as_str());
            named = named.saturating_add(1);
        }
        if named == 0 {
            info!("wake pin: unknown pin");
        }
    }

    fn log_power(&mut self, phase: &'static str) {
        if !self.config.power_logs {
            return;
        }
        let Some(mv) = self.hw.power.battery_voltage() else {
            warn!("{}: battery read failed", phase);
            return;
        };
        let pct = self.hw.power.battery_percentage().unwrap_or(0);
        let charging = self.hw.power.is_charging();
        let usb = self.hw.power.is_usb_connected();
        info!(
            "{}: battery {} mV ({}%), charging {}, usb {}",
            phase, mv, pct, charging, usb
        );
    }
}

/// Wake lines configured in `config`, button first.
pub fn wake_sources(config: &SleepConfig) -> WakeSources {
    let mut sources = WakeSources::new();
    let lines = [
        config.button_wake_gpio.map(WakeLine::button),
        config.touch_wake_gpio.map(WakeLine::touch),
    ];
    for line in lines.into_iter().flatten() {
        if sources.push(line).is_err() {
            warn!("wake source list full, gpio {} not registered", line.gpio);
        }
    }
    sources
}
