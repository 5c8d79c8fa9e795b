//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests. Mocks count calls so tests can
//! assert on ordering and idempotence without real hardware.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects)] // call counters

use core::cell::{Cell, RefCell, RefMut};
use core::convert::Infallible;
use std::collections::HashMap;
use std::string::String;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::vec::Vec;

use embassy_time::Duration;

use crate::*;

/// Manually advanced monotonic clock.
///
/// Clones share the same time, so a test can hold one handle while the code
/// under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_us: Arc<AtomicU64>,
}

impl MockClock {
    /// Clock at t = 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock starting at `ms` milliseconds
    pub fn at_ms(ms: u64) -> Self {
        let clock = Self::new();
        clock.set_us(ms.saturating_mul(1000));
        clock
    }

    /// Move time forward by `ms` milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.now_us.fetch_add(ms.saturating_mul(1000), Ordering::SeqCst);
    }

    /// Set absolute time
    pub fn set_us(&self, us: u64) {
        self.now_us.store(us, Ordering::SeqCst);
    }
}

impl MonotonicClock for MockClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }
}

/// Mock backlight
#[derive(Debug, Default)]
pub struct MockBacklight {
    is_on: bool,
    on_calls: usize,
    off_calls: usize,
}

impl MockBacklight {
    /// Backlight that starts lit
    pub fn new() -> Self {
        Self {
            is_on: true,
            ..Self::default()
        }
    }

    /// Current hardware state
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Number of `on()` calls
    pub fn on_calls(&self) -> usize {
        self.on_calls
    }

    /// Number of `off()` calls
    pub fn off_calls(&self) -> usize {
        self.off_calls
    }
}

impl Backlight for MockBacklight {
    fn on(&mut self) {
        self.is_on = true;
        self.on_calls += 1;
    }

    fn off(&mut self) {
        self.is_on = false;
        self.off_calls += 1;
    }
}

/// One timer in [`MockUi`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockTimer {
    /// Paused flag
    pub paused: bool,
    /// Times `make_ready` was called
    pub ready_count: usize,
    /// Times `pause_timer` was called
    pub pause_count: usize,
    /// Times `resume_timer` was called
    pub resume_count: usize,
}

/// Mutable state behind the [`MockUi`] lock.
#[derive(Debug, Clone)]
pub struct MockUiState {
    /// Registered timers; handle = index
    pub timers: Vec<MockTimer>,
    /// Screen invalidation enabled
    pub invalidation: bool,
    /// Display registered with the engine
    pub display_present: bool,
    /// Times `set_invalidation` was called
    pub invalidation_calls: usize,
}

/// Mock UI engine with a lock that can be made to fail.
#[derive(Debug)]
pub struct MockUi {
    state: RefCell<MockUiState>,
    lock_failures: Cell<usize>,
    locks_before_failure: Cell<Option<usize>>,
    lock_attempts: Cell<usize>,
}

impl MockUi {
    /// Engine with `running` unpaused timers and a display attached
    pub fn with_timers(running: usize) -> Self {
        Self {
            state: RefCell::new(MockUiState {
                timers: std::vec![MockTimer::default(); running],
                invalidation: true,
                display_present: true,
                invalidation_calls: 0,
            }),
            lock_failures: Cell::new(0),
            locks_before_failure: Cell::new(None),
            lock_attempts: Cell::new(0),
        }
    }

    /// Add a timer that is already paused; returns its handle
    pub fn add_paused_timer(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state.timers.push(MockTimer {
            paused: true,
            ..MockTimer::default()
        });
        state.timers.len().saturating_sub(1)
    }

    /// Make the next `n` lock attempts fail (`usize::MAX` = always)
    pub fn fail_next_locks(&self, n: usize) {
        self.lock_failures.set(n);
    }

    /// Let the next `n` lock attempts succeed, then fail every one after
    pub fn fail_locks_after(&self, n: usize) {
        self.locks_before_failure.set(Some(n));
    }

    /// Clear every injected lock failure
    pub fn allow_all_locks(&self) {
        self.lock_failures.set(0);
        self.locks_before_failure.set(None);
    }

    /// Detach the display
    pub fn remove_display(&self) {
        self.state.borrow_mut().display_present = false;
    }

    /// Total lock attempts so far
    pub fn lock_attempts(&self) -> usize {
        self.lock_attempts.get()
    }

    /// Copy of the engine state
    pub fn snapshot(&self) -> MockUiState {
        self.state.borrow().clone()
    }

    /// Paused flags of all timers, in handle order
    pub fn paused_flags(&self) -> Vec<bool> {
        self.state.borrow().timers.iter().map(|t| t.paused).collect()
    }
}

impl Default for MockUi {
    fn default() -> Self {
        Self::with_timers(0)
    }
}

/// Locked view of [`MockUi`].
pub struct MockUiSession<'a> {
    state: RefMut<'a, MockUiState>,
}

impl UiEngine for MockUi {
    type Timer = usize;
    type Session<'a> = MockUiSession<'a>;

    async fn lock(&self, _timeout: Duration) -> Option<Self::Session<'_>> {
        self.lock_attempts.set(self.lock_attempts.get().saturating_add(1));
        let failures = self.lock_failures.get();
        if failures > 0 {
            if failures != usize::MAX {
                self.lock_failures.set(failures.saturating_sub(1));
            }
            return None;
        }
        match self.locks_before_failure.get() {
            Some(0) => return None,
            Some(n) => self.locks_before_failure.set(Some(n - 1)),
            None => {}
        }
        self.state
            .try_borrow_mut()
            .ok()
            .map(|state| MockUiSession { state })
    }
}

impl UiSession for MockUiSession<'_> {
    type Timer = usize;

    fn has_display(&self) -> bool {
        self.state.display_present
    }

    fn next_timer(&self, after: Option<usize>) -> Option<usize> {
        let next = after.map_or(0, |t| t + 1);
        (next < self.state.timers.len()).then_some(next)
    }

    fn is_timer_paused(&self, timer: usize) -> bool {
        self.state.timers.get(timer).is_some_and(|t| t.paused)
    }

    fn pause_timer(&mut self, timer: usize) {
        if let Some(t) = self.state.timers.get_mut(timer) {
            t.paused = true;
            t.pause_count += 1;
        }
    }

    fn resume_timer(&mut self, timer: usize) {
        if let Some(t) = self.state.timers.get_mut(timer) {
            t.paused = false;
            t.resume_count += 1;
        }
    }

    fn make_ready(&mut self, timer: usize) {
        if let Some(t) = self.state.timers.get_mut(timer) {
            t.ready_count += 1;
        }
    }

    fn set_invalidation(&mut self, enabled: bool) {
        self.state.invalidation = enabled;
        self.state.invalidation_calls += 1;
    }
}

/// Errors from [`MockHalt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockHaltError {
    /// Wake-source registration rejected
    Setup,
    /// Low-power entry refused
    Refused,
}

/// Scripted halt primitive.
///
/// Light sleep returns the configured [`WakeReport`] immediately, optionally
/// moving a [`MockClock`] forward to simulate time spent halted. Deep sleep
/// cannot reset the test process, so it records what the retained slot held
/// at the moment of the halt and then reports [`MockHaltError::Refused`].
#[derive(Debug)]
pub struct MockHalt {
    /// Report returned by the next light-sleep halt
    pub report: WakeReport,
    /// Fail the next light-sleep halt
    pub fail_halt: bool,
    /// Fail wake-source registration
    pub fail_enable: bool,
    clock: Option<(MockClock, u64)>,
    retained: Option<MockRetained>,
    registered: Option<WakeSources>,
    halts: usize,
    deep_sleeps: usize,
    last_timer: Option<Duration>,
    retained_at_halt: Option<u32>,
    retained_at_deep_sleep: Option<u32>,
}

impl MockHalt {
    /// Halt that reports a GPIO wake with an empty mask
    pub fn new() -> Self {
        Self {
            report: WakeReport::gpio(0),
            fail_halt: false,
            fail_enable: false,
            clock: None,
            retained: None,
            registered: None,
            halts: 0,
            deep_sleeps: 0,
            last_timer: None,
            retained_at_halt: None,
            retained_at_deep_sleep: None,
        }
    }

    /// Advance `clock` by `ms` during every light-sleep halt
    pub fn sleeping_for(mut self, clock: MockClock, ms: u64) -> Self {
        self.clock = Some((clock, ms));
        self
    }

    /// Record the value of `slot` whenever a halt starts
    pub fn watching(mut self, slot: MockRetained) -> Self {
        self.retained = Some(slot);
        self
    }

    /// Report returned by light-sleep halts
    pub fn reporting(mut self, report: WakeReport) -> Self {
        self.report = report;
        self
    }

    /// Sources passed to `enable_wake_sources`
    pub fn registered(&self) -> Option<&WakeSources> {
        self.registered.as_ref()
    }

    /// Number of light-sleep halts
    pub fn halts(&self) -> usize {
        self.halts
    }

    /// Number of deep-sleep attempts
    pub fn deep_sleeps(&self) -> usize {
        self.deep_sleeps
    }

    /// Timer argument of the last light-sleep halt
    pub fn last_timer(&self) -> Option<Duration> {
        self.last_timer
    }

    /// Retained word observed when the last light-sleep halt began
    pub fn retained_at_halt(&self) -> Option<u32> {
        self.retained_at_halt
    }

    /// Retained word observed when the last deep-sleep halt began
    pub fn retained_at_deep_sleep(&self) -> Option<u32> {
        self.retained_at_deep_sleep
    }
}

impl Default for MockHalt {
    fn default() -> Self {
        Self::new()
    }
}

impl HaltController for MockHalt {
    type Error = MockHaltError;

    fn enable_wake_sources(&mut self, sources: &WakeSources) -> Result<(), Self::Error> {
        if self.fail_enable {
            return Err(MockHaltError::Setup);
        }
        self.registered = Some(sources.clone());
        Ok(())
    }

    async fn halt_until_wake(
        &mut self,
        _sources: &WakeSources,
        timer: Option<Duration>,
    ) -> Result<WakeReport, Self::Error> {
        self.halts += 1;
        self.last_timer = timer;
        self.retained_at_halt = self.retained.as_ref().map(RetainedSlot::load);
        if self.fail_halt {
            return Err(MockHaltError::Refused);
        }
        if let Some((clock, ms)) = &self.clock {
            clock.advance_ms(*ms);
        }
        Ok(self.report)
    }

    fn enter_deep_sleep(&mut self, _sources: &WakeSources) -> Result<Infallible, Self::Error> {
        self.deep_sleeps += 1;
        self.retained_at_deep_sleep = self.retained.as_ref().map(RetainedSlot::load);
        Err(MockHaltError::Refused)
    }
}

/// Mock battery / VBUS monitor
#[derive(Debug, Default)]
pub struct MockPowerMonitor {
    /// External power present
    pub usb: bool,
    /// Charging flag
    pub charging: bool,
    /// Battery millivolts (`None` = read failure)
    pub millivolts: Option<u16>,
    usb_reads: Cell<usize>,
}

impl MockPowerMonitor {
    /// Monitor on battery at 3.9 V
    pub fn on_battery() -> Self {
        Self {
            millivolts: Some(3900),
            ..Self::default()
        }
    }

    /// Monitor with USB attached and charging
    pub fn on_usb() -> Self {
        Self {
            usb: true,
            charging: true,
            millivolts: Some(4100),
            usb_reads: Cell::new(0),
        }
    }

    /// Number of `is_usb_connected` calls
    pub fn usb_reads(&self) -> usize {
        self.usb_reads.get()
    }
}

impl PowerMonitor for MockPowerMonitor {
    fn battery_voltage(&mut self) -> Option<u16> {
        self.millivolts
    }

    fn battery_percentage(&mut self) -> Option<u8> {
        self.millivolts.map(crate::power::lipo_percentage)
    }

    fn is_charging(&mut self) -> bool {
        self.charging
    }

    fn is_usb_connected(&mut self) -> bool {
        self.usb_reads.set(self.usb_reads.get().saturating_add(1));
        self.usb
    }
}

/// Wake lines held at their asserted level by the test
#[derive(Debug, Default)]
pub struct MockWakeLines {
    held: Vec<u8>,
}

impl MockWakeLines {
    /// All lines idle
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert the line on `gpio`
    pub fn hold(&mut self, gpio: u8) {
        if !self.held.contains(&gpio) {
            self.held.push(gpio);
        }
    }

    /// De-assert the line on `gpio`
    pub fn release(&mut self, gpio: u8) {
        self.held.retain(|g| *g != gpio);
    }
}

impl WakeLines for MockWakeLines {
    fn is_asserted(&self, line: &WakeLine) -> bool {
        self.held.contains(&line.gpio)
    }
}

/// Errors from [`MockRadio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockRadioError;

/// Mock radio with call counters
#[derive(Debug)]
pub struct MockRadio {
    /// Fail `deinit`
    pub fail_deinit: bool,
    /// Fail `init`
    pub fail_init: bool,
    /// Outcome of `auto_reconnect`
    pub reconnect: Result<AutoConnect, MockRadioError>,
    /// Radio currently up
    pub up: bool,
    deinits: usize,
    inits: usize,
    reconnects: usize,
}

impl MockRadio {
    /// Radio that is up and has a saved network
    pub fn new() -> Self {
        Self {
            fail_deinit: false,
            fail_init: false,
            reconnect: Ok(AutoConnect::Connecting),
            up: true,
            deinits: 0,
            inits: 0,
            reconnects: 0,
        }
    }

    /// `deinit` call count
    pub fn deinits(&self) -> usize {
        self.deinits
    }

    /// `init` call count
    pub fn inits(&self) -> usize {
        self.inits
    }

    /// `auto_reconnect` call count
    pub fn reconnects(&self) -> usize {
        self.reconnects
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioLink for MockRadio {
    type Error = MockRadioError;

    async fn deinit(&mut self) -> Result<(), Self::Error> {
        self.deinits += 1;
        if self.fail_deinit {
            return Err(MockRadioError);
        }
        self.up = false;
        Ok(())
    }

    async fn init(&mut self) -> Result<(), Self::Error> {
        self.inits += 1;
        if self.fail_init {
            return Err(MockRadioError);
        }
        self.up = true;
        Ok(())
    }

    async fn auto_reconnect(&mut self) -> Result<AutoConnect, Self::Error> {
        self.reconnects += 1;
        self.reconnect
    }
}

/// Retained word shared between clones, standing in for memory that
/// survives a reset.
#[derive(Debug, Clone, Default)]
pub struct MockRetained {
    word: Arc<AtomicU32>,
}

impl MockRetained {
    /// Slot holding `value` (e.g. power-on garbage)
    pub fn holding(value: u32) -> Self {
        let slot = Self::default();
        slot.word.store(value, Ordering::SeqCst);
        slot
    }
}

impl RetainedSlot for MockRetained {
    fn load(&self) -> u32 {
        self.word.load(Ordering::SeqCst)
    }

    fn store(&mut self, value: u32) {
        self.word.store(value, Ordering::SeqCst);
    }
}

/// Errors from [`MockSettings`] and [`MockUptime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockStoreError;

/// In-memory settings
#[derive(Debug, Default)]
pub struct MockSettings {
    values: HashMap<String, u32>,
    /// Fail every read
    pub fail: bool,
}

impl MockSettings {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: store `value` under `key`
    pub fn with(mut self, key: &str, value: u32) -> Self {
        self.values.insert(String::from(key), value);
        self
    }
}

impl SettingsStore for MockSettings {
    type Error = MockStoreError;

    fn get_u32(&mut self, key: &str) -> Result<Option<u32>, Self::Error> {
        if self.fail {
            return Err(MockStoreError);
        }
        Ok(self.values.get(key).copied())
    }
}

/// Uptime store that counts saves
#[derive(Debug, Default)]
pub struct MockUptime {
    /// Fail every save
    pub fail: bool,
    saves: usize,
}

impl MockUptime {
    /// Number of `save` calls, failed ones included
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl UptimeStore for MockUptime {
    type Error = MockStoreError;

    fn save(&mut self) -> Result<(), Self::Error> {
        self.saves += 1;
        if self.fail {
            Err(MockStoreError)
        } else {
            Ok(())
        }
    }
}
