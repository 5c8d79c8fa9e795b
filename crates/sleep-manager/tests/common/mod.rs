//! Shared harness: a mock board and a builder for managers over it.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use platform::mocks::{
    MockBacklight, MockClock, MockHalt, MockPowerMonitor, MockRadio, MockRetained, MockUi,
    MockUptime, MockWakeLines,
};
use sleep_manager::{Hardware, LockPolicy, PowerState, SleepConfig, SleepHal, SleepManager};

/// Board made entirely of mocks.
pub struct MockHal;

impl SleepHal for MockHal {
    type Backlight = MockBacklight;
    type Ui = MockUi;
    type Halt = MockHalt;
    type Power = MockPowerMonitor;
    type Lines = MockWakeLines;
    type Radio = MockRadio;
    type Retained = MockRetained;
    type Uptime = MockUptime;
}

pub type Manager<'s> = SleepManager<'s, MockHal, MockClock>;

pub const BUTTON: u8 = 9;
pub const TOUCH: u8 = 15;

/// Defaults with a UI lock policy that fails fast.
pub fn test_config() -> SleepConfig {
    SleepConfig::default().with_ui_lock(LockPolicy {
        timeout_ms: 1,
        retries: 2,
        backoff_ms: 0,
    })
}

/// Mock board on battery with `timers` running UI timers. The halt advances
/// `clock` by 200 ms and reports a button wake.
pub fn hardware(clock: &MockClock, retained: &MockRetained, timers: usize) -> Hardware<MockHal> {
    Hardware {
        backlight: MockBacklight::new(),
        ui: MockUi::with_timers(timers),
        halt: MockHalt::new()
            .sleeping_for(clock.clone(), 200)
            .watching(retained.clone())
            .reporting(platform::WakeReport::gpio(1 << BUTTON)),
        power: MockPowerMonitor::on_battery(),
        lines: MockWakeLines::new(),
        radio: MockRadio::new(),
        retained: retained.clone(),
        uptime: MockUptime::default(),
    }
}

/// Clock, retained slot and state for one test.
pub struct Rig {
    pub clock: MockClock,
    pub retained: MockRetained,
    pub state: PowerState<MockClock>,
}

impl Rig {
    pub fn new() -> Self {
        let clock = MockClock::at_ms(1_000);
        Self {
            state: PowerState::new(clock.clone()),
            clock,
            retained: MockRetained::default(),
        }
    }

    pub fn manager(&self, config: SleepConfig, timers: usize) -> Manager<'_> {
        SleepManager::init(config, &self.state, hardware(&self.clock, &self.retained, timers))
            .expect("init")
    }

    pub fn manager_with(&self, config: SleepConfig, hw: Hardware<MockHal>) -> Manager<'_> {
        SleepManager::init(config, &self.state, hw).expect("init")
    }
}
