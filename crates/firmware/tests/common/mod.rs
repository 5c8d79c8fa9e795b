//! Host board: the real firmware runtime, latch and backlight driver over
//! mock pins, a mock PMIC bus and mock platform collaborators.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{ErrorType as I2cErrorType, I2c, Operation};
use firmware::wake::{HaltError, StandbyRegisters};
use firmware::{LatchHalt, PinBacklight, UiRuntime, WakeLatch};
use platform::bq25895::{self, Bq25895Monitor};
use platform::mocks::{MockClock, MockRetained};
use platform::{NoRadio, NoUptime};
use sleep_manager::{Hardware, LockPolicy, PowerState, SleepConfig, SleepHal, SleepManager};

// -- Mock backlight pin ----------------------------------------------------

/// Output pin whose level the test can watch.
#[derive(Clone, Default)]
pub struct MockPin {
    high: Rc<Cell<bool>>,
}

impl MockPin {
    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl PinErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

// -- Mock PMIC bus ---------------------------------------------------------

/// BQ25895 register file behind a fake I2C bus.
#[derive(Clone, Default)]
pub struct MockPmicBus {
    regs: Rc<RefCell<[u8; 0x15]>>,
    writes: Rc<RefCell<Vec<(u8, Vec<u8>)>>>,
}

impl MockPmicBus {
    pub fn plug_usb(&self) {
        self.regs.borrow_mut()[usize::from(bq25895::REG0B_STATUS)] = bq25895::VBUS_STAT_SDP;
    }

    pub fn unplug_usb(&self) {
        self.regs.borrow_mut()[usize::from(bq25895::REG0B_STATUS)] = bq25895::VBUS_STAT_NO_INPUT;
    }

    pub fn wrote_register(&self, reg: u8) -> bool {
        self.writes
            .borrow()
            .iter()
            .any(|(addr, data)| *addr == bq25895::BQ25895_I2C_ADDR && data.first() == Some(&reg))
    }
}

impl I2cErrorType for MockPmicBus {
    type Error = Infallible;
}

impl I2c for MockPmicBus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let mut pointer = 0usize;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    self.writes.borrow_mut().push((address, bytes.to_vec()));
                    if let Some((&reg, values)) = bytes.split_first() {
                        pointer = usize::from(reg);
                        let mut regs = self.regs.borrow_mut();
                        for (offset, value) in values.iter().enumerate() {
                            regs[pointer + offset] = *value;
                        }
                    }
                }
                Operation::Read(buf) => {
                    let regs = self.regs.borrow();
                    for (offset, byte) in buf.iter_mut().enumerate() {
                        *byte = regs[pointer + offset];
                    }
                }
            }
        }
        Ok(())
    }
}

// -- Standby stand-in ------------------------------------------------------

/// WKUPEPR value of the last refused Standby entry.
pub static LAST_WKUPEPR: AtomicU32 = AtomicU32::new(0);

/// Standby entry that always refuses, recording the register values.
pub fn refuse_standby(regs: &StandbyRegisters) -> Result<Infallible, HaltError> {
    LAST_WKUPEPR.store(regs.wkupepr, Ordering::SeqCst);
    Err(HaltError::StandbyRefused)
}

// -- Board -----------------------------------------------------------------

pub struct HostBoard;

impl SleepHal for HostBoard {
    type Backlight = PinBacklight<MockPin>;
    type Ui = &'static UiRuntime;
    type Halt = LatchHalt<'static>;
    type Power = Bq25895Monitor<MockPmicBus>;
    type Lines = &'static WakeLatch;
    type Radio = NoRadio;
    type Retained = MockRetained;
    type Uptime = NoUptime;
}

pub type HostManager<'s> = SleepManager<'s, HostBoard, MockClock>;

/// Fast-failing UI lock so contention tests finish quickly.
pub fn host_config() -> SleepConfig {
    firmware::board::board_config().with_ui_lock(LockPolicy {
        timeout_ms: 5,
        retries: 1,
        backoff_ms: 0,
    })
}

/// One booted watch. Runtime and latch are leaked so they are `'static` like
/// the firmware's statics, but private to the test.
pub struct Watch {
    pub ui: &'static UiRuntime,
    pub latch: &'static WakeLatch,
    pub backlight: MockPin,
    pub pmic: MockPmicBus,
    pub retained: MockRetained,
    pub clock: MockClock,
    pub state: PowerState<MockClock>,
}

impl Watch {
    pub fn new() -> Self {
        let clock = MockClock::at_ms(1_000);
        Self {
            ui: Box::leak(Box::new(UiRuntime::new())),
            latch: Box::leak(Box::new(WakeLatch::new())),
            backlight: MockPin::default(),
            pmic: MockPmicBus::default(),
            retained: MockRetained::default(),
            state: PowerState::new(clock.clone()),
            clock,
        }
    }

    /// Attach the panel and register `timers` one-second timers.
    pub async fn with_face(self, timers: usize) -> Self {
        {
            let mut ui = self.ui.state().await;
            ui.attach_display();
            for _ in 0..timers {
                ui.create_timer(1_000, 0).unwrap();
            }
        }
        self
    }

    pub fn hardware(&self) -> Hardware<HostBoard> {
        let mut pmic = Bq25895Monitor::new(self.pmic.clone());
        pmic.init().unwrap();
        let mut backlight = PinBacklight::active_high(self.backlight.clone());
        platform::Backlight::on(&mut backlight);
        Hardware {
            backlight,
            ui: self.ui,
            halt: LatchHalt::new(self.latch, refuse_standby),
            power: pmic,
            lines: self.latch,
            radio: NoRadio,
            retained: self.retained.clone(),
            uptime: NoUptime,
        }
    }

    pub fn manager(&self, config: SleepConfig) -> HostManager<'_> {
        SleepManager::init(config, &self.state, self.hardware()).expect("init")
    }
}
