//! Wrist-watch firmware - main entry point
//!
//! Hardware-only entry point for STM32H743ZI.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_stm32::dma::NoDma;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::time::Hertz;
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_time::Instant;
use platform::bq25895::Bq25895Monitor;
use platform::config::{APP_NAME, APP_VERSION};
use platform::{Button, EmbassyClock, NoRadio, NoSettings, NoUptime};
use sleep_manager::{run, Hardware, InputChannel, InputReceiver, PowerState, SleepManager};
use static_cell::StaticCell;

use firmware::board::{board_config, BUTTON_EXTI, TOUCH_EXTI};
use firmware::boot::hardware::BackupRegister;
use firmware::input::hardware::{spawn_input_task, InputLine};
use firmware::wake::hardware::enter_standby;
use firmware::{
    boot_reason, LatchHalt, LineReporter, LineRole, PinBacklight, UiRuntime, WakeLatch,
    WatchManager,
};

// Panic handler + RTT transport
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    I2C2_EV => i2c::EventInterruptHandler<peripherals::I2C2>;
    I2C2_ER => i2c::ErrorInterruptHandler<peripherals::I2C2>;
});

/// Watch-face redraw period.
const CLOCK_FACE_PERIOD_MS: u32 = 1_000;

static UI: UiRuntime = UiRuntime::new();
static LATCH: WakeLatch = WakeLatch::new();
static INPUTS: InputChannel = InputChannel::new();
static POWER_STATE: StaticCell<PowerState<EmbassyClock>> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("{=str} v{=str}", APP_NAME, APP_VERSION);

    // Step 1: clocks. See firmware::boot::BOOT_SEQUENCE_STEPS for the order.
    let p = embassy_stm32::init(firmware::boot::build_embassy_config());

    // Step 2 + 3: unlock the backup domain, then consume the retained word
    // before anything can record a new sleep kind.
    let mut retained = BackupRegister::unlock();
    let reason = boot_reason(&mut retained);
    defmt::info!("boot: {}", reason);

    // Step 4: PMIC on I2C2 (PF1 = SCL, PF0 = SDA), blocking transfers.
    let i2c = I2c::new(
        p.I2C2,
        p.PF1,
        p.PF0,
        Irqs,
        NoDma,
        NoDma,
        Hertz(100_000),
        Default::default(),
    );
    let mut pmic = Bq25895Monitor::new(i2c);
    if pmic.init().is_err() {
        defmt::warn!("BQ25895 init failed, battery readings unavailable");
    }

    // The panel and the clock-face timer must exist before the sleep manager
    // first quiesces the UI.
    {
        let mut ui = UI.state().await;
        ui.attach_display();
        if let Err(e) = ui.create_timer(CLOCK_FACE_PERIOD_MS, Instant::now().as_millis()) {
            defmt::warn!("clock face timer: {}", e);
        }
    }

    // Step 5: sleep manager.
    let mut config = board_config();
    config.apply_settings(&mut NoSettings);

    let backlight = Output::new(p.PE10, Level::High, Speed::Low).degrade();
    let hw = Hardware {
        backlight: PinBacklight::active_high(backlight),
        ui: &UI,
        halt: LatchHalt::new(&LATCH, enter_standby),
        power: pmic,
        lines: &LATCH,
        radio: NoRadio,
        retained,
        uptime: NoUptime,
    };
    let state = POWER_STATE.init(PowerState::new(EmbassyClock));
    let manager = match SleepManager::init(config, state, hw) {
        Ok(manager) => manager,
        Err(e) => {
            // Without the monitor the watch simply never sleeps.
            defmt::error!("sleep manager init failed: {}", e);
            return;
        }
    };

    // Step 6: tasks.
    let button = InputLine {
        pin: ExtiInput::new(Input::new(p.PC13, Pull::Up).degrade(), p.EXTI13.degrade()),
        exti: BUTTON_EXTI,
        role: LineRole::Button(Button::Boot),
    };
    let touch = InputLine {
        pin: ExtiInput::new(Input::new(p.PA0, Pull::Up).degrade(), p.EXTI0.degrade()),
        exti: TOUCH_EXTI,
        role: LineRole::Touch,
    };
    if spawn_input_task(&spawner, button, touch, LineReporter::new(&LATCH, &INPUTS)).is_err() {
        defmt::error!("failed to spawn input_task");
    }
    if spawner.spawn(ui_task(&UI)).is_err() {
        defmt::error!("failed to spawn ui_task");
    }
    if spawner.spawn(monitor_task(manager, INPUTS.receiver())).is_err() {
        defmt::error!("failed to spawn monitor_task");
    }
    defmt::info!("tasks spawned, input queue depth={=usize}", sleep_manager::monitor::INPUT_QUEUE_DEPTH);
}

/// Fires watch-face timers and redraws.
#[embassy_executor::task]
async fn ui_task(ui: &'static UiRuntime) {
    ui.run(|frame| {
        if frame.redraw {
            defmt::trace!("redraw, {=usize} timers fired", frame.fired.len());
        }
    })
    .await
}

/// Owns the sleep manager for the lifetime of the program.
#[embassy_executor::task]
async fn monitor_task(mut manager: WatchManager, inputs: InputReceiver<'static>) {
    run(&mut manager, inputs).await
}
