//! EXTI input loops for the side button and the touch interrupt.
//!
//! # Pin assignments
//!
//! | Signal          | MCU pin | EXTI | Notes                               |
//! |-----------------|---------|------|-------------------------------------|
//! | Side button     | PC13    | 13   | Active-low, internal pull-up, WKUP4 |
//! | Touch INT       | PA0     | 0    | Active-low, internal pull-up, WKUP1 |
//!
//! Both pins are WKUP-capable so they also leave Standby.
//!
//! Call [`spawn_input_task`] once at startup; the task owns both pins for the
//! lifetime of the program.

use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::AnyPin;
use embassy_time::Timer;

use super::{LineReporter, LineRole, DEBOUNCE_MS};

/// One wake-capable input line.
pub struct InputLine {
    /// EXTI pin
    pub pin: ExtiInput<'static, AnyPin>,
    /// EXTI line number (pin number within the port)
    pub exti: u8,
    /// What the line is wired to
    pub role: LineRole,
}

/// Spawn the input task.
///
/// Returns the spawn error if the task is already running.
pub fn spawn_input_task(
    spawner: &Spawner,
    button: InputLine,
    touch: InputLine,
    reporter: LineReporter<'static>,
) -> Result<(), embassy_executor::SpawnError> {
    spawner.spawn(input_task(button, touch, reporter))
}

/// Embassy task that owns both input lines.
#[embassy_executor::task]
async fn input_task(mut button: InputLine, mut touch: InputLine, reporter: LineReporter<'static>) {
    join(line_loop(&mut button, reporter), line_loop(&mut touch, reporter)).await;
}

/// Debounced active-low line loop.
///
/// Waits for a falling edge, debounces, confirms the level is still low and
/// reports the assertion; then the same for the release.
async fn line_loop(line: &mut InputLine, reporter: LineReporter<'static>) {
    loop {
        line.pin.wait_for_falling_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
        if line.pin.is_high() {
            continue;
        }
        defmt::debug!("line {=u8} asserted ({})", line.exti, line.role);
        reporter.report(line.exti, line.role, true);

        line.pin.wait_for_rising_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
        defmt::debug!("line {=u8} released", line.exti);
        reporter.report(line.exti, line.role, false);
    }
}
