//! Wake lines and the halt primitive
//!
//! The input task owns the EXTI pins. It reports every debounced edge to a
//! [`WakeLatch`], which keeps the current level of each line (for the sleep
//! veto) and a pending-edge mask plus signal (to end a light sleep).
//!
//! [`LatchHalt`] is the board's [`HaltController`]:
//!
//! - light sleep parks the monitor task on the latch signal, optionally
//!   raced against a timer. With no task ready the executor sits in `WFI`,
//!   so the core is halted until an EXTI or timer interrupt.
//! - deep sleep hands the armed line mask to a Standby entry function, which
//!   on hardware never returns.
//!
//! # Standby wake pins (STM32H743)
//!
//! Standby can only be left through the dedicated WKUP pins. The board wires
//! its wake lines to WKUP-capable pins; lines are identified by their EXTI
//! number (the pin number within its port).
//!
//! | WKUP | Pin  | EXTI line |
//! |------|------|-----------|
//! | 1    | PA0  | 0         |
//! | 2    | PA2  | 2         |
//! | 3    | PI8  | 8         |
//! | 4    | PC13 | 13        |
//! | 5    | PI11 | 11        |
//! | 6    | PC1  | 1         |

use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use platform::{HaltController, WakeCause, WakeLine, WakeLines, WakeReport, WakeSources};

/// EXTI line of each WKUP pin, WKUP1 first.
pub const WKUP_EXTI_LINES: [u8; 6] = [0, 2, 8, 13, 11, 1];

/// Halt errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HaltError {
    /// A wake line is not an EXTI line (0..=15)
    NotExtiLine(u8),
    /// No wake line can leave Standby (none is on a WKUP pin)
    NoStandbyWakePin,
    /// The core returned from `WFI` instead of entering Standby
    StandbyRefused,
}

impl core::fmt::Display for HaltError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotExtiLine(gpio) => write!(f, "gpio {gpio} is not an EXTI line"),
            Self::NoStandbyWakePin => write!(f, "no wake line on a WKUP pin"),
            Self::StandbyRefused => write!(f, "standby entry refused"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HaltError {}

// ---------------------------------------------------------------------------
// Latch
// ---------------------------------------------------------------------------

/// Line levels and pending wake edges, shared between the input task and the
/// halt primitive. `const`-constructible for use in a `static`.
pub struct WakeLatch {
    asserted: AtomicU32,
    pending: AtomicU32,
    edge: Signal<CriticalSectionRawMutex, ()>,
}

impl WakeLatch {
    /// No line asserted, nothing pending.
    pub const fn new() -> Self {
        Self {
            asserted: AtomicU32::new(0),
            pending: AtomicU32::new(0),
            edge: Signal::new(),
        }
    }

    /// Record a debounced level change on EXTI line `line`.
    ///
    /// An assertion also latches a wake edge. Lines above 31 are ignored.
    pub fn record(&self, line: u8, asserted: bool) {
        let Some(bit) = line_bit(line) else { return };
        if asserted {
            self.asserted.fetch_or(bit, Ordering::AcqRel);
            self.pending.fetch_or(bit, Ordering::AcqRel);
            self.edge.signal(());
        } else {
            self.asserted.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    /// Bitmask of currently asserted lines.
    pub fn asserted_mask(&self) -> u32 {
        self.asserted.load(Ordering::Acquire)
    }

    /// Drop stale edges before a halt.
    pub fn clear_pending(&self) {
        self.pending.store(0, Ordering::Release);
        self.edge.reset();
    }

    /// Wait until any line in `armed` has a latched edge or is held
    /// asserted; returns those lines.
    ///
    /// The wake lines are level-triggered, so a line already held low ends
    /// the wait at once.
    pub async fn wait_edge(&self, armed: u32) -> u32 {
        loop {
            let fired = self.pending.swap(0, Ordering::AcqRel) & armed;
            if fired != 0 {
                return fired;
            }
            let held = self.asserted_mask() & armed;
            if held != 0 {
                return held;
            }
            self.edge.wait().await;
        }
    }
}

impl Default for WakeLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeLines for WakeLatch {
    fn is_asserted(&self, line: &WakeLine) -> bool {
        line_bit(line.gpio).is_some_and(|bit| self.asserted_mask() & bit != 0)
    }
}

impl WakeLines for &WakeLatch {
    fn is_asserted(&self, line: &WakeLine) -> bool {
        (**self).is_asserted(line)
    }
}

fn line_bit(line: u8) -> Option<u32> {
    1u32.checked_shl(u32::from(line))
}

// ---------------------------------------------------------------------------
// Standby register values
// ---------------------------------------------------------------------------

/// Register values written just before Standby entry.
///
/// Pure data so the encoding can be checked on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandbyRegisters {
    /// PWR_WKUPEPR: WKUPEN[5:0], WKUPP[13:8] (falling edge), WKUPPUPD[27:16]
    /// (pull-up, 0b01 per pin)
    pub wkupepr: u32,
    /// PWR_CPUCR: PDDS_D1 | PDDS_D2 | PDDS_D3
    pub cpucr: u32,
}

/// Clear-all value for PWR_WKUPCR (WKUPC[5:0]).
pub const WKUPCR_CLEAR_ALL: u32 = 0x3F;

/// Encode the Standby wake configuration for the EXTI lines in `exti_mask`.
///
/// Lines without a WKUP pin are skipped; if none remains the device could
/// never wake, so [`HaltError::NoStandbyWakePin`] is returned.
#[allow(clippy::arithmetic_side_effects)] // pin < 6: every shift stays below 32
pub fn standby_registers(exti_mask: u32) -> Result<StandbyRegisters, HaltError> {
    let mut wkupepr = 0u32;
    for (pin, &line) in (0u32..).zip(WKUP_EXTI_LINES.iter()) {
        if exti_mask & (1 << line) == 0 {
            continue;
        }
        let enable = 1 << pin;
        let falling = 1 << (pin + 8);
        let pull_up = 0b01 << (16 + 2 * pin);
        wkupepr |= enable | falling | pull_up;
    }
    if wkupepr == 0 {
        return Err(HaltError::NoStandbyWakePin);
    }
    Ok(StandbyRegisters {
        wkupepr,
        cpucr: 0b111,
    })
}

// ---------------------------------------------------------------------------
// Halt controller
// ---------------------------------------------------------------------------

/// Enters Standby with the given registers. Returns only on refusal.
pub type StandbyEntry = fn(&StandbyRegisters) -> Result<Infallible, HaltError>;

/// [`HaltController`] over a [`WakeLatch`].
pub struct LatchHalt<'l> {
    latch: &'l WakeLatch,
    armed: u32,
    standby: StandbyEntry,
}

impl<'l> LatchHalt<'l> {
    /// Halt primitive waking on `latch` edges; `standby` performs deep sleep.
    pub const fn new(latch: &'l WakeLatch, standby: StandbyEntry) -> Self {
        Self {
            latch,
            armed: 0,
            standby,
        }
    }

    /// EXTI lines registered as wake sources.
    pub fn armed_mask(&self) -> u32 {
        self.armed
    }
}

impl HaltController for LatchHalt<'_> {
    type Error = HaltError;

    fn enable_wake_sources(&mut self, sources: &WakeSources) -> Result<(), Self::Error> {
        let mut armed = 0u32;
        for line in sources.lines() {
            match line_bit(line.gpio) {
                Some(bit) if line.gpio <= 15 => armed |= bit,
                _ => return Err(HaltError::NotExtiLine(line.gpio)),
            }
        }
        self.armed = armed;
        Ok(())
    }

    async fn halt_until_wake(
        &mut self,
        _sources: &WakeSources,
        timer: Option<Duration>,
    ) -> Result<WakeReport, Self::Error> {
        self.latch.clear_pending();
        // Pressed after the sleep veto ran and still held.
        let held = self.latch.asserted_mask() & self.armed;
        if held != 0 {
            return Ok(WakeReport::gpio(u64::from(held)));
        }
        let edge = self.latch.wait_edge(self.armed);
        let report = match timer {
            None => WakeReport::gpio(u64::from(edge.await)),
            Some(after) => match select(edge, Timer::after(after)).await {
                Either::First(mask) => WakeReport::gpio(u64::from(mask)),
                Either::Second(()) => WakeReport::other(WakeCause::Timer),
            },
        };
        Ok(report)
    }

    fn enter_deep_sleep(&mut self, _sources: &WakeSources) -> Result<Infallible, Self::Error> {
        let regs = standby_registers(self.armed)?;
        (self.standby)(&regs)
    }
}

// ---------------------------------------------------------------------------
// Hardware Standby entry
// ---------------------------------------------------------------------------

#[cfg(feature = "hardware")]
pub mod hardware {
    //! PWR register writes for Standby. Only compiled for the target.

    use core::convert::Infallible;

    use super::{HaltError, StandbyRegisters, WKUPCR_CLEAR_ALL};

    /// PWR_CPUCR (PWR base 0x5802_4800, RM0433 §6.8)
    const PWR_CPUCR: usize = 0x5802_4810;
    /// PWR_WKUPCR
    const PWR_WKUPCR: usize = 0x5802_4820;
    /// PWR_WKUPEPR
    const PWR_WKUPEPR: usize = 0x5802_4828;

    /// Enter Standby (RM0433 §6.6.4). Returns only if the core wakes from
    /// `WFI` without resetting.
    #[allow(unsafe_code)]
    pub fn enter_standby(regs: &StandbyRegisters) -> Result<Infallible, HaltError> {
        // SAFETY: PWR registers are always mapped; this is the last code the
        // monitor task runs and no other task touches PWR.
        unsafe {
            core::ptr::write_volatile(PWR_WKUPCR as *mut u32, WKUPCR_CLEAR_ALL);
            core::ptr::write_volatile(PWR_WKUPEPR as *mut u32, regs.wkupepr);
            let cpucr = core::ptr::read_volatile(PWR_CPUCR as *const u32);
            core::ptr::write_volatile(PWR_CPUCR as *mut u32, cpucr | regs.cpucr);
        }

        // SAFETY: stealing SCB only to set SLEEPDEEP; nothing else holds it.
        let mut cp = unsafe { cortex_m::Peripherals::steal() };
        cp.SCB.set_sleepdeep();
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();

        // Still running: a pending interrupt blocked Standby entry.
        cp.SCB.clear_sleepdeep();
        Err(HaltError::StandbyRefused)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn latch_tracks_levels() {
        let latch = WakeLatch::new();
        latch.record(13, true);
        assert!(latch.is_asserted(&WakeLine::button(13)));
        assert!(!latch.is_asserted(&WakeLine::touch(0)));
        latch.record(13, false);
        assert!(!latch.is_asserted(&WakeLine::button(13)));
        latch.record(40, true);
        assert_eq!(latch.asserted_mask(), 0);
    }

    #[test]
    fn standby_encoding_for_pc13_and_pa0() {
        let regs = standby_registers((1 << 13) | 1).unwrap();
        // WKUP1 (PA0) and WKUP4 (PC13)
        assert_eq!(regs.wkupepr & 0x3F, 0b00_1001);
        assert_eq!((regs.wkupepr >> 8) & 0x3F, 0b00_1001);
        assert_eq!((regs.wkupepr >> 16) & 0b11, 0b01);
        assert_eq!((regs.wkupepr >> 22) & 0b11, 0b01);
        assert_eq!(regs.cpucr, 0b111);
    }

    #[test]
    fn standby_needs_a_wkup_pin() {
        assert_eq!(standby_registers(1 << 9), Err(HaltError::NoStandbyWakePin));
    }

    fn armed_halt(latch: &WakeLatch) -> LatchHalt<'_> {
        let mut halt = LatchHalt::new(latch, |_| Err(HaltError::StandbyRefused));
        let mut sources = WakeSources::new();
        sources.push(WakeLine::button(13)).unwrap();
        sources.push(WakeLine::touch(0)).unwrap();
        halt.enable_wake_sources(&sources).unwrap();
        halt
    }

    #[test]
    fn held_line_ends_halt_immediately() {
        let latch = WakeLatch::new();
        let mut halt = armed_halt(&latch);
        latch.record(13, true);

        let report =
            embassy_futures::block_on(halt.halt_until_wake(&WakeSources::new(), None)).unwrap();
        assert_eq!(report, WakeReport::gpio(1 << 13));
    }

    #[test]
    fn wait_edge_sees_level_after_pending_cleared() {
        let latch = WakeLatch::new();
        latch.record(0, true);
        latch.clear_pending();
        assert_eq!(embassy_futures::block_on(latch.wait_edge(1)), 1);
    }

    #[test]
    fn non_exti_line_rejected() {
        let latch = WakeLatch::new();
        let mut halt = LatchHalt::new(&latch, |_| Err(HaltError::StandbyRefused));
        let mut sources = WakeSources::new();
        sources.push(WakeLine::button(20)).unwrap();
        assert_eq!(halt.enable_wake_sources(&sources), Err(HaltError::NotExtiLine(20)));
    }
}
