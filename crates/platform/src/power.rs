//! Power management abstraction
//!
//! Provides the halt primitive used for light and deep sleep, the wake-cause
//! report it returns, and the battery / external-power monitor.

use core::convert::Infallible;

use embassy_time::Duration;

use crate::wake::WakeSources;

/// Hardware halt primitive.
///
/// Light sleep suspends the calling task until a registered wake line fires
/// (or the optional timer elapses) and returns with RAM intact. Deep sleep
/// powers the core down and never returns on success: the next thing that
/// runs is the reset vector.
pub trait HaltController {
    /// Error type
    type Error: core::fmt::Debug;

    /// Register the wake lines with the low-power controller.
    ///
    /// Called once at start-up; the same set is passed again to every halt so
    /// implementations may also re-arm lazily.
    fn enable_wake_sources(&mut self, sources: &WakeSources) -> Result<(), Self::Error>;

    /// Halt until a wake source fires.
    ///
    /// `timer` adds a timer wake on top of the GPIO lines. `None` means wait
    /// for a GPIO wake only.
    fn halt_until_wake(
        &mut self,
        sources: &WakeSources,
        timer: Option<Duration>,
    ) -> impl core::future::Future<Output = Result<WakeReport, Self::Error>>;

    /// Enter the destructive halt.
    ///
    /// Returns only if the hardware refused to enter the low-power state.
    fn enter_deep_sleep(&mut self, sources: &WakeSources) -> Result<Infallible, Self::Error>;
}

/// Why the last halt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCause {
    /// GPIO line (button, touch interrupt)
    Gpio,
    /// Timer wake
    Timer,
    /// UART activity
    Uart,
    /// Single external wake pin
    Ext0,
    /// External wake pin group
    Ext1,
    /// Capacitive touch pad
    Touchpad,
    /// Ultra-low-power coprocessor
    Ulp,
    /// Not determinable (spurious wake or unknown flag set)
    Undefined,
}

impl WakeCause {
    /// Short lowercase name for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gpio => "gpio",
            Self::Timer => "timer",
            Self::Uart => "uart",
            Self::Ext0 => "ext0",
            Self::Ext1 => "ext1",
            Self::Touchpad => "touchpad",
            Self::Ulp => "ulp",
            Self::Undefined => "undefined",
        }
    }
}

/// Result of a light-sleep halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeReport {
    /// Classified wake cause
    pub cause: WakeCause,
    /// Bit `n` set when GPIO `n` triggered the wake (0 if unknown)
    pub gpio_mask: u64,
}

impl WakeReport {
    /// GPIO wake with the given pin bitmask.
    pub const fn gpio(mask: u64) -> Self {
        Self {
            cause: WakeCause::Gpio,
            gpio_mask: mask,
        }
    }

    /// Non-GPIO wake.
    pub const fn other(cause: WakeCause) -> Self {
        Self { cause, gpio_mask: 0 }
    }

    /// True if `gpio` is set in the wake mask.
    pub const fn woke_by(&self, gpio: u8) -> bool {
        gpio < 64 && (self.gpio_mask >> gpio) & 1 == 1
    }
}

/// Battery and external power monitor.
///
/// Takes `&mut self` because real implementations talk to a PMIC over I²C.
pub trait PowerMonitor {
    /// Get battery voltage (mV)
    fn battery_voltage(&mut self) -> Option<u16>;

    /// Get battery percentage (0-100)
    fn battery_percentage(&mut self) -> Option<u8>;

    /// Check if charging
    fn is_charging(&mut self) -> bool;

    /// Check if USB power connected
    fn is_usb_connected(&mut self) -> bool;
}

impl<P: PowerMonitor> PowerMonitor for &mut P {
    fn battery_voltage(&mut self) -> Option<u16> {
        (**self).battery_voltage()
    }

    fn battery_percentage(&mut self) -> Option<u8> {
        (**self).battery_percentage()
    }

    fn is_charging(&mut self) -> bool {
        (**self).is_charging()
    }

    fn is_usb_connected(&mut self) -> bool {
        (**self).is_usb_connected()
    }
}

/// Rough state-of-charge estimate from a single-cell Li-ion voltage.
///
/// Linear between 3300 mV (0 %) and 4200 mV (100 %), clamped at both ends.
pub fn lipo_percentage(millivolts: u16) -> u8 {
    const EMPTY_MV: u16 = 3300;
    const FULL_MV: u16 = 4200;
    if millivolts <= EMPTY_MV {
        return 0;
    }
    if millivolts >= FULL_MV {
        return 100;
    }
    let above = u32::from(millivolts.saturating_sub(EMPTY_MV));
    let span = u32::from(FULL_MV.saturating_sub(EMPTY_MV));
    u8::try_from(above.saturating_mul(100) / span).unwrap_or(100)
}
