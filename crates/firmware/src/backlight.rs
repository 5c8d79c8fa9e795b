//! GPIO backlight driver
//!
//! The panel backlight is a load switch on one GPIO. Pin errors cannot be
//! reported through [`Backlight`], so they are logged and dropped; on the
//! STM32 the GPIO error type is `Infallible` anyway.

use embedded_hal::digital::OutputPin;
use platform::Backlight;

/// Backlight on a single output pin.
pub struct PinBacklight<P> {
    pin: P,
    active_high: bool,
}

impl<P: OutputPin> PinBacklight<P> {
    /// Switch driven high to turn the backlight on.
    pub const fn active_high(pin: P) -> Self {
        Self {
            pin,
            active_high: true,
        }
    }

    /// Switch driven low to turn the backlight on (P-channel high-side).
    pub const fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_high: false,
        }
    }

    /// Give the pin back.
    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, lit: bool) {
        let result = if lit == self.active_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("backlight pin write failed");
        }
    }
}

impl<P: OutputPin> Backlight for PinBacklight<P> {
    fn on(&mut self) {
        self.drive(true);
    }

    fn off(&mut self) {
        self.drive(false);
    }
}
