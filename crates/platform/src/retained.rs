//! Retained memory slot
//!
//! One 32-bit word that survives a deep-sleep reset (an RTC backup register
//! on STM32H7). Its contents are undefined after a cold boot.

/// A single retained word.
pub trait RetainedSlot {
    /// Read the current value
    fn load(&self) -> u32;

    /// Overwrite the value
    fn store(&mut self, value: u32);
}

impl<R: RetainedSlot> RetainedSlot for &mut R {
    fn load(&self) -> u32 {
        (**self).load()
    }

    fn store(&mut self, value: u32) {
        (**self).store(value);
    }
}
