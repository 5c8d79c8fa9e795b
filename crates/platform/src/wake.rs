//! Wake lines
//!
//! The button and the touch controller interrupt are wired as active-low
//! lines that can end a halt. The sleep manager reads their current level to
//! veto a halt that would immediately wake again, and hands the whole set to
//! the [`HaltController`](crate::HaltController) as wake sources.

use heapless::Vec;

/// Maximum number of wake lines a board can register.
pub const MAX_WAKE_LINES: usize = 4;

/// Role of a wake line; used for log output only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeLineKind {
    /// Physical push button
    Button,
    /// Touch controller interrupt
    Touch,
}

impl WakeLineKind {
    /// Short name for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Touch => "touch",
        }
    }
}

/// Level at which a wake line is considered asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeLevel {
    /// Asserted when pulled low
    Low,
    /// Asserted when driven high
    High,
}

/// One GPIO wake line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeLine {
    /// GPIO number (bit index in [`WakeReport::gpio_mask`](crate::WakeReport))
    pub gpio: u8,
    /// What the line is connected to
    pub kind: WakeLineKind,
    /// Asserted level
    pub level: WakeLevel,
}

impl WakeLine {
    /// Active-low button line.
    pub const fn button(gpio: u8) -> Self {
        Self {
            gpio,
            kind: WakeLineKind::Button,
            level: WakeLevel::Low,
        }
    }

    /// Active-low touch interrupt line.
    pub const fn touch(gpio: u8) -> Self {
        Self {
            gpio,
            kind: WakeLineKind::Touch,
            level: WakeLevel::Low,
        }
    }

    /// Bit for this line in a GPIO wake mask (0 for out-of-range pins).
    pub const fn mask_bit(&self) -> u64 {
        if self.gpio < 64 {
            1 << self.gpio
        } else {
            0
        }
    }
}

/// Bounded set of registered wake lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WakeSources {
    lines: Vec<WakeLine, MAX_WAKE_LINES>,
}

impl WakeSources {
    /// Empty set.
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add a line. Returns the line back if the set is full.
    pub fn push(&mut self, line: WakeLine) -> Result<(), WakeLine> {
        self.lines.push(line)
    }

    /// Registered lines, in registration order.
    pub fn lines(&self) -> &[WakeLine] {
        &self.lines
    }

    /// OR of every line's mask bit.
    pub fn gpio_mask(&self) -> u64 {
        self.lines.iter().fold(0, |acc, l| acc | l.mask_bit())
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Level reads of wake lines.
pub trait WakeLines {
    /// True if `line` is currently at its asserted level.
    fn is_asserted(&self, line: &WakeLine) -> bool;

    /// First asserted line in `sources`, if any.
    fn first_asserted(&self, sources: &WakeSources) -> Option<WakeLine> {
        sources.lines().iter().copied().find(|l| self.is_asserted(l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Held(u8);

    impl WakeLines for Held {
        fn is_asserted(&self, line: &WakeLine) -> bool {
            line.gpio == self.0
        }
    }

    #[test]
    fn set_is_bounded() {
        let mut set = WakeSources::new();
        for gpio in 0..u8::try_from(MAX_WAKE_LINES).unwrap() {
            assert!(set.push(WakeLine::button(gpio)).is_ok());
        }
        assert_eq!(set.push(WakeLine::touch(40)), Err(WakeLine::touch(40)));
    }

    #[test]
    fn mask_covers_every_line() {
        let mut set = WakeSources::new();
        set.push(WakeLine::button(9)).unwrap();
        set.push(WakeLine::touch(15)).unwrap();
        assert_eq!(set.gpio_mask(), (1 << 9) | (1 << 15));
    }

    #[test]
    fn first_asserted_finds_held_line() {
        let mut set = WakeSources::new();
        set.push(WakeLine::button(9)).unwrap();
        set.push(WakeLine::touch(15)).unwrap();
        assert_eq!(Held(15).first_asserted(&set), Some(WakeLine::touch(15)));
        assert_eq!(Held(3).first_asserted(&set), None);
    }
}
