//! Sleep kind persisted across a deep-sleep reset
//!
//! The retained word holds a 16-bit tag in the high half and the
//! [`SleepKind`] discriminant in the low half. Anything without the tag is
//! power-on garbage and reads as "nothing to report".

use platform::RetainedSlot;

/// High-half tag marking a word written by this module.
pub const RETAINED_TAG: u16 = 0x5AFE;

/// Kind of the most recent sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum SleepKind {
    /// No sleep recorded
    None = 0,
    /// Light sleep (RAM kept)
    Light = 1,
    /// Deep sleep (RAM lost, restarted from reset)
    Deep = 2,
}

impl SleepKind {
    /// Tagged retained word for this kind.
    pub const fn to_word(self) -> u32 {
        ((RETAINED_TAG as u32) << 16) | self as u32
    }

    /// Decode a retained word; `None` if the tag is missing or the kind is
    /// unknown.
    pub const fn from_word(word: u32) -> Option<Self> {
        if (word >> 16) != RETAINED_TAG as u32 {
            return None;
        }
        match word & 0xFFFF {
            0 => Some(Self::None),
            1 => Some(Self::Light),
            2 => Some(Self::Deep),
            _ => None,
        }
    }

    /// Short name for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Light => "light",
            Self::Deep => "deep",
        }
    }
}

/// Read and clear the retained sleep kind.
///
/// Returns `Some(kind)` for a recorded light or deep sleep, exactly once:
/// the slot is overwritten with [`SleepKind::None`] before returning.
/// Usable by boot code before any sleep manager exists.
pub fn take_sleep_kind<R: RetainedSlot>(slot: &mut R) -> Option<SleepKind> {
    let recorded = SleepKind::from_word(slot.load());
    slot.store(SleepKind::None.to_word());
    match recorded {
        Some(SleepKind::None) | None => None,
        Some(kind) => Some(kind),
    }
}

/// Record `kind` in the slot.
pub fn record_sleep_kind<R: RetainedSlot>(slot: &mut R, kind: SleepKind) {
    slot.store(kind.to_word());
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MockRetained;

    #[test]
    fn words_carry_the_tag() {
        assert_eq!(SleepKind::Deep.to_word(), 0x5AFE_0002);
        assert_eq!(SleepKind::from_word(0x5AFE_0001), Some(SleepKind::Light));
    }

    #[test]
    fn garbage_decodes_to_nothing() {
        for word in [0, u32::MAX, 0x1234_0002, 0x5AFE_0003] {
            assert_eq!(SleepKind::from_word(word), None, "{word:#x}");
        }
    }

    #[test]
    fn take_reports_once() {
        let mut slot = MockRetained::default();
        record_sleep_kind(&mut slot, SleepKind::Deep);
        assert_eq!(take_sleep_kind(&mut slot), Some(SleepKind::Deep));
        assert_eq!(take_sleep_kind(&mut slot), None);
    }

    #[test]
    fn cold_boot_garbage_is_cleared() {
        let mut slot = MockRetained::holding(0xDEAD_BEEF);
        assert_eq!(take_sleep_kind(&mut slot), None);
        assert_eq!(slot.load(), SleepKind::None.to_word());
    }
}
