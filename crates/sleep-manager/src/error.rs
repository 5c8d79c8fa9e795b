//! Sleep manager errors

/// Errors surfaced by the sleep manager.
///
/// Vetoes (USB present, wake line held, already sleeping) are not errors:
/// the operation returns `Ok(())` and the activity timer is reset instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepError {
    /// UI lock not acquired within the retry budget
    UiLockTimeout,
    /// UI engine has no display; nothing to quiesce
    NoDisplay,
    /// Halt primitive refused to enter the low-power state
    HaltFailed,
    /// Wake sources could not be registered
    WakeSourceSetup,
    /// Zero timeout or zero poll interval
    InvalidConfig,
}

impl SleepError {
    /// Short name for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UiLockTimeout => "ui lock timeout",
            Self::NoDisplay => "no display",
            Self::HaltFailed => "halt failed",
            Self::WakeSourceSetup => "wake source setup failed",
            Self::InvalidConfig => "invalid config",
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SleepError {}

impl core::fmt::Display for SleepError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UiLockTimeout => write!(f, "UI lock not acquired within retry budget"),
            Self::NoDisplay => write!(f, "UI engine has no display"),
            Self::HaltFailed => write!(f, "Hardware halt failed"),
            Self::WakeSourceSetup => write!(f, "Failed to register wake sources"),
            Self::InvalidConfig => write!(f, "Invalid sleep configuration"),
        }
    }
}
