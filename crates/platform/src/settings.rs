//! Persistent settings and uptime collaborators
//!
//! The sleep manager only reads a handful of integer timeouts and asks for
//! uptime counters to be flushed before a halt. Storage encoding is the
//! store's business.

/// Well-known setting keys.
pub mod keys {
    /// Backlight timeout in seconds
    pub const BACKLIGHT_TIMEOUT_S: &str = "backlight_timeout_s";
    /// Light-sleep timeout in seconds
    pub const SLEEP_TIME_S: &str = "sleep_time";
    /// Deep-sleep timeout in seconds (0 disables)
    pub const DEEP_SLEEP_S: &str = "deep_sleep_s";
}

/// Key/value integer settings.
pub trait SettingsStore {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read an integer setting. `Ok(None)` when the key was never written.
    fn get_u32(&mut self, key: &str) -> Result<Option<u32>, Self::Error>;
}

/// Store with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSettings;

impl SettingsStore for NoSettings {
    type Error = core::convert::Infallible;

    fn get_u32(&mut self, _key: &str) -> Result<Option<u32>, Self::Error> {
        Ok(None)
    }
}

/// Uptime counter persistence.
pub trait UptimeStore {
    /// Error type
    type Error: core::fmt::Debug;

    /// Flush the cumulative uptime counters to non-volatile storage.
    fn save(&mut self) -> Result<(), Self::Error>;
}

/// Board that does not track uptime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUptime;

impl UptimeStore for NoUptime {
    type Error = core::convert::Infallible;

    fn save(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
