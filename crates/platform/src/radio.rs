//! Radio (networking) subsystem hooks
//!
//! Only used to tear the radio down before a light-sleep halt and bring it
//! back afterwards. Protocol handling lives elsewhere.

/// Outcome of an auto-reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AutoConnect {
    /// Association with a saved network started
    Connecting,
    /// No credentials stored; nothing to do
    NoSavedNetwork,
}

/// Radio suspend/resume hooks
pub trait RadioLink {
    /// Error type
    type Error: core::fmt::Debug;

    /// Shut the radio down
    async fn deinit(&mut self) -> Result<(), Self::Error>;

    /// Bring the radio back up
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Reconnect to the last saved network
    async fn auto_reconnect(&mut self) -> Result<AutoConnect, Self::Error>;
}

/// Board without a radio.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRadio;

impl RadioLink for NoRadio {
    type Error = core::convert::Infallible;

    async fn deinit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn auto_reconnect(&mut self) -> Result<AutoConnect, Self::Error> {
        Ok(AutoConnect::NoSavedNetwork)
    }
}
