//! Application configuration and constants
//!
//! Central naming and board constants. Code should reference these rather
//! than hardcoding values.

/// The application name
pub const APP_NAME: &str = "Wrist Watch";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// GPIO number of the side button wake line (active low)
pub const BUTTON_WAKE_GPIO: u8 = 9;

/// GPIO number of the touch controller interrupt line (active low)
pub const TOUCH_WAKE_GPIO: u8 = 15;

/// 7-bit I²C address of the BQ25895 charger
pub const PMIC_I2C_ADDR: u8 = 0x6A;
