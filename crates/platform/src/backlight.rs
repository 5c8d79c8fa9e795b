//! Display backlight abstraction

/// Backlight on/off primitive.
///
/// Both calls are idempotent at the hardware level; the sleep manager tracks
/// the logical state and only calls them on transitions.
pub trait Backlight {
    /// Switch the backlight on
    fn on(&mut self);

    /// Switch the backlight off
    fn off(&mut self);
}
