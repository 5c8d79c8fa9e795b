//! Input device abstraction
//!
//! Buttons and the touch panel are producers of activity for the sleep
//! manager. Drivers convert their interrupts into [`InputEvent`]s.

/// Input events from buttons and the touch panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// Button pressed
    ButtonPress(Button),
    /// Button released
    ButtonRelease(Button),
    /// Finger down at panel coordinates
    TouchDown {
        /// Column in display pixels
        x: u16,
        /// Row in display pixels
        y: u16,
    },
    /// Finger lifted
    TouchUp,
}

impl InputEvent {
    /// True for a button press or touch down. Releases are still activity
    /// but never wake the screen.
    pub const fn is_press(&self) -> bool {
        matches!(self, Self::ButtonPress(_) | Self::TouchDown { .. })
    }

    /// True for touch panel events.
    pub const fn is_touch(&self) -> bool {
        matches!(self, Self::TouchDown { .. } | Self::TouchUp)
    }
}

/// Physical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Side button, also the deep-sleep wake line
    Boot,
    /// Power button
    Power,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_classification() {
        assert!(InputEvent::ButtonPress(Button::Boot).is_press());
        assert!(InputEvent::ButtonPress(Button::Power).is_press());
        assert!(InputEvent::TouchDown { x: 10, y: 20 }.is_press());
        assert!(!InputEvent::ButtonRelease(Button::Boot).is_press());
        assert!(!InputEvent::TouchUp.is_press());
    }

    #[test]
    fn touch_classification() {
        assert!(InputEvent::TouchUp.is_touch());
        assert!(!InputEvent::ButtonPress(Button::Power).is_touch());
    }
}
