//! Monotonic time source
//!
//! Every inactivity threshold is computed from a microsecond timestamp that
//! never goes backwards. Hardware builds read the Embassy time driver; tests
//! inject [`crate::mocks::MockClock`] and advance it by hand.

/// Monotonic microsecond clock.
pub trait MonotonicClock {
    /// Microseconds since an arbitrary, fixed epoch (usually boot).
    fn now_us(&self) -> u64;
}

/// [`MonotonicClock`] backed by the Embassy time driver.
///
/// On STM32 this is the TIM2 time driver; on the host it is the
/// `embassy-time/std` driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbassyClock;

impl MonotonicClock for EmbassyClock {
    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

impl<C: MonotonicClock> MonotonicClock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embassy_clock_never_goes_backwards() {
        let clock = EmbassyClock;
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }

    #[test]
    fn reference_forwards_to_inner_clock() {
        let clock = EmbassyClock;
        let by_ref = &clock;
        assert!(by_ref.now_us() >= clock.now_us().saturating_sub(1_000_000));
    }
}
