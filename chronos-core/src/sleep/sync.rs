use core::time::Duration;

pub use spin_sleep::{SpinSleeper, SpinStrategy};

/// A trait for sleep operations.
pub trait Sleep: core::fmt::Debug {
    /// Sleep for the specified duration.
    fn sleep(&self, duration: Duration);
}

impl Sleep for Box<dyn Sleep> {
    fn sleep(&self, duration: Duration) {
        self.as_ref().sleep(duration);
    }
}

/// A sleeper that uses [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StdSleeper;

impl Sleep for StdSleeper {
    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        std::thread::sleep(duration);
    }
}

impl Sleep for SpinSleeper {
    fn sleep(&self, duration: Duration) {
        SpinSleeper::sleep(*self, duration);
    }
}

/// A sleeper that returns immediately and records nothing.
///
/// Useful when the hardware behind the transport is simulated and wall time is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoSleeper;

impl Sleep for NoSleeper {
    fn sleep(&self, _: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(Duration::from_millis(10))]
    #[case(Duration::ZERO)]
    fn std_sleeper(#[case] duration: Duration) {
        let start = std::time::Instant::now();
        StdSleeper.sleep(duration);
        assert!(duration <= start.elapsed());
    }

    #[rstest::rstest]
    #[case(Duration::from_millis(10))]
    #[case(Duration::ZERO)]
    fn spin_sleeper(#[case] duration: Duration) {
        let start = std::time::Instant::now();
        Sleep::sleep(&SpinSleeper::default(), duration);
        assert!(duration <= start.elapsed());
    }

    #[test]
    fn box_sleeper() {
        let sleeper: Box<dyn Sleep> = Box::new(StdSleeper);
        let start = std::time::Instant::now();
        sleeper.sleep(Duration::from_millis(10));
        assert!(Duration::from_millis(10) <= start.elapsed());
    }
}
