use core::time::Duration;

use num::rational::Ratio;

/// Exact scale between the sensor clock and the timing engine clock.
///
/// The two domains run at unrelated frequencies, so conversions are done on a reduced
/// rational to keep long accumulations from drifting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockScale {
    sensor_hz: u64,
    timing_hz: u64,
    ratio: Ratio<u64>,
}

impl ClockScale {
    /// Creates a new [`ClockScale`].
    #[must_use]
    pub fn new(sensor_hz: u32, timing_hz: u32) -> Self {
        Self {
            sensor_hz: sensor_hz as u64,
            timing_hz: timing_hz as u64,
            ratio: Ratio::new(timing_hz as u64, sensor_hz as u64),
        }
    }

    /// Converts sensor clocks into timing clocks, rounding down.
    #[must_use]
    pub fn sensor_to_timing(&self, clocks: u64) -> u64 {
        (self.ratio * clocks).to_integer()
    }

    /// Converts timing clocks into sensor clocks, rounding down.
    #[must_use]
    pub fn timing_to_sensor(&self, clocks: u64) -> u64 {
        (self.ratio.recip() * clocks).to_integer()
    }

    /// Converts timing clocks into wall time.
    #[must_use]
    pub fn timing_to_duration(&self, clocks: u64) -> Duration {
        Duration::from_nanos((clocks as u128 * 1_000_000_000 / self.timing_hz as u128) as u64)
    }

    /// Converts wall time into timing clocks, rounding down.
    #[must_use]
    pub fn duration_to_timing(&self, duration: Duration) -> u64 {
        (duration.as_nanos() * self.timing_hz as u128 / 1_000_000_000) as u64
    }

    /// Sensor clock frequency in Hz.
    #[must_use]
    pub const fn sensor_hz(&self) -> u64 {
        self.sensor_hz
    }

    /// Timing clock frequency in Hz.
    #[must_use]
    pub const fn timing_hz(&self) -> u64 {
        self.timing_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(0, 0)]
    #[case(100, 90)]
    #[case(111, 100)]
    #[case(1_000_000_000, 900_000_000)]
    #[case(1_111_111_111, 1_000_000_000)]
    fn sensor_to_timing(#[case] expect: u64, #[case] clocks: u64) {
        assert_eq!(expect, ClockScale::new(90_000_000, 100_000_000).sensor_to_timing(clocks));
    }

    #[rstest::rstest]
    #[case(90, 100)]
    #[case(900, 1000)]
    #[case(0, 1)]
    fn timing_to_sensor(#[case] expect: u64, #[case] clocks: u64) {
        assert_eq!(expect, ClockScale::new(90_000_000, 100_000_000).timing_to_sensor(clocks));
    }

    #[test]
    fn no_drift() {
        let scale = ClockScale::new(90_000_000, 100_000_000);
        let accumulated: u64 = (0..9).map(|_| scale.sensor_to_timing(9)).sum();
        assert_eq!(90, accumulated);
        assert_eq!(90, scale.sensor_to_timing(81));
    }

    #[rstest::rstest]
    #[case(Duration::from_millis(10), 1_000_000)]
    #[case(Duration::from_nanos(10), 1)]
    #[case(Duration::ZERO, 0)]
    fn duration(#[case] expect: Duration, #[case] clocks: u64) {
        let scale = ClockScale::new(90_000_000, 100_000_000);
        assert_eq!(expect, scale.timing_to_duration(clocks));
        assert_eq!(clocks, scale.duration_to_timing(expect));
    }
}
