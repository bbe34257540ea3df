/// A non-fatal condition reported alongside the result of an operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Warning {
    /// Integration time did not fit in the frame and was reduced.
    TimingClamped {
        /// Requested integration time in timing clocks.
        requested: u32,
        /// Applied integration time in timing clocks.
        applied: u32,
    },
    /// The timing engine stayed busy past the flip timeout and the program page was forced.
    FlipForced {
        /// `true` if the readout window changed while the flip was pending.
        geometry_changed: bool,
    },
    /// A channel failed the gain calibration sanity check; unity gain was written to every column.
    GainCalibrationRange {
        /// First channel that failed.
        channel: usize,
    },
}

/// The value of a successful operation together with its [`Warning`]s.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct Report<T> {
    /// Result of the operation.
    pub value: T,
    /// Non-fatal conditions raised along the way.
    pub warnings: Vec<Warning>,
}

impl<T> Report<T> {
    /// Creates a report with no warnings.
    pub const fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Creates a report with warnings.
    pub const fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    /// Transforms the value, keeping the warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Report<U> {
        Report {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Moves the warnings into `sink` and returns the value.
    pub fn into_value(self, sink: &mut Vec<Warning>) -> T {
        sink.extend(self.warnings);
        self.value
    }

    /// Returns `true` if there is no warning.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report() {
        let report = Report::with_warnings(
            1,
            vec![Warning::FlipForced {
                geometry_changed: false,
            }],
        );
        assert!(!report.is_clean());

        let mut sink = vec![Warning::GainCalibrationRange { channel: 3 }];
        let value = report.map(|v| v + 1).into_value(&mut sink);
        assert_eq!(2, value);
        assert_eq!(
            vec![
                Warning::GainCalibrationRange { channel: 3 },
                Warning::FlipForced {
                    geometry_changed: false
                }
            ],
            sink
        );
        assert!(Report::new(()).is_clean());
    }
}
