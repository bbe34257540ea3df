use super::{Signals, TimingMicroOp, WaitCondition};

/// An ordered sequence of [`TimingMicroOp`]s terminated by a restart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimingProgram {
    ops: Vec<TimingMicroOp>,
}

impl TimingProgram {
    /// Creates an empty program.
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Appends a hold, splitting it across several instructions if it does not fit in one.
    #[must_use]
    pub fn hold(mut self, signals: Signals, clocks: u32) -> Self {
        let mut remaining = clocks.max(1);
        while remaining > TimingMicroOp::MAX_HOLD {
            self.ops.push(TimingMicroOp::hold(signals, TimingMicroOp::MAX_HOLD));
            remaining -= TimingMicroOp::MAX_HOLD;
        }
        self.ops.push(TimingMicroOp::hold(signals, remaining));
        self
    }

    /// Appends a wait.
    #[must_use]
    pub fn wait(mut self, signals: Signals, condition: WaitCondition) -> Self {
        self.ops.push(TimingMicroOp::wait(signals, condition));
        self
    }

    /// Appends the terminating restart.
    #[must_use]
    pub fn restart(mut self) -> Self {
        self.ops.push(TimingMicroOp::restart());
        self
    }

    /// Returns the instructions.
    #[must_use]
    pub fn ops(&self) -> &[TimingMicroOp] {
        &self.ops
    }

    /// Returns `true` if the program ends with a restart.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.ops.last().is_some_and(TimingMicroOp::is_restart)
    }

    /// Total hold time of the program in timing clocks. Waits contribute nothing.
    #[must_use]
    pub fn hold_clocks(&self) -> u64 {
        self.ops
            .iter()
            .filter_map(TimingMicroOp::hold_clocks)
            .map(u64::from)
            .sum()
    }
}

impl IntoIterator for TimingProgram {
    type Item = TimingMicroOp;
    type IntoIter = std::vec::IntoIter<TimingMicroOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}
