use bitflags::bitflags;
use zerocopy::{Immutable, IntoBytes};

bitflags! {
    /// Sensor control lines driven by a [`TimingMicroOp`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Signals: u8 {
        /// Anti-blooming.
        const ABN     = 1 << 0;
        /// Secondary anti-blooming.
        const ABN2    = 1 << 1;
        /// Photodiode reset.
        const PRSTN   = 1 << 2;
        /// Charge transfer.
        const TXN     = 1 << 3;
        /// External IO drive.
        const IODRIVE = 1 << 4;
    }
}

/// A condition on which a [`TimingMicroOp`] stalls the timing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum WaitCondition {
    /// Wait until the frame trigger becomes active.
    Active = 0xFF_FFFF,
    /// Wait until the frame trigger becomes inactive.
    Inactive = 0xFF_FFFE,
    /// Wait until the programmed number of lines have been read out.
    NLines = 0xFF_FFFC,
}

impl WaitCondition {
    const fn from_operand(operand: u32) -> Option<Self> {
        match operand {
            0xFF_FFFF => Some(Self::Active),
            0xFF_FFFE => Some(Self::Inactive),
            0xFF_FFFC => Some(Self::NLines),
            _ => None,
        }
    }
}

/// A single instruction of the timing engine.
///
/// The upper byte selects the signals to assert and the lower 24 bits hold either a
/// hold time in timing clocks or a sentinel. An operand of zero restarts the program.
#[bitfield_struct::bitfield(u32)]
#[derive(IntoBytes, Immutable, PartialEq, Eq, Hash)]
pub struct TimingMicroOp {
    #[bits(24)]
    operand: u32,
    #[bits(8)]
    signal_bits: u8,
}

impl TimingMicroOp {
    /// The largest hold time that fits in a single instruction.
    pub const MAX_HOLD: u32 = 0xFF_FFFB;
    /// Operand value that restarts the program.
    pub const RESTART: u32 = 0;

    /// Holds `signals` for `clocks` timing clocks.
    ///
    /// `clocks` is saturated into `1..=MAX_HOLD` so a hold never decodes as a sentinel.
    #[must_use]
    pub const fn hold(signals: Signals, clocks: u32) -> Self {
        let clocks = if clocks == 0 {
            1
        } else if clocks > Self::MAX_HOLD {
            Self::MAX_HOLD
        } else {
            clocks
        };
        Self::new()
            .with_operand(clocks)
            .with_signal_bits(signals.bits())
    }

    /// Holds `signals` until `condition` is met.
    #[must_use]
    pub const fn wait(signals: Signals, condition: WaitCondition) -> Self {
        Self::new()
            .with_operand(condition as u32)
            .with_signal_bits(signals.bits())
    }

    /// Jumps back to the start of the program.
    #[must_use]
    pub const fn restart() -> Self {
        Self::new().with_operand(Self::RESTART)
    }

    /// Signals asserted by this instruction.
    #[must_use]
    pub const fn signals(&self) -> Signals {
        Signals::from_bits_retain(self.signal_bits())
    }

    /// Returns `true` if this instruction restarts the program.
    #[must_use]
    pub const fn is_restart(&self) -> bool {
        self.operand() == Self::RESTART
    }

    /// Returns the wait condition, if this instruction is a wait.
    #[must_use]
    pub const fn wait_condition(&self) -> Option<WaitCondition> {
        WaitCondition::from_operand(self.operand())
    }

    /// Returns the hold time in timing clocks, if this instruction is a hold.
    #[must_use]
    pub const fn hold_clocks(&self) -> Option<u32> {
        match self.operand() {
            Self::RESTART => None,
            v if v > Self::MAX_HOLD => None,
            v => Some(v),
        }
    }
}
