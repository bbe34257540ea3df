use chronos_core::timing::{Signals, TimingProgram, WaitCondition};

use crate::warning::Warning;

use super::TimingConfig;

/// Length of the charge transfer pulse closing an exposure, in timing clocks.
const TXN_PULSE: u32 = 0x31;
/// Anti-blooming hold at the start of an HDR exposure, in timing clocks.
const HDR_ABN_HOLD: u32 = 50;
/// PRSTN lead before the first knee.
const HDR_PRSTN_LEAD: u32 = 15;
/// Width of the knee transfer pulse.
const HDR_KNEE_PULSE: u32 = 45;
/// PRSTN tail after the knee.
const HDR_PRSTN_TAIL: u32 = 60;

/// An exposure program of the timing engine, with its parameters in timing clocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimingMode {
    /// Free-running frames.
    Standard {
        /// Frame period.
        frame: u32,
        /// Integration time.
        integration: u32,
    },
    /// One frame per frame trigger.
    TriggerFrames {
        /// Frame period.
        frame: u32,
        /// Integration time.
        integration: u32,
    },
    /// A burst of frames per frame trigger.
    TriggerNFrames {
        /// Frame period.
        frame: u32,
        /// Integration time.
        integration: u32,
        /// Frames per trigger.
        count: u32,
    },
    /// Exposure follows the level of the shutter input.
    ShutterGating,
    /// Dual-slope high dynamic range exposure.
    Hdr2Slope {
        /// Frame period.
        frame: u32,
        /// First slope.
        integration1: u32,
        /// Second slope.
        integration2: u32,
    },
    /// Triple-slope high dynamic range exposure.
    Hdr3Slope {
        /// Frame period.
        frame: u32,
        /// First slope.
        integration1: u32,
        /// Second slope.
        integration2: u32,
        /// Third slope.
        integration3: u32,
    },
}

impl Default for TimingMode {
    fn default() -> Self {
        Self::Standard {
            frame: 90000,
            integration: 85000,
        }
    }
}

impl TimingMode {
    /// Frame period, if the mode has a fixed one.
    #[must_use]
    pub const fn frame_clocks(&self) -> Option<u32> {
        match *self {
            Self::Standard { frame, .. }
            | Self::TriggerFrames { frame, .. }
            | Self::TriggerNFrames { frame, .. }
            | Self::Hdr2Slope { frame, .. }
            | Self::Hdr3Slope { frame, .. } => Some(frame),
            Self::ShutterGating => None,
        }
    }

    /// Total integration time, if the mode has a fixed one.
    #[must_use]
    pub const fn integration_clocks(&self) -> Option<u32> {
        match *self {
            Self::Standard { integration, .. }
            | Self::TriggerFrames { integration, .. }
            | Self::TriggerNFrames { integration, .. } => Some(integration),
            Self::Hdr2Slope {
                integration1,
                integration2,
                ..
            } => Some(integration1.saturating_add(integration2)),
            Self::Hdr3Slope {
                integration1,
                integration2,
                integration3,
                ..
            } => Some(
                integration1
                    .saturating_add(integration2)
                    .saturating_add(integration3),
            ),
            Self::ShutterGating => None,
        }
    }

    /// Returns the mode with another frame period. Shutter gating has none and is unchanged.
    #[must_use]
    pub const fn with_frame(self, frame: u32) -> Self {
        match self {
            Self::Standard { integration, .. } => Self::Standard { frame, integration },
            Self::TriggerFrames { integration, .. } => Self::TriggerFrames { frame, integration },
            Self::TriggerNFrames {
                integration, count, ..
            } => Self::TriggerNFrames {
                frame,
                integration,
                count,
            },
            Self::Hdr2Slope {
                integration1,
                integration2,
                ..
            } => Self::Hdr2Slope {
                frame,
                integration1,
                integration2,
            },
            Self::Hdr3Slope {
                integration1,
                integration2,
                integration3,
                ..
            } => Self::Hdr3Slope {
                frame,
                integration1,
                integration2,
                integration3,
            },
            Self::ShutterGating => Self::ShutterGating,
        }
    }

    /// Returns the mode with another integration time.
    ///
    /// Shutter gating and the HDR modes define their exposure by other means and are unchanged.
    #[must_use]
    pub const fn with_integration(self, integration: u32) -> Self {
        match self {
            Self::Standard { frame, .. } => Self::Standard { frame, integration },
            Self::TriggerFrames { frame, .. } => Self::TriggerFrames { frame, integration },
            Self::TriggerNFrames { frame, count, .. } => Self::TriggerNFrames {
                frame,
                integration,
                count,
            },
            mode => mode,
        }
    }

    /// Returns `true` if the shutter input starts frames once the program is running.
    #[must_use]
    pub const fn triggers_from_shutter(&self) -> bool {
        matches!(self, Self::TriggerFrames { .. } | Self::ShutterGating)
    }

    /// Fits the exposure into the frame period.
    ///
    /// A single integration that does not fit is reduced to 95% of the frame. HDR slopes
    /// that do not fit are scaled proportionally into the same budget.
    pub fn clamp(self, t2_time: u32) -> (Self, Option<Warning>) {
        let shrink = |frame: u32| (frame as u64 * 95 / 100) as u32;
        match self {
            Self::Standard { frame, integration } if frame <= integration => {
                let applied = shrink(frame);
                (
                    Self::Standard {
                        frame,
                        integration: applied,
                    },
                    Some(Warning::TimingClamped {
                        requested: integration,
                        applied,
                    }),
                )
            }
            Self::TriggerFrames { frame, integration } if frame <= integration => {
                let applied = shrink(frame);
                (
                    Self::TriggerFrames {
                        frame,
                        integration: applied,
                    },
                    Some(Warning::TimingClamped {
                        requested: integration,
                        applied,
                    }),
                )
            }
            Self::TriggerNFrames {
                frame,
                integration,
                count,
            } if frame <= integration => {
                let applied = shrink(frame);
                (
                    Self::TriggerNFrames {
                        frame,
                        integration: applied,
                        count,
                    },
                    Some(Warning::TimingClamped {
                        requested: integration,
                        applied,
                    }),
                )
            }
            Self::Hdr2Slope {
                frame,
                integration1,
                integration2,
            } => match scale_slopes(frame, t2_time, [integration1, integration2]) {
                Some(([integration1, integration2], warning)) => (
                    Self::Hdr2Slope {
                        frame,
                        integration1,
                        integration2,
                    },
                    Some(warning),
                ),
                None => (self, None),
            },
            Self::Hdr3Slope {
                frame,
                integration1,
                integration2,
                integration3,
            } => match scale_slopes(frame, t2_time, [integration1, integration2, integration3]) {
                Some(([integration1, integration2, integration3], warning)) => (
                    Self::Hdr3Slope {
                        frame,
                        integration1,
                        integration2,
                        integration3,
                    },
                    Some(warning),
                ),
                None => (self, None),
            },
            mode => (mode, None),
        }
    }

    /// Generates the micro-op sequence of this mode.
    ///
    /// `n_lines_wait` enables the wait-for-n-lines instruction supported by newer timing cores.
    #[must_use]
    pub fn program(&self, config: &TimingConfig, n_lines_wait: bool) -> TimingProgram {
        let io = if config.disable_io_drive {
            Signals::empty()
        } else {
            Signals::IODRIVE
        };
        let program = TimingProgram::new().hold(Signals::empty(), config.t2_time);
        match *self {
            Self::Standard { frame, integration } => {
                let program = if config.disable_frame_trig {
                    program
                        .wait(Signals::ABN, WaitCondition::Inactive)
                        .wait(Signals::ABN, WaitCondition::Active)
                } else {
                    program
                };
                exposure(program, frame, integration, io).restart()
            }
            Self::TriggerFrames { frame, integration } => {
                exposure(program.wait(Signals::ABN, WaitCondition::Active), frame, integration, io)
                    .restart()
            }
            Self::TriggerNFrames {
                frame,
                integration,
                count,
            } => (0..count)
                .fold(
                    program.wait(Signals::ABN, WaitCondition::Active),
                    |program, _| exposure(program, frame, integration, io),
                )
                .restart(),
            Self::ShutterGating => {
                let program = program
                    .wait(Signals::ABN, WaitCondition::Active)
                    .wait(Signals::IODRIVE, WaitCondition::Inactive)
                    .hold(Signals::TXN, TXN_PULSE);
                let program = if n_lines_wait {
                    program.wait(Signals::TXN, WaitCondition::NLines)
                } else {
                    program
                };
                program.restart()
            }
            Self::Hdr2Slope {
                integration1,
                integration2,
                ..
            } => program
                .wait(Signals::ABN, WaitCondition::Inactive)
                .wait(Signals::ABN, WaitCondition::Active)
                .hold(Signals::ABN, HDR_ABN_HOLD)
                .hold(
                    Signals::empty(),
                    integration1.saturating_sub(HDR_PRSTN_LEAD + HDR_KNEE_PULSE),
                )
                .hold(Signals::PRSTN, HDR_PRSTN_LEAD)
                .hold(Signals::PRSTN | Signals::TXN, HDR_KNEE_PULSE)
                .hold(Signals::PRSTN, HDR_PRSTN_TAIL)
                .hold(Signals::TXN, integration2.saturating_sub(HDR_PRSTN_LEAD))
                .restart(),
            Self::Hdr3Slope {
                integration1,
                integration2,
                integration3,
                ..
            } => program
                .hold(Signals::ABN, HDR_ABN_HOLD)
                .hold(
                    Signals::empty(),
                    integration1.saturating_sub(HDR_PRSTN_LEAD + HDR_KNEE_PULSE),
                )
                .hold(Signals::PRSTN, HDR_PRSTN_LEAD)
                .hold(Signals::PRSTN | Signals::TXN, HDR_KNEE_PULSE)
                .hold(Signals::PRSTN, HDR_PRSTN_TAIL)
                .hold(
                    Signals::PRSTN | Signals::TXN,
                    integration2.saturating_sub(HDR_PRSTN_TAIL),
                )
                .hold(Signals::PRSTN, HDR_PRSTN_LEAD)
                .hold(Signals::TXN, integration3.saturating_sub(HDR_PRSTN_LEAD))
                .restart(),
        }
    }

    pub(crate) const fn hdr_knee_width() -> u32 {
        HDR_PRSTN_LEAD + HDR_KNEE_PULSE + HDR_PRSTN_TAIL
    }

    pub(crate) const fn hdr_abn_hold() -> u32 {
        HDR_ABN_HOLD
    }
}

fn exposure(program: TimingProgram, frame: u32, integration: u32, io: Signals) -> TimingProgram {
    program
        .hold(Signals::ABN, frame.saturating_sub(integration))
        .hold(io, integration)
        .hold(io | Signals::TXN, TXN_PULSE)
}

fn scale_slopes<const N: usize>(
    frame: u32,
    t2_time: u32,
    slopes: [u32; N],
) -> Option<([u32; N], Warning)> {
    let requested = slopes.iter().map(|&s| s as u64).sum::<u64>();
    let overhead = t2_time as u64 + HDR_ABN_HOLD as u64;
    if requested + overhead <= frame as u64 {
        return None;
    }
    let budget = (frame as u64 * 95 / 100).saturating_sub(overhead);
    let scaled = slopes.map(|s| (s as u64 * budget / requested.max(1)) as u32);
    let applied = scaled.iter().map(|&s| s as u64).sum::<u64>();
    tracing::warn!(
        "HDR slopes ({} clocks) exceed the frame period ({} clocks); scaled to {} clocks",
        requested,
        frame,
        applied
    );
    Some((
        scaled,
        Warning::TimingClamped {
            requested: requested.min(u32::MAX as u64) as u32,
            applied: applied as u32,
        },
    ))
}
