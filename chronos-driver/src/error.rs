use chronos_core::{geometry::GeometryError, transport::TransportError, wavetable::WavetableError};
use thiserror::Error;

/// A interface for error handling in chronos-driver.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum ChronosDriverError {
    /// Frame geometry violates the sensor limits.
    #[error("{0}")]
    InvalidGeometry(#[from] GeometryError),
    /// No wavetable can reach the requested frame period.
    #[error("Frame period ({requested} clocks) is shorter than the minimum ({minimum} clocks)")]
    TimingInfeasible {
        /// Requested frame period in timing clocks.
        requested: u32,
        /// Minimum frame period in timing clocks with the shortest wavetable.
        minimum: u32,
    },
    /// The hardware returned an unexpected value.
    #[error("Hardware fault: {0}")]
    HardwareFault(String),
    /// Error in the transport.
    #[error("{0}")]
    Transport(#[from] TransportError),
    /// Invalid wavetable catalog.
    #[error("{0}")]
    InvalidWavetableCatalog(#[from] WavetableError),
    /// Unsupported analog gain.
    #[error("Analog gain ({0}) must be one of 1, 2, 4, 8 or 16")]
    InvalidGain(u8),
    /// Recording program has too many steps.
    #[error("Recording program has {0} steps, but the sequencer supports at most {max}", max = crate::sequencer::MAX_SEQUENCER_STATES)]
    SequencerStateOverflow(usize),
    /// A recording step points at a step that does not exist.
    #[error("Recording step {index} chains to nonexistent step {next}")]
    InvalidNextState {
        /// Index of the step.
        index: usize,
        /// Requested next step.
        next: usize,
    },
    /// Recording block size is zero.
    #[error("Recording block size must be at least one frame")]
    ZeroBlockSize,
    /// Recording program does not fit in the recording region.
    #[error("Recording region ({required} words) exceeds available memory ({available} words)")]
    RecordingRegionOverflow {
        /// Words required by the program.
        required: u64,
        /// Words available in the recording region.
        available: u64,
    },
}
