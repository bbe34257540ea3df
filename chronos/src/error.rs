use chronos_core::transport::TransportError;
use chronos_driver::error::ChronosDriverError;
use thiserror::Error;

/// A interface for error handling in chronos.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum ChronosError {
    /// Error in the driver.
    #[error("{0}")]
    Driver(#[from] ChronosDriverError),
    /// Another procedure is in flight.
    #[error("Another procedure is in progress")]
    Busy,
    /// The procedure was cancelled before it finished.
    #[error("Procedure was cancelled")]
    Cancelled,
    /// The sequencer is not recording.
    #[error("Sequencer is not recording")]
    NotRecording,
}

impl From<TransportError> for ChronosError {
    fn from(e: TransportError) -> Self {
        Self::Driver(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("Another procedure is in progress", ChronosError::Busy)]
    #[case("Procedure was cancelled", ChronosError::Cancelled)]
    #[case(
        "Analog gain (3) must be one of 1, 2, 4, 8 or 16",
        ChronosError::Driver(ChronosDriverError::InvalidGain(3))
    )]
    #[case("broken", TransportError::new("broken".to_string()).into())]
    fn display(#[case] expect: &str, #[case] err: ChronosError) {
        assert_eq!(expect, err.to_string());
    }
}
