pub use crate::{
    camera::{Camera, CameraBuilder, Task},
    error::ChronosError,
};

#[cfg(feature = "transport-nop")]
pub use crate::transport::Nop;

#[cfg(feature = "async")]
pub use chronos_core::sleep::{AsyncSleep, TokioSleeper};
pub use chronos_core::{
    geometry::FrameGeometry,
    params::SensorParams,
    sleep::{NoSleeper, Sleep, SpinSleeper, StdSleeper},
    transport::Transport,
};
pub use chronos_driver::{
    calibration::{GainCalibrationConfig, OffsetCalibrationConfig},
    error::ChronosDriverError,
    procedure::{CancelToken, Step},
    sequencer::{RecordingProgramStep, RecordingRequest, RecordingSegment, TerminationFlags},
    timing::{FlipConfig, TimingConfig, TimingMode},
    warning::{Report, Warning},
};
