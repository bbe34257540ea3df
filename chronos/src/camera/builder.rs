use chronos_core::{
    params::SensorParams,
    sleep::{Sleep, StdSleeper},
    transport::Transport,
    wavetable::Wavetables,
};
use chronos_driver::{
    calibration::{GainCalibrationConfig, OffsetCalibrationConfig},
    context::SensorContext,
    error::ChronosDriverError,
    procedure::CancelToken,
    reset::configure_memory,
    sensor::SensorModel,
    timing::{TimingCompiler, TimingConfig},
};

use super::Camera;
use crate::error::ChronosError;

/// Builder for [`Camera`].
#[derive(Debug)]
pub struct CameraBuilder {
    params: SensorParams,
    wavetables: Wavetables,
    timing: TimingConfig,
    offset_calibration: OffsetCalibrationConfig,
    gain_calibration: GainCalibrationConfig,
    flip_sleeper: Box<dyn Sleep + Send + Sync>,
}

impl CameraBuilder {
    pub(crate) fn new(wavetables: Wavetables) -> Self {
        Self {
            params: SensorParams::LUX1310,
            wavetables,
            timing: TimingConfig::default(),
            offset_calibration: OffsetCalibrationConfig::default(),
            gain_calibration: GainCalibrationConfig::default(),
            flip_sleeper: Box::new(StdSleeper),
        }
    }

    /// Sets the sensor constants. The default is [`SensorParams::LUX1310`].
    pub fn with_params(mut self, params: SensorParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the timing program configuration.
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the ADC offset calibration configuration.
    pub fn with_offset_calibration(mut self, config: OffsetCalibrationConfig) -> Self {
        self.offset_calibration = config;
        self
    }

    /// Sets the column gain calibration configuration.
    pub fn with_gain_calibration(mut self, config: GainCalibrationConfig) -> Self {
        self.gain_calibration = config;
        self
    }

    /// Sets the sleeper pacing the busy polls of a page flip. The default is [`StdSleeper`].
    pub fn with_flip_sleeper(mut self, sleeper: impl Sleep + Send + Sync + 'static) -> Self {
        self.flip_sleeper = Box::new(sleeper);
        self
    }

    /// Opens the camera.
    ///
    /// Programs the memory remapping for the installed modules. The sensor itself is left
    /// untouched; run [`Camera::start_reset`] to bring it to a known state.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn open<T: Transport>(self, mut transport: T) -> Result<Camera<T>, ChronosError> {
        let version = transport
            .timing_version()
            .map_err(ChronosDriverError::from)?;
        tracing::info!("Timing core version: {:#x}", version);
        configure_memory(&mut transport)?;

        let ctx = SensorContext::new(
            transport,
            SensorModel::new(self.params, self.wavetables),
            TimingCompiler::new(self.timing, self.flip_sleeper),
        );
        tracing::info!(
            "Camera opened: {} words of frame memory, up to {} frames",
            ctx.memory.installed_words(),
            ctx.memory.max_recording_frames()
        );
        Ok(Camera {
            ctx,
            offset_calibration: self.offset_calibration,
            gain_calibration: self.gain_calibration,
            cancel: CancelToken::new(),
            in_flight: None,
            next_task: 0,
        })
    }
}
