use core::time::Duration;

use chronos_core::{
    calibration::CalibrationState, geometry::FrameGeometry, memory::MemoryRegionMap,
    transport::Transport,
};

use crate::{
    error::ChronosDriverError,
    sensor::SensorModel,
    timing::{TimingCompiler, TimingMode},
    warning::Report,
};

/// Everything a [`Procedure`](crate::procedure::Procedure) may touch: the transport and the
/// driver state built on it.
#[derive(Debug)]
pub struct SensorContext<T: Transport> {
    /// Hardware access.
    pub transport: T,
    /// Sensor model.
    pub sensor: SensorModel,
    /// Timing program compiler.
    pub timing: TimingCompiler,
    /// Coefficients currently loaded in the hardware.
    pub calibration: CalibrationState,
    /// Frame memory layout.
    pub memory: MemoryRegionMap,
    /// Current readout window.
    pub geometry: FrameGeometry,
}

impl<T: Transport> SensorContext<T> {
    /// Creates a new context with the full-frame geometry and unity calibration.
    ///
    /// The installed memory is probed once here.
    pub fn new(mut transport: T, sensor: SensorModel, timing: TimingCompiler) -> Self {
        let geometry = FrameGeometry::full_frame(&sensor.params().limits);
        let memory = MemoryRegionMap::new(transport.installed_memory_words(), &geometry);
        let calibration = CalibrationState::new(sensor.params());
        Self {
            transport,
            sensor,
            timing,
            calibration,
            memory,
            geometry,
        }
    }

    /// Current frame period in timing clocks, falling back to the minimum for the geometry.
    #[must_use]
    pub fn frame_clocks(&self) -> u32 {
        self.timing
            .mode()
            .frame_clocks()
            .unwrap_or_else(|| self.sensor.min_frame_clocks(&self.geometry, None))
    }

    /// Duration of `periods` frame periods.
    #[must_use]
    pub fn frame_periods(&self, periods: u32) -> Duration {
        self.sensor
            .params()
            .clock_scale()
            .timing_to_duration(self.frame_clocks() as u64 * periods as u64)
    }

    /// Applies a readout window with its frame period and exposure.
    ///
    /// The frame period defaults to the minimum for `geometry` and the exposure to the
    /// longest one that fits. Nothing is written if the geometry or period is rejected.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn configure(
        &mut self,
        geometry: FrameGeometry,
        frame_period: Option<u32>,
        exposure: Option<u32>,
    ) -> Result<Report<FrameGeometry>, ChronosDriverError> {
        let geometry = self.sensor.validate(geometry)?;
        let period = frame_period.unwrap_or_else(|| self.sensor.min_frame_clocks(&geometry, None));
        self.sensor.select_wavetable(&geometry, period)?;
        let exposure = exposure.unwrap_or_else(|| self.sensor.exposure_range(period).1);

        let mut warnings = Vec::new();
        self.timing
            .stop_timing(&mut self.transport)?
            .into_value(&mut warnings);
        self.sensor
            .apply_readout_window(&mut self.transport, &geometry)?;
        self.timing.mark_geometry_changed();
        self.sensor
            .update_wavetable(&mut self.transport, &geometry, period, false)?;
        self.geometry = geometry;
        self.memory.set_geometry(&geometry);

        let mode = self.timing.mode().with_frame(period).with_integration(exposure);
        let mode = self
            .timing
            .program(&mut self.transport, mode)?
            .into_value(&mut warnings);
        tracing::info!(
            "Configured {}x{}+{}+{} ({} dark rows): {:?}",
            geometry.h_res,
            geometry.v_res,
            geometry.h_offset,
            geometry.v_offset,
            geometry.v_dark_rows,
            mode
        );
        Ok(Report::with_warnings(geometry, warnings))
    }

    /// Changes the frame period, reloading the wavetable for it.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_frame_period(&mut self, clocks: u32) -> Result<Report<TimingMode>, ChronosDriverError> {
        let geometry = self.geometry;
        self.sensor.select_wavetable(&geometry, clocks)?;
        let mut warnings = Vec::new();
        self.timing
            .stop_timing(&mut self.transport)?
            .into_value(&mut warnings);
        self.sensor
            .update_wavetable(&mut self.transport, &geometry, clocks, false)?;
        let mode = self
            .timing
            .set_frame_time(&mut self.transport, clocks)?
            .into_value(&mut warnings);
        Ok(Report::with_warnings(mode, warnings))
    }

    /// Changes the exposure of the current timing mode.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_exposure(&mut self, clocks: u32) -> Result<Report<TimingMode>, ChronosDriverError> {
        self.timing.set_integration_time(&mut self.transport, clocks)
    }

    /// Sets the analog gain.
    pub fn set_gain(&mut self, gain: u8) -> Result<(), ChronosDriverError> {
        self.sensor.set_gain(&mut self.transport, gain)
    }
}
