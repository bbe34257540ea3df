mod builder;
mod task;

use chronos_core::{
    calibration::CalibrationState, geometry::FrameGeometry, memory::MemoryRegionMap,
    sleep::Sleep, transport::Transport, wavetable::Wavetables,
};
use chronos_driver::{
    calibration::{AnalogCalibration, BlackCalibration, GainCalibrationConfig, OffsetCalibrationConfig},
    context::SensorContext,
    procedure::{CancelToken, Procedure, Step},
    reset::SensorReset,
    sequencer::{self, RecordingRequest, StartRecording},
    timing::TimingMode,
    warning::Report,
};
use derive_more::Deref;

use crate::error::ChronosError;

pub use builder::CameraBuilder;
pub use task::Task;
use task::Lease;

/// A camera: the sensor driver state on top of a [`Transport`].
///
/// At most one procedure is in flight at a time. While a [`Task`] is in flight every other
/// operation that touches the sensor fails with [`ChronosError::Busy`].
///
/// The driver state is readable through [`Deref`](core::ops::Deref).
#[derive(Deref)]
pub struct Camera<T: Transport> {
    #[deref]
    ctx: SensorContext<T>,
    offset_calibration: OffsetCalibrationConfig,
    gain_calibration: GainCalibrationConfig,
    cancel: CancelToken,
    in_flight: Option<Lease>,
    next_task: u64,
}

impl Camera<Box<dyn Transport>> {
    /// Returns a [`CameraBuilder`] for a sensor with the given wavetable catalog.
    #[must_use]
    pub fn builder(wavetables: Wavetables) -> CameraBuilder {
        CameraBuilder::new(wavetables)
    }
}

impl<T: Transport> Camera<T> {
    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.ctx.transport
    }

    /// Coefficients currently loaded in the hardware.
    pub fn calibration_state(&self) -> &CalibrationState {
        &self.ctx.calibration
    }

    /// Frame memory layout for the current geometry.
    pub fn memory_map(&self) -> &MemoryRegionMap {
        &self.ctx.memory
    }

    /// Current timing mode.
    pub fn timing_mode(&self) -> TimingMode {
        self.ctx.timing.mode()
    }

    /// Returns `true` while a procedure is in flight.
    ///
    /// Dropping the [`Task`] of the procedure ends it.
    pub fn is_busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|lease| !lease.is_released())
    }

    /// Returns a handle that cancels the in-flight procedure from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Requests the in-flight procedure to stop at its next step.
    ///
    /// Hardware is left as the last completed step left it.
    pub fn cancel(&self) {
        if self.is_busy() {
            tracing::info!("Cancellation requested");
        }
        self.cancel.cancel();
    }

    fn ensure_idle(&mut self) -> Result<(), ChronosError> {
        if self.is_busy() {
            return Err(ChronosError::Busy);
        }
        if self.in_flight.take().is_some() {
            tracing::info!("Task dropped before completion");
            self.cancel.reset();
        }
        Ok(())
    }

    fn start<P: Procedure<T>>(
        &mut self,
        name: &'static str,
        procedure: P,
    ) -> Result<Task<P>, ChronosError> {
        self.ensure_idle()?;
        self.cancel.reset();
        let id = self.next_task;
        self.next_task += 1;
        let (task, lease) = Task::new(id, name, procedure);
        self.in_flight = Some(lease);
        tracing::info!("Starting {}", name);
        Ok(task)
    }

    fn finish(&mut self) {
        self.in_flight = None;
        self.cancel.reset();
    }

    /// Applies a readout window with its frame period and exposure.
    ///
    /// The frame period defaults to the minimum for `geometry` and the exposure to the
    /// longest one that fits. Nothing is written if the request is rejected.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn configure(
        &mut self,
        geometry: FrameGeometry,
        frame_period: Option<u32>,
        exposure: Option<u32>,
    ) -> Result<Report<FrameGeometry>, ChronosError> {
        self.ensure_idle()?;
        Ok(self.ctx.configure(geometry, frame_period, exposure)?)
    }

    /// Changes the frame period in timing clocks.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_frame_period(&mut self, clocks: u32) -> Result<Report<TimingMode>, ChronosError> {
        self.ensure_idle()?;
        Ok(self.ctx.set_frame_period(clocks)?)
    }

    /// Changes the exposure in timing clocks.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_exposure(&mut self, clocks: u32) -> Result<Report<TimingMode>, ChronosError> {
        self.ensure_idle()?;
        Ok(self.ctx.set_exposure(clocks)?)
    }

    /// Sets the analog gain. Supported gains are 1, 2, 4, 8 and 16.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_gain(&mut self, gain: u8) -> Result<(), ChronosError> {
        self.ensure_idle()?;
        Ok(self.ctx.set_gain(gain)?)
    }

    /// Starts the power-up sequence of the sensor.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn start_reset(&mut self) -> Result<Task<SensorReset>, ChronosError> {
        self.start("sensor reset", SensorReset::new())
    }

    /// Starts the ADC offset and column gain calibration.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn start_analog_calibration(&mut self) -> Result<Task<AnalogCalibration>, ChronosError> {
        let procedure = AnalogCalibration::new(self.offset_calibration, self.gain_calibration);
        self.start("analog calibration", procedure)
    }

    /// Starts the fixed-pattern noise calibration over `num_frames` frames of a covered
    /// sensor. The task yields the software gain that restores full scale.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn start_black_calibration(
        &mut self,
        num_frames: u32,
    ) -> Result<Task<BlackCalibration>, ChronosError> {
        self.start("black calibration", BlackCalibration::new(num_frames))
    }

    /// Builds a recording program for the current geometry and starts the sequencer.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn build_and_start_recording(
        &mut self,
        request: RecordingRequest,
    ) -> Result<Task<StartRecording>, ChronosError> {
        self.start("recording", StartRecording::new(request))
    }

    /// Returns `true` if the sequencer is recording.
    pub fn is_recording(&mut self) -> Result<bool, ChronosError> {
        Ok(sequencer::is_recording(&mut self.ctx.transport)?)
    }

    /// Ends the recording in progress.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn stop_recording(&mut self) -> Result<(), ChronosError> {
        self.ensure_idle()?;
        if !sequencer::is_recording(&mut self.ctx.transport)? {
            return Err(ChronosError::NotRecording);
        }
        Ok(sequencer::stop_recording(&mut self.ctx.transport)?)
    }

    /// Advances a task by one step.
    ///
    /// Cancellation is checked before the step. A task that is no longer in flight because
    /// it finished, failed or was cancelled returns [`ChronosError::Cancelled`].
    pub fn step<P: Procedure<T>>(
        &mut self,
        task: &mut Task<P>,
    ) -> Result<Step<P::Output>, ChronosError> {
        match &self.in_flight {
            Some(lease) if lease.id == task.id => {}
            Some(lease) if !lease.is_released() => return Err(ChronosError::Busy),
            _ => return Err(ChronosError::Cancelled),
        }
        if self.cancel.is_cancelled() {
            tracing::info!("{} cancelled", task.name());
            self.finish();
            return Err(ChronosError::Cancelled);
        }
        match task.procedure.step(&mut self.ctx) {
            Ok(Step::Done(output)) => {
                tracing::info!("{} finished", task.name());
                self.finish();
                Ok(Step::Done(output))
            }
            Ok(Step::Wait(duration)) => Ok(Step::Wait(duration)),
            Err(e) => {
                tracing::error!("{} failed: {}", task.name(), e);
                self.finish();
                Err(e.into())
            }
        }
    }

    /// Drives a task to completion, blocking the thread while it waits.
    pub fn run<P: Procedure<T>, S: Sleep>(
        &mut self,
        mut task: Task<P>,
        sleeper: &S,
    ) -> Result<P::Output, ChronosError> {
        loop {
            match self.step(&mut task)? {
                Step::Wait(duration) => sleeper.sleep(duration),
                Step::Done(output) => return Ok(output),
            }
        }
    }

    /// Drives a task to completion without blocking the thread.
    #[cfg_attr(docsrs, doc(cfg(feature = "async")))]
    #[cfg(feature = "async")]
    pub async fn run_async<P: Procedure<T>, S: chronos_core::sleep::AsyncSleep>(
        &mut self,
        mut task: Task<P>,
        sleeper: &S,
    ) -> Result<P::Output, ChronosError> {
        loop {
            match self.step(&mut task)? {
                Step::Wait(duration) => sleeper.sleep(duration).await,
                Step::Done(output) => return Ok(output),
            }
        }
    }
}
