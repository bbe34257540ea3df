use chronos_core::{
    sleep::Sleep,
    timing::{Page, Signals, TimingProgram},
    transport::{Dac, Register, Transport},
};
use getset::{CopyGetters, Getters};

use crate::{
    error::ChronosDriverError,
    warning::{Report, Warning},
};

use super::{TimingConfig, TimingMode};

/// Timing core version that introduced the wait-for-n-lines instruction.
const N_LINES_WAIT_VERSION: u32 = 2;

const HDR_VDR1: f64 = 2.5;
const HDR_VDR2: f64 = 2.0;

/// Progress of a page flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FlipState {
    /// No flip in progress.
    #[default]
    Idle,
    /// Waiting for the engine to accept the flip request.
    FlipRequested,
    /// The request was issued and the engine has not switched pages yet.
    FlipPending,
}

/// Compiles [`TimingMode`]s into micro-op programs and swaps them into the timing engine.
///
/// The compiler remembers the last programmed mode so that timing can be stopped and
/// resumed around calibration, and so that the frame period or integration time can be
/// changed on their own.
#[derive(Debug, Getters, CopyGetters)]
pub struct TimingCompiler {
    #[getset(get = "pub")]
    config: TimingConfig,
    #[getset(get_copy = "pub")]
    mode: TimingMode,
    #[getset(get_copy = "pub")]
    active_page: Page,
    #[getset(get_copy = "pub")]
    state: FlipState,
    geometry_changed: bool,
    sleeper: Box<dyn Sleep + Send + Sync>,
}

impl TimingCompiler {
    /// Creates a new [`TimingCompiler`].
    ///
    /// `sleeper` paces the busy polls of the flip handshake.
    #[must_use]
    pub fn new(config: TimingConfig, sleeper: Box<dyn Sleep + Send + Sync>) -> Self {
        Self {
            config,
            mode: TimingMode::default(),
            active_page: Page::P0,
            state: FlipState::Idle,
            geometry_changed: false,
            sleeper,
        }
    }

    /// Notes that the readout window changed, so that a forced flip can report it.
    pub fn mark_geometry_changed(&mut self) {
        self.geometry_changed = true;
    }

    /// Programs `mode` and makes it the remembered mode.
    ///
    /// The returned report carries the mode actually programmed, after clamping.
    #[tracing::instrument(level = "debug", skip(self, transport))]
    pub fn program<T: Transport>(
        &mut self,
        transport: &mut T,
        mode: TimingMode,
    ) -> Result<Report<TimingMode>, ChronosDriverError> {
        let mut warnings = Vec::new();
        let (mode, clamped) = mode.clamp(self.config.t2_time);
        if let Some(warning) = clamped {
            tracing::warn!("Timing clamped: {:?}", warning);
            warnings.push(warning);
        }
        tracing::info!("Programming {:?}", mode);

        self.write_interim(transport)?.into_value(&mut warnings);

        let saved_trigger = transport.read_register(Register::ShutterTriggersFrame)?;
        transport.write_register(Register::ShutterTriggersFrame, 0)?;

        self.configure_sensor(transport, &mode)?;
        let n_lines_wait = matches!(mode, TimingMode::ShutterGating)
            && (transport.timing_version()? & 0xffff) >= N_LINES_WAIT_VERSION;
        let program = mode.program(&self.config, n_lines_wait);
        self.load(transport, &program)?.into_value(&mut warnings);
        self.mode = mode;

        let trigger = if mode.triggers_from_shutter() {
            1
        } else {
            saved_trigger
        };
        transport.write_register(Register::ShutterTriggersFrame, trigger)?;

        Ok(Report::with_warnings(mode, warnings))
    }

    /// Replaces the running program with a blank one so the current readout can finish.
    pub fn stop_timing<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Report<()>, ChronosDriverError> {
        tracing::debug!("Stopping timing");
        self.write_interim(transport)
    }

    /// Programs the remembered mode again.
    pub fn continue_timing<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Report<TimingMode>, ChronosDriverError> {
        tracing::debug!("Continuing timing");
        self.program(transport, self.mode)
    }

    /// Changes the frame period of the remembered mode.
    pub fn set_frame_time<T: Transport>(
        &mut self,
        transport: &mut T,
        frame: u32,
    ) -> Result<Report<TimingMode>, ChronosDriverError> {
        self.program(transport, self.mode.with_frame(frame))
    }

    /// Changes the integration time of the remembered mode.
    pub fn set_integration_time<T: Transport>(
        &mut self,
        transport: &mut T,
        integration: u32,
    ) -> Result<Report<TimingMode>, ChronosDriverError> {
        self.program(transport, self.mode.with_integration(integration))
    }

    fn write_interim<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Report<()>, ChronosDriverError> {
        let program = TimingProgram::new()
            .hold(Signals::empty(), self.config.readout_time)
            .restart();
        self.load(transport, &program)
    }

    fn load<T: Transport>(
        &mut self,
        transport: &mut T,
        program: &TimingProgram,
    ) -> Result<Report<()>, ChronosDriverError> {
        let page = self.active_page.other();
        tracing::debug!("Writing {} ops to page {:?}", program.ops().len(), page);
        transport.write_program(page, program.ops())?;
        Ok(match self.flip(transport)? {
            Some(warning) => Report::with_warnings((), vec![warning]),
            None => Report::new(()),
        })
    }

    fn configure_sensor<T: Transport>(
        &self,
        transport: &mut T,
        mode: &TimingMode,
    ) -> Result<(), ChronosDriverError> {
        let (pulses, vdr1_width, vdr2_width) = match *mode {
            TimingMode::Hdr2Slope { integration2, .. } => (
                2,
                integration2 + self.config.t2_time + TimingMode::hdr_abn_hold(),
                0,
            ),
            TimingMode::Hdr3Slope {
                integration2,
                integration3,
                ..
            } => (3, TimingMode::hdr_knee_width(), integration2 + integration3),
            _ => return Ok(()),
        };
        transport.set_dac(Dac::Vdr1, HDR_VDR1)?;
        transport.set_dac(Dac::Vdr2, HDR_VDR2)?;
        transport.set_dac(Dac::Vdr3, HDR_VDR2)?;
        transport.write_register(Register::FtTrigNbPulse, pulses)?;
        transport.write_register(Register::SelVdr1Width, vdr1_width)?;
        transport.write_register(Register::SelVdr2Width, vdr2_width)?;
        transport.write_register(Register::SelVdr3Width, 0)?;
        transport.write_register(Register::HidyEn, 1)?;
        Ok(())
    }

    /// Swaps the program pages.
    ///
    /// If the engine stays busy past the timeout the flip is forced with a single reset.
    fn flip<T: Transport>(&mut self, transport: &mut T) -> Result<Option<Warning>, ChronosDriverError> {
        let waiting_io = transport.read_register(Register::TimingIoWait)? != 0;
        let saved = if waiting_io {
            tracing::info!("Flip while waiting for external IO, disabling IO during flip");
            let saved = (
                transport.read_register(Register::ShutterTriggersFrame)?,
                transport.read_register(Register::ExposureEnable)?,
            );
            transport.write_register(Register::ShutterTriggersFrame, 0)?;
            transport.write_register(Register::ExposureEnable, 0)?;
            Some(saved)
        } else {
            None
        };

        self.state = FlipState::FlipRequested;
        let warning = if self.wait_idle(transport)? {
            transport.request_flip()?;
            None
        } else {
            tracing::warn!(
                "Timing engine busy for {:?}, forcing flip",
                self.config.flip.timeout
            );
            transport.request_flip()?;
            transport.force_reset()?;
            Some(Warning::FlipForced {
                geometry_changed: self.geometry_changed,
            })
        };
        self.state = FlipState::FlipPending;

        if !self.wait_idle(transport)? {
            tracing::warn!("Timing engine still busy after flip");
        }
        self.active_page = self.active_page.other();
        self.geometry_changed = false;
        self.state = FlipState::Idle;

        if let Some((trigger, exposure)) = saved {
            transport.write_register(Register::ShutterTriggersFrame, trigger)?;
            transport.write_register(Register::ExposureEnable, exposure)?;
        }
        Ok(warning)
    }

    fn wait_idle<T: Transport>(&self, transport: &mut T) -> Result<bool, ChronosDriverError> {
        let polls = self.config.flip.polls();
        let mut i = 0;
        loop {
            if !transport.is_flip_busy()? {
                return Ok(true);
            }
            if i >= polls {
                return Ok(false);
            }
            self.sleeper.sleep(self.config.flip.poll_interval);
            i += 1;
        }
    }
}
