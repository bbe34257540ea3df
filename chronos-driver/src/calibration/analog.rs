use core::time::Duration;

use chronos_core::{geometry::FrameGeometry, transport::Transport};

use crate::{
    error::ChronosDriverError,
    procedure::{Procedure, SensorContext, Step},
    warning::{Report, Warning},
};

use super::{GainCalibration, GainCalibrationConfig, OffsetCalibration, OffsetCalibrationConfig};

/// Dark rows borrowed from the active area when the geometry has none.
const BORROWED_DARK_ROWS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Offset,
    Gain,
}

/// Offset calibration followed by gain calibration, on a readout window with dark rows.
///
/// The readout window and the normal wavetable are restored afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalogCalibration {
    offset: OffsetCalibration,
    gain: GainCalibration,
    state: State,
    saved_geometry: Option<FrameGeometry>,
    warnings: Vec<Warning>,
}

impl AnalogCalibration {
    /// Creates a new [`AnalogCalibration`].
    #[must_use]
    pub const fn new(offset: OffsetCalibrationConfig, gain: GainCalibrationConfig) -> Self {
        Self {
            offset: OffsetCalibration::new(offset),
            gain: GainCalibration::new(gain),
            state: State::Start,
            saved_geometry: None,
            warnings: Vec::new(),
        }
    }

    fn calibration_geometry(geometry: FrameGeometry) -> FrameGeometry {
        if geometry.v_dark_rows != 0 {
            return geometry;
        }
        FrameGeometry {
            v_dark_rows: BORROWED_DARK_ROWS,
            v_offset: geometry.v_offset + BORROWED_DARK_ROWS,
            v_res: geometry.v_res.saturating_sub(BORROWED_DARK_ROWS),
            ..geometry
        }
    }

    fn set_window<T: Transport>(
        &mut self,
        ctx: &mut SensorContext<T>,
        geometry: FrameGeometry,
    ) -> Result<(), ChronosDriverError> {
        ctx.timing
            .stop_timing(&mut ctx.transport)?
            .into_value(&mut self.warnings);
        ctx.sensor
            .apply_readout_window(&mut ctx.transport, &geometry)?;
        ctx.timing.mark_geometry_changed();
        ctx.geometry = geometry;
        Ok(())
    }
}

impl Default for AnalogCalibration {
    fn default() -> Self {
        Self::new(
            OffsetCalibrationConfig::default(),
            GainCalibrationConfig::default(),
        )
    }
}

impl<T: Transport> Procedure<T> for AnalogCalibration {
    type Output = Report<()>;

    fn step(&mut self, ctx: &mut SensorContext<T>) -> Result<Step<Report<()>>, ChronosDriverError> {
        match self.state {
            State::Start => {
                tracing::info!("Starting analog calibration");
                let saved = ctx.geometry;
                let geometry = Self::calibration_geometry(saved);
                if geometry != saved {
                    tracing::debug!("Borrowing {} dark rows: {:?}", BORROWED_DARK_ROWS, geometry);
                }
                self.saved_geometry = Some(saved);
                self.set_window(ctx, geometry)?;
                ctx.timing
                    .continue_timing(&mut ctx.transport)?
                    .into_value(&mut self.warnings);
                self.state = State::Offset;
                Ok(Step::Wait(Duration::ZERO))
            }
            State::Offset => match self.offset.step(ctx)? {
                Step::Wait(duration) => Ok(Step::Wait(duration)),
                Step::Done(()) => {
                    self.state = State::Gain;
                    Ok(Step::Wait(Duration::ZERO))
                }
            },
            State::Gain => match self.gain.step(ctx)? {
                Step::Wait(duration) => Ok(Step::Wait(duration)),
                Step::Done(report) => {
                    report.into_value(&mut self.warnings);
                    let saved = self.saved_geometry.take().unwrap_or(ctx.geometry);
                    self.set_window(ctx, saved)?;
                    let frame_clocks = ctx.frame_clocks();
                    ctx.sensor
                        .update_wavetable(&mut ctx.transport, &saved, frame_clocks, false)?;
                    ctx.timing
                        .continue_timing(&mut ctx.transport)?
                        .into_value(&mut self.warnings);
                    tracing::info!("Analog calibration done");
                    Ok(Step::Done(Report::with_warnings(
                        (),
                        core::mem::take(&mut self.warnings),
                    )))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chronos_core::transport::Register;
    use chronos_firmware_emulator::{FpgaEmulator, SyntheticSensor};

    use super::*;
    use crate::procedure::testing::{context, run};

    #[rstest::rstest]
    #[case(
        FrameGeometry::new(640, 476).with_offset(0, 4).with_dark_rows(4),
        FrameGeometry::new(640, 480)
    )]
    #[case(
        FrameGeometry::new(640, 480).with_dark_rows(8),
        FrameGeometry::new(640, 480).with_dark_rows(8)
    )]
    fn calibration_geometry(#[case] expect: FrameGeometry, #[case] geometry: FrameGeometry) {
        assert_eq!(expect, AnalogCalibration::calibration_geometry(geometry));
    }

    #[test]
    fn calibrates_and_restores() -> anyhow::Result<()> {
        let mut ctx = context(
            FpgaEmulator::new().with_synthetic(SyntheticSensor::default().with_dark_sigma(4)),
        );
        let geometry = FrameGeometry::new(640, 480);
        ctx.geometry = geometry;
        ctx.sensor
            .apply_readout_window(&mut ctx.transport, &geometry)?;

        let (report, _) = run(AnalogCalibration::default(), &mut ctx)?;
        assert!(report.is_clean());

        assert!(ctx.calibration.adc_offsets().iter().all(|&o| o < 0));
        assert!(ctx.calibration.is_three_point());

        assert_eq!(geometry, ctx.geometry);
        assert_eq!(geometry, ctx.sensor.current_geometry(&mut ctx.transport)?);
        assert_eq!(0, ctx.transport.register(Register::NbDrkRows));
        assert!(!ctx.transport.is_gain_cal_mode());
        Ok(())
    }
}
