use core::time::Duration;

use chronos_core::{
    fixed::encode_adc_offset,
    transport::{Register, Transport},
};

use crate::{
    error::ChronosDriverError,
    procedure::{Procedure, SensorContext, Step},
};

/// Time for a new offset to reach the display pipeline, on top of the frame periods.
const DISPLAY_REFRESH: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Parameters of the offset calibration loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetCalibrationConfig {
    /// Number of correction iterations.
    pub iterations: usize,
    /// Frames averaged per iteration.
    pub num_frames: u32,
}

impl OffsetCalibrationConfig {
    /// Sets the number of iterations.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the number of frames averaged per iteration.
    #[must_use]
    pub const fn with_num_frames(mut self, num_frames: u32) -> Self {
        self.num_frames = num_frames;
        self
    }
}

impl Default for OffsetCalibrationConfig {
    fn default() -> Self {
        Self {
            iterations: 16,
            num_frames: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Iterate(usize),
}

/// Drives the per-channel ADC offsets until the dark rows sit just above the footroom.
///
/// Each iteration moves every offset halfway towards `mean - stddev == footroom`.
#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCalibration {
    config: OffsetCalibrationConfig,
    offsets: Vec<f64>,
    state: State,
}

impl OffsetCalibration {
    /// Creates a new [`OffsetCalibration`].
    #[must_use]
    pub const fn new(config: OffsetCalibrationConfig) -> Self {
        Self {
            config,
            offsets: Vec::new(),
            state: State::Start,
        }
    }

    fn refresh_period<T: Transport>(ctx: &SensorContext<T>) -> Duration {
        ctx.frame_periods(3) + DISPLAY_REFRESH
    }

    fn write_offsets<T: Transport>(&self, ctx: &mut SensorContext<T>) -> Result<(), ChronosDriverError> {
        self.offsets
            .iter()
            .enumerate()
            .try_for_each(|(ch, &offset)| {
                let offset = offset as i32;
                ctx.transport
                    .write_register(Register::AdcOffset(ch as u8), encode_adc_offset(offset))?;
                ctx.calibration.set_adc_offset(ch, offset);
                Ok(())
            })
    }
}

impl Default for OffsetCalibration {
    fn default() -> Self {
        Self::new(OffsetCalibrationConfig::default())
    }
}

impl<T: Transport> Procedure<T> for OffsetCalibration {
    type Output = ();

    fn step(&mut self, ctx: &mut SensorContext<T>) -> Result<Step<()>, ChronosDriverError> {
        match self.state {
            State::Start => {
                tracing::info!(
                    "Starting ADC offset calibration ({} iterations)",
                    self.config.iterations
                );
                self.offsets = vec![0.; ctx.sensor.params().adc_channels];
                self.write_offsets(ctx)?;
                ctx.transport.write_register(Register::AdcCalEn, 1)?;
                if self.config.iterations == 0 {
                    return Ok(Step::Done(()));
                }
                self.state = State::Iterate(0);
                Ok(Step::Wait(Self::refresh_period(ctx)))
            }
            State::Iterate(iteration) => {
                let params = *ctx.sensor.params();
                let stats = ctx.transport.read_averaged_rows(
                    ctx.geometry.h_res,
                    ctx.geometry.v_dark_rows,
                    self.config.num_frames,
                    params.adc_channels,
                )?;
                let limit = params.adc_offset_max as f64;
                self.offsets.iter_mut().zip(&stats).for_each(|(offset, s)| {
                    *offset -= (s.mean - s.std_dev - params.adc_footroom as f64) / 2.;
                    *offset = offset.clamp(-limit, limit);
                });
                tracing::debug!("ADC offsets [{}]: {:?}", iteration, self.offsets);
                self.write_offsets(ctx)?;

                if iteration + 1 >= self.config.iterations {
                    tracing::info!("ADC offset calibration done: {:?}", ctx.calibration.adc_offsets());
                    return Ok(Step::Done(()));
                }
                self.state = State::Iterate(iteration + 1);
                Ok(Step::Wait(Self::refresh_period(ctx)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chronos_core::{fixed::decode_adc_offset, geometry::FrameGeometry};
    use chronos_firmware_emulator::{FpgaEmulator, SyntheticSensor};

    use super::*;
    use crate::procedure::testing::{context, run};

    fn dark_context(black: u16, sigma: u16, noise: u16) -> SensorContext<FpgaEmulator> {
        let mut ctx = context(FpgaEmulator::new().with_synthetic(
            SyntheticSensor::default()
                .with_black_level(black)
                .with_dark_sigma(sigma)
                .with_noise(noise, 0x5EED),
        ));
        ctx.geometry = FrameGeometry::new(1280, 1024).with_dark_rows(8);
        ctx.sensor
            .apply_readout_window(&mut ctx.transport, &ctx.geometry)
            .unwrap();
        ctx
    }

    #[test]
    fn converges_to_fixed_point() -> anyhow::Result<()> {
        let mut ctx = dark_context(100, 4, 0);
        let (_, waits) = run(OffsetCalibration::default(), &mut ctx)?;

        assert_eq!(16, waits.len());
        // 3 frames of 90000 clocks at 100 MHz plus 1/60 s
        assert!(waits
            .iter()
            .all(|&w| w == Duration::from_micros(2700) + Duration::from_nanos(16_666_666)));

        // mean - stddev - footroom == 0 at 100 + off - 4 - 32
        assert!(ctx.calibration.adc_offsets().iter().all(|&o| o == -64));
        (0..16).for_each(|ch| {
            assert_eq!(
                -64,
                decode_adc_offset(ctx.transport.register(Register::AdcOffset(ch)))
            );
        });
        assert_eq!(1, ctx.transport.register(Register::AdcCalEn));
        Ok(())
    }

    #[test]
    fn damped_sequence() -> anyhow::Result<()> {
        let mut ctx = dark_context(100, 4, 0);
        let mut history = Vec::new();
        for iterations in 1..=8 {
            let mut ctx2 = dark_context(100, 4, 0);
            run(
                OffsetCalibration::new(
                    OffsetCalibrationConfig::default().with_iterations(iterations),
                ),
                &mut ctx2,
            )?;
            history.push(ctx2.calibration.adc_offsets()[0]);
        }
        assert_eq!(vec![-32, -48, -56, -60, -62, -63, -63, -64], history);

        run(OffsetCalibration::default(), &mut ctx)?;
        assert_eq!(-64, ctx.calibration.adc_offsets()[5]);
        Ok(())
    }

    #[test]
    fn converges_with_noise() -> anyhow::Result<()> {
        let mut ctx = dark_context(300, 6, 2);
        run(OffsetCalibration::default(), &mut ctx)?;
        ctx.calibration.adc_offsets().iter().for_each(|&o| {
            // black + off - sigma - footroom ~ 0
            assert!((o - (-(300 - 6 - 32))).abs() <= 3, "offset {}", o);
        });
        Ok(())
    }

    #[test]
    fn offset_saturates() -> anyhow::Result<()> {
        let mut ctx = dark_context(4000, 0, 0);
        run(OffsetCalibration::default(), &mut ctx)?;
        assert!(ctx.calibration.adc_offsets().iter().all(|&o| o == -1023));
        Ok(())
    }
}
