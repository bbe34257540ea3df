use core::time::Duration;

use chronos_core::{
    fixed::{encode_curve, encode_gain},
    transport::{ChannelStats, Register, Transport, DISPLAY_GAIN_3POINT},
};

use crate::{
    error::ChronosDriverError,
    procedure::{Procedure, SensorContext, Step},
    warning::{Report, Warning},
};

/// Parameters of the column gain calibration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GainCalibrationConfig {
    /// Rows averaged per measurement.
    pub rows: u32,
    /// Highest dummy voltage step.
    pub vmax: u32,
    /// Frame periods to wait after changing the dummy voltage.
    pub refresh_periods: u32,
    /// Settle time after stopping the timing engine.
    pub settle: Duration,
}

impl GainCalibrationConfig {
    /// Sets the number of rows averaged per measurement.
    #[must_use]
    pub const fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    /// Sets the highest dummy voltage step.
    #[must_use]
    pub const fn with_vmax(mut self, vmax: u32) -> Self {
        self.vmax = vmax;
        self
    }

    /// Sets the number of frame periods to wait per voltage step.
    #[must_use]
    pub const fn with_refresh_periods(mut self, refresh_periods: u32) -> Self {
        self.refresh_periods = refresh_periods;
        self
    }

    /// Sets the settle time.
    #[must_use]
    pub const fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl Default for GainCalibrationConfig {
    fn default() -> Self {
        Self {
            rows: 64,
            vmax: 31,
            refresh_periods: 10,
            settle: Duration::from_millis(100),
        }
    }
}

/// Per-channel means measured at three dummy voltages.
#[derive(Clone, Debug, PartialEq)]
pub struct GainSamples {
    /// Low voltage step.
    pub vlow: u32,
    /// Middle voltage step.
    pub vmid: u32,
    /// High voltage step.
    pub vhigh: u32,
    /// Means at `vlow`.
    pub low: Vec<f64>,
    /// Means at `vmid`.
    pub mid: Vec<f64>,
    /// Means at `vhigh`.
    pub high: Vec<f64>,
}

/// Gain and curvature of a channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelFit {
    /// Linear coefficient.
    pub gain: f64,
    /// Quadratic coefficient.
    pub curve: f64,
}

impl ChannelFit {
    /// Unity gain without curvature.
    pub const UNITY: Self = Self {
        gain: 1.,
        curve: 0.,
    };

    /// Applies the correction polynomial to a code.
    #[must_use]
    pub fn apply(&self, code: f64) -> f64 {
        self.gain * code + self.curve * code * code
    }
}

/// Fits a quadratic correction per channel.
///
/// The correction equalizes the low-to-high span of every channel to the widest one and
/// bends it by the deviation of the middle sample from the straight line through the
/// other two. A channel whose samples are not at least `min_range` apart fails the fit.
pub fn fit_channels(samples: &GainSamples, min_range: f64) -> Result<Vec<ChannelFit>, Warning> {
    let GainSamples {
        vlow,
        vmid,
        vhigh,
        low,
        mid,
        high,
    } = samples;
    let channels = low.iter().zip(mid).zip(high).map(|((&l, &m), &h)| (l, m, h));

    if let Some(channel) = channels
        .clone()
        .position(|(l, m, h)| !(h > m + min_range && m > l + min_range))
    {
        return Err(Warning::GainCalibrationRange { channel });
    }

    let max_diff = channels
        .clone()
        .map(|(l, _, h)| h - l)
        .fold(f64::MIN, f64::max);
    let ratio = (*vmid as f64 - *vlow as f64) / (*vhigh as f64 - *vlow as f64);

    Ok(channels
        .map(|(low, mid, high)| {
            let diff = high - low;
            let gain2 = max_diff / diff;
            let predict = low + diff * ratio;
            let err = mid - predict;
            let curve = err / ((mid - low) * (high - mid));
            ChannelFit {
                gain: gain2 - curve * (high + low),
                curve,
            }
        })
        .collect())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    LoadTable,
    SearchHigh(u32),
    SearchLow(u32),
    SampleMid,
}

/// Measures the column amplifiers against the internal dummy voltage and loads a 3-point
/// gain correction.
///
/// If any channel does not respond over a usable range, unity gain is loaded instead and
/// [`Warning::GainCalibrationRange`] is reported.
#[derive(Clone, Debug, PartialEq)]
pub struct GainCalibration {
    config: GainCalibrationConfig,
    state: State,
    vhigh: u32,
    vlow: u32,
    high: Vec<f64>,
    low: Vec<f64>,
    warnings: Vec<Warning>,
}

impl GainCalibration {
    /// Creates a new [`GainCalibration`].
    #[must_use]
    pub const fn new(config: GainCalibrationConfig) -> Self {
        Self {
            config,
            state: State::Start,
            vhigh: 0,
            vlow: 0,
            high: Vec::new(),
            low: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn measure<T: Transport>(
        &self,
        ctx: &mut SensorContext<T>,
    ) -> Result<Vec<f64>, ChronosDriverError> {
        Ok(ctx
            .transport
            .read_averaged_rows(
                ctx.geometry.h_res,
                self.config.rows,
                1,
                ctx.sensor.params().adc_channels,
            )?
            .into_iter()
            .map(|ChannelStats { mean, .. }| mean)
            .collect())
    }

    fn set_voltage<T: Transport>(
        &self,
        ctx: &mut SensorContext<T>,
        step: u32,
    ) -> Result<Step<Report<()>>, ChronosDriverError> {
        ctx.transport.write_register(Register::SelVdumrst, step)?;
        Ok(Step::Wait(ctx.frame_periods(self.config.refresh_periods)))
    }

    fn load_fits<T: Transport>(
        &self,
        ctx: &mut SensorContext<T>,
        fits: &[ChannelFit],
        three_point: bool,
    ) -> Result<(), ChronosDriverError> {
        let params = *ctx.sensor.params();
        (0..params.limits.h_max as usize).try_for_each(|col| {
            let fit = fits
                .get(col % params.adc_channels)
                .copied()
                .unwrap_or(ChannelFit::UNITY);
            let gain = encode_gain(fit.gain, params.gain_frac_bits);
            let curve = encode_curve(fit.curve, params.curve_frac_bits);
            ctx.transport.write_column_gain(col, gain, curve)?;
            ctx.calibration.set_column(col, gain, curve);
            Ok::<_, ChronosDriverError>(())
        })?;

        let control = ctx.transport.read_register(Register::DisplayGainControl)?;
        let control = if three_point {
            control | DISPLAY_GAIN_3POINT
        } else {
            control & !DISPLAY_GAIN_3POINT
        };
        ctx.transport
            .write_register(Register::DisplayGainControl, control)?;
        ctx.calibration.set_three_point(three_point);
        Ok(())
    }

    fn fail<T: Transport>(
        &mut self,
        ctx: &mut SensorContext<T>,
        warning: Warning,
    ) -> Result<Step<Report<()>>, ChronosDriverError> {
        tracing::warn!("Gain calibration out of range ({:?}), loading unity gain", warning);
        self.warnings.push(warning);
        self.load_fits(ctx, &[], false)?;
        self.finish(ctx)
    }

    fn finish<T: Transport>(
        &mut self,
        ctx: &mut SensorContext<T>,
    ) -> Result<Step<Report<()>>, ChronosDriverError> {
        ctx.timing
            .stop_timing(&mut ctx.transport)?
            .into_value(&mut self.warnings);
        let frame_clocks = ctx.frame_clocks();
        ctx.sensor
            .update_wavetable(&mut ctx.transport, &ctx.geometry, frame_clocks, false)?;
        ctx.timing
            .continue_timing(&mut ctx.transport)?
            .into_value(&mut self.warnings);
        Ok(Step::Done(Report::with_warnings(
            (),
            core::mem::take(&mut self.warnings),
        )))
    }
}

impl Default for GainCalibration {
    fn default() -> Self {
        Self::new(GainCalibrationConfig::default())
    }
}

impl<T: Transport> Procedure<T> for GainCalibration {
    type Output = Report<()>;

    fn step(&mut self, ctx: &mut SensorContext<T>) -> Result<Step<Report<()>>, ChronosDriverError> {
        let params = *ctx.sensor.params();
        let full_scale = params.full_scale() as f64;
        match self.state {
            State::Start => {
                tracing::info!("Starting column gain calibration");
                ctx.timing
                    .stop_timing(&mut ctx.transport)?
                    .into_value(&mut self.warnings);
                self.state = State::LoadTable;
                Ok(Step::Wait(self.config.settle))
            }
            State::LoadTable => {
                let frame_clocks = ctx.frame_clocks();
                ctx.sensor
                    .update_wavetable(&mut ctx.transport, &ctx.geometry, frame_clocks, true)?;
                ctx.timing
                    .continue_timing(&mut ctx.transport)?
                    .into_value(&mut self.warnings);
                self.state = State::SearchHigh(self.config.vmax);
                self.set_voltage(ctx, self.config.vmax)
            }
            State::SearchHigh(v) => {
                let means = self.measure(ctx)?;
                let (channel, max) = means
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0, f64::MIN), |a, b| if b.1 > a.1 { b } else { a });
                if max <= full_scale - full_scale / 8. {
                    tracing::debug!("vhigh = {} (max {:.1})", v, max);
                    self.vhigh = v;
                    self.high = means;
                    self.state = State::SearchLow(0);
                    return self.set_voltage(ctx, 0);
                }
                if v <= 1 {
                    return self.fail(ctx, Warning::GainCalibrationRange { channel });
                }
                self.state = State::SearchHigh(v - 1);
                self.set_voltage(ctx, v - 1)
            }
            State::SearchLow(v) => {
                let means = self.measure(ctx)?;
                let (channel, min) = means
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0, f64::MAX), |a, b| if b.1 < a.1 { b } else { a });
                if min >= params.adc_footroom as f64 {
                    tracing::debug!("vlow = {} (min {:.1})", v, min);
                    self.vlow = v;
                    self.low = means;
                    self.state = State::SampleMid;
                    return self.set_voltage(ctx, (self.vhigh + 3 * self.vlow) / 4);
                }
                if v + 1 >= self.vhigh {
                    return self.fail(ctx, Warning::GainCalibrationRange { channel });
                }
                self.state = State::SearchLow(v + 1);
                self.set_voltage(ctx, v + 1)
            }
            State::SampleMid => {
                let samples = GainSamples {
                    vlow: self.vlow,
                    vmid: (self.vhigh + 3 * self.vlow) / 4,
                    vhigh: self.vhigh,
                    low: core::mem::take(&mut self.low),
                    mid: self.measure(ctx)?,
                    high: core::mem::take(&mut self.high),
                };
                tracing::debug!("Gain samples: {:?}", samples);
                match fit_channels(&samples, full_scale / 16.) {
                    Ok(fits) => {
                        tracing::debug!("Channel fits: {:?}", fits);
                        self.load_fits(ctx, &fits, true)?;
                        tracing::info!("Column gain calibration done");
                        self.finish(ctx)
                    }
                    Err(warning) => self.fail(ctx, warning),
                }
            }
        }
    }
}
