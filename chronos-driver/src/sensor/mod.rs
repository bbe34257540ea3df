mod gain;

use core::time::Duration;

use chronos_core::{
    geometry::FrameGeometry,
    params::SensorParams,
    transport::{Register, Transport},
    wavetable::{WavetableDescriptor, Wavetables},
};

use crate::error::ChronosDriverError;

use gain::GainConfig;

/// Charge transfer time, in sensor clocks.
const T_TX: u64 = 25;
/// Time between PRSTN falling and TXN falling, in sensor clocks.
const T_FOVB: u64 = 41;
/// First column address of the pixel array.
const X_START_BASE: u32 = 0x20;
/// Dark row address offset past the end of the pixel array.
const DARK_ROW_BASE_OFFSET: u32 = 4;
/// High period of the pulsed anti-blooming pattern, in timing clocks.
const PULSED_ABN_HIGH: u32 = 2;
/// Headroom kept between the exposure and the frame period.
const EXPOSURE_OVERHEAD: Duration = Duration::from_nanos(500);

/// Frame geometry rules, timing model and analog setup of an image sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorModel {
    params: SensorParams,
    wavetables: Wavetables,
}

impl SensorModel {
    /// Creates a new [`SensorModel`].
    #[must_use]
    pub const fn new(params: SensorParams, wavetables: Wavetables) -> Self {
        Self { params, wavetables }
    }

    /// Sensor constants.
    #[must_use]
    pub const fn params(&self) -> &SensorParams {
        &self.params
    }

    /// Wavetable catalog.
    #[must_use]
    pub const fn wavetables(&self) -> &Wavetables {
        &self.wavetables
    }

    /// Checks the geometry against the sensor limits.
    pub fn validate(&self, geometry: FrameGeometry) -> Result<FrameGeometry, ChronosDriverError> {
        Ok(geometry.validate(&self.params.limits)?)
    }

    /// The longest wavetable that fits within the row readout time, or the shortest one
    /// for very narrow windows.
    #[must_use]
    pub fn ideal_wavetable(&self, geometry: &FrameGeometry) -> &WavetableDescriptor {
        let ideal = (self.params.read_clocks_per_row(geometry.h_res) + self.params.min_hblank)
            .saturating_sub(3);
        self.wavetables
            .iter()
            .find(|wt| wt.clocks <= ideal)
            .unwrap_or_else(|| self.wavetables.shortest())
    }

    /// Minimum frame period of `geometry` in timing clocks.
    ///
    /// If `wavetable_clocks` is `None`, the [ideal wavetable](Self::ideal_wavetable) is assumed.
    #[must_use]
    pub fn min_frame_clocks(&self, geometry: &FrameGeometry, wavetable_clocks: Option<u32>) -> u32 {
        let p = &self.params;
        let wt = wavetable_clocks.unwrap_or_else(|| self.ideal_wavetable(geometry).clocks) as u64;
        let t_read = p.read_clocks_per_row(geometry.h_res) as u64;
        let t_row = (t_read + p.min_hblank as u64).max(wt + 3);
        let t_fovf = p.sof_delay as u64 + wt + p.lv_delay as u64 + 10;
        let t_frame = t_row * geometry.total_rows() as u64 + T_TX + t_fovf + T_FOVB
            - p.min_hblank as u64;
        p.clock_scale()
            .sensor_to_timing(t_frame)
            .min(u32::MAX as u64) as u32
    }

    /// Selects the longest wavetable whose minimum frame period fits in `frame_clocks`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn select_wavetable(
        &self,
        geometry: &FrameGeometry,
        frame_clocks: u32,
    ) -> Result<&WavetableDescriptor, ChronosDriverError> {
        match self
            .wavetables
            .iter()
            .find(|wt| self.min_frame_clocks(geometry, Some(wt.clocks)) <= frame_clocks)
        {
            Some(wt) => {
                tracing::debug!("Selected {}-clock wavetable", wt.clocks);
                Ok(wt)
            }
            None => Err(ChronosDriverError::TimingInfeasible {
                requested: frame_clocks,
                minimum: self
                    .wavetables
                    .iter()
                    .map(|wt| self.min_frame_clocks(geometry, Some(wt.clocks)))
                    .min()
                    .unwrap_or(u32::MAX),
            }),
        }
    }

    /// Loads a wavetable into the sensor and configures the FPGA row timing to match.
    pub fn apply_wavetable<T: Transport>(
        &self,
        transport: &mut T,
        geometry: &FrameGeometry,
        wavetable: &WavetableDescriptor,
        gain_cal: bool,
    ) -> Result<(), ChronosDriverError> {
        tracing::debug!(
            "Loading {}-clock wavetable (gain_cal: {})",
            wavetable.clocks,
            gain_cal
        );
        transport.write_register(Register::TimingEn, 0)?;
        transport.write_register(Register::RdoutDly, wavetable.clocks)?;
        transport.write_register(Register::WavetabSize, wavetable.clocks)?;
        transport.write_wavetable(wavetable.table(gain_cal))?;
        transport.write_register(Register::TimingEn, 1)?;

        transport.write_register(Register::StartDelay, wavetable.abn_delay)?;
        let line_period = (self.params.read_clocks_per_row(geometry.h_res) + 2)
            .max(wavetable.clocks + 3)
            - 1;
        transport.write_register(Register::LinePeriod, line_period)?;
        transport.write_register(Register::PulsedAbnLowPeriod, wavetable.clocks)?;
        transport.write_register(Register::PulsedAbnHighPeriod, PULSED_ABN_HIGH)?;
        Ok(())
    }

    /// Selects and loads the wavetable for `frame_clocks`.
    pub fn update_wavetable<T: Transport>(
        &self,
        transport: &mut T,
        geometry: &FrameGeometry,
        frame_clocks: u32,
        gain_cal: bool,
    ) -> Result<u32, ChronosDriverError> {
        let wavetable = self.select_wavetable(geometry, frame_clocks)?;
        self.apply_wavetable(transport, geometry, wavetable, gain_cal)?;
        Ok(wavetable.clocks)
    }

    /// Programs the readout window.
    pub fn apply_readout_window<T: Transport>(
        &self,
        transport: &mut T,
        geometry: &FrameGeometry,
    ) -> Result<(), ChronosDriverError> {
        let limits = &self.params.limits;
        let x_start = X_START_BASE + geometry.h_offset;
        transport.write_register(Register::XStart, x_start)?;
        transport.write_register(Register::XEnd, x_start + geometry.h_res - 1)?;
        transport.write_register(Register::YStart, geometry.v_offset)?;
        transport.write_register(Register::YEnd, geometry.v_offset + geometry.v_res - 1)?;
        transport.write_register(
            Register::DrkRowsStAddr,
            limits.v_max + limits.v_dark_max - geometry.v_dark_rows + DARK_ROW_BASE_OFFSET,
        )?;
        transport.write_register(Register::NbDrkRows, geometry.v_dark_rows)?;
        Ok(())
    }

    /// Reads the readout window back from the sensor.
    pub fn current_geometry<T: Transport>(
        &self,
        transport: &mut T,
    ) -> Result<FrameGeometry, ChronosDriverError> {
        let x_start = transport.read_register(Register::XStart)?;
        let x_end = transport.read_register(Register::XEnd)?;
        let y_start = transport.read_register(Register::YStart)?;
        let y_end = transport.read_register(Register::YEnd)?;
        let v_dark_rows = transport.read_register(Register::NbDrkRows)?;

        let h_offset = x_start.checked_sub(X_START_BASE);
        let h_res = x_end
            .checked_sub(x_start)
            .and_then(|w| w.checked_add(1));
        let v_res = y_end
            .checked_sub(y_start)
            .and_then(|h| h.checked_add(1));
        match (h_offset, h_res, v_res) {
            (Some(h_offset), Some(h_res), Some(v_res)) => Ok(FrameGeometry {
                h_res,
                v_res,
                h_offset,
                v_offset: y_start,
                v_dark_rows,
                bit_depth: self.params.limits.bit_depth,
            }),
            _ => Err(ChronosDriverError::HardwareFault(format!(
                "Inconsistent readout window: x=[{x_start}, {x_end}], y=[{y_start}, {y_end}]"
            ))),
        }
    }

    /// Sets the analog gain.
    pub fn set_gain<T: Transport>(&self, transport: &mut T, gain: u8) -> Result<(), ChronosDriverError> {
        let config = GainConfig::lookup(gain).ok_or(ChronosDriverError::InvalidGain(gain))?;
        tracing::info!("Setting analog gain to x{}", gain);
        config.apply(transport)
    }

    /// Range of frame periods for `geometry`, in timing clocks.
    #[must_use]
    pub fn period_range(&self, geometry: &FrameGeometry) -> (u32, u32) {
        (self.min_frame_clocks(geometry, None), u32::MAX)
    }

    /// Range of exposure times for a frame period, in timing clocks.
    #[must_use]
    pub fn exposure_range(&self, frame_clocks: u32) -> (u32, u32) {
        let scale = self.params.clock_scale();
        let min = scale.duration_to_timing(Duration::from_micros(1)) as u32;
        let overhead = scale.duration_to_timing(EXPOSURE_OVERHEAD) as u32;
        (min, frame_clocks.saturating_sub(overhead).max(min))
    }
}
