use crate::{clock::ClockScale, geometry::SensorLimits};

/// Electrical and timing constants of an image sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorParams {
    /// Resolution limits.
    pub limits: SensorLimits,
    /// Expected value of the chip identification register.
    pub chip_id: u32,
    /// Delay between line valid and the start of a row, in sensor clocks.
    pub lv_delay: u32,
    /// Minimum horizontal blanking, in sensor clocks.
    pub min_hblank: u32,
    /// Start-of-frame delay, in sensor clocks.
    pub sof_delay: u32,
    /// Sensor clock frequency in Hz.
    pub sensor_hz: u32,
    /// Timing engine clock frequency in Hz.
    pub timing_hz: u32,
    /// Number of ADC channels. A column is digitized by channel `column % adc_channels`.
    pub adc_channels: usize,
    /// ADC code margin kept below the black level.
    pub adc_footroom: i32,
    /// Magnitude limit of the ADC offset register.
    pub adc_offset_max: i32,
    /// Fractional bits of the column gain coefficient.
    pub gain_frac_bits: u32,
    /// Fractional bits of the column curvature coefficient.
    pub curve_frac_bits: u32,
}

impl SensorParams {
    /// Constants of the LUX1310 sensor.
    pub const LUX1310: Self = Self {
        limits: SensorLimits::LUX1310,
        chip_id: 0xDA,
        lv_delay: 7,
        min_hblank: 2,
        sof_delay: 0x0f,
        sensor_hz: 90_000_000,
        timing_hz: 100_000_000,
        adc_channels: 16,
        adc_footroom: 32,
        adc_offset_max: 1023,
        gain_frac_bits: 12,
        curve_frac_bits: 21,
    };

    /// Returns the scale between the sensor and timing clock domains.
    #[must_use]
    pub fn clock_scale(&self) -> ClockScale {
        ClockScale::new(self.sensor_hz, self.timing_hz)
    }

    /// Full-scale ADC code.
    #[must_use]
    pub const fn full_scale(&self) -> u32 {
        1 << self.limits.bit_depth
    }

    /// Sensor clocks needed to read out one row.
    #[must_use]
    pub const fn read_clocks_per_row(&self, h_res: u32) -> u32 {
        h_res / self.adc_channels as u32
    }
}

impl Default for SensorParams {
    fn default() -> Self {
        Self::LUX1310
    }
}
