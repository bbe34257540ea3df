use crate::{
    fixed::{decode_curve, decode_gain},
    params::SensorParams,
};

/// ADC correction coefficients currently loaded in the hardware.
///
/// Offsets are per ADC channel; gain and curvature are per display column and stored in
/// their register encodings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationState {
    adc_offsets: Vec<i32>,
    column_gain: Vec<u16>,
    column_curve: Vec<u16>,
    three_point: bool,
    gain_frac_bits: u32,
    curve_frac_bits: u32,
}

impl CalibrationState {
    /// Creates a state with zero offsets and unity gain.
    #[must_use]
    pub fn new(params: &SensorParams) -> Self {
        let columns = params.limits.h_max as usize;
        Self {
            adc_offsets: vec![0; params.adc_channels],
            column_gain: vec![1 << params.gain_frac_bits; columns],
            column_curve: vec![0; columns],
            three_point: false,
            gain_frac_bits: params.gain_frac_bits,
            curve_frac_bits: params.curve_frac_bits,
        }
    }

    /// ADC offsets, one per channel.
    #[must_use]
    pub fn adc_offsets(&self) -> &[i32] {
        &self.adc_offsets
    }

    /// Sets the offset of a channel.
    pub fn set_adc_offset(&mut self, channel: usize, offset: i32) {
        if let Some(o) = self.adc_offsets.get_mut(channel) {
            *o = offset;
        }
    }

    /// Raw gain registers, one per display column.
    #[must_use]
    pub fn column_gain_raw(&self) -> &[u16] {
        &self.column_gain
    }

    /// Raw curvature registers, one per display column.
    #[must_use]
    pub fn column_curve_raw(&self) -> &[u16] {
        &self.column_curve
    }

    /// Sets the raw gain and curvature registers of a column.
    pub fn set_column(&mut self, column: usize, gain: u16, curve: u16) {
        if let (Some(g), Some(c)) = (
            self.column_gain.get_mut(column),
            self.column_curve.get_mut(column),
        ) {
            *g = gain;
            *c = curve;
        }
    }

    /// Returns `true` if 3-point correction is enabled.
    #[must_use]
    pub const fn is_three_point(&self) -> bool {
        self.three_point
    }

    /// Enables or disables 3-point correction.
    pub fn set_three_point(&mut self, enable: bool) {
        self.three_point = enable;
    }

    /// Decoded gain of a column.
    #[must_use]
    pub fn column_gain(&self, column: usize) -> f64 {
        decode_gain(self.column_gain[column], self.gain_frac_bits)
    }

    /// Decoded curvature of a column.
    #[must_use]
    pub fn column_curve(&self, column: usize) -> f64 {
        decode_curve(self.column_curve[column], self.curve_frac_bits)
    }

    /// Applies the column correction polynomial `gain*x + curve*x^2` to a code.
    #[must_use]
    pub fn correct(&self, column: usize, code: f64) -> f64 {
        let gain = self.column_gain(column);
        if !self.three_point {
            return gain * code;
        }
        gain * code + self.column_curve(column) * code * code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity() {
        let state = CalibrationState::new(&SensorParams::LUX1310);
        assert_eq!(&[0; 16], state.adc_offsets());
        assert_eq!(1280, state.column_gain_raw().len());
        assert!(state.column_gain_raw().iter().all(|&g| g == 4096));
        assert!(state.column_curve_raw().iter().all(|&c| c == 0));
        approx::assert_abs_diff_eq!(100., state.correct(0, 100.));
    }

    #[test]
    fn correct_three_point() {
        let mut state = CalibrationState::new(&SensorParams::LUX1310);
        state.set_column(3, 6144, 0xffe0);
        approx::assert_abs_diff_eq!(150., state.correct(3, 100.));
        state.set_three_point(true);
        approx::assert_abs_diff_eq!(
            150. - 32. / (1 << 21) as f64 * 100. * 100.,
            state.correct(3, 100.)
        );
    }

    #[test]
    fn out_of_range_ignored() {
        let mut state = CalibrationState::new(&SensorParams::LUX1310);
        state.set_adc_offset(16, 10);
        state.set_column(1280, 0, 0);
        assert_eq!(CalibrationState::new(&SensorParams::LUX1310), state);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde() -> anyhow::Result<()> {
        let mut state = CalibrationState::new(&SensorParams::LUX1310);
        state.set_adc_offset(2, -64);
        let blob = serde_json::to_string(&state)?;
        assert_eq!(state, serde_json::from_str(&blob)?);
        Ok(())
    }
}
