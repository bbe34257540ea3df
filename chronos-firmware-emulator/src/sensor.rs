/// A synthetic image source standing in for the pixel array.
///
/// Codes are produced before the ADC offset is applied and clamped to 12 bits afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticSensor {
    black_level: u16,
    dark_sigma: u16,
    noise: u16,
    seed: u64,
    fpn_amplitude: u16,
    gain_cal_base: u16,
    dead_channel: Option<usize>,
    channels: usize,
}

impl Default for SyntheticSensor {
    fn default() -> Self {
        Self {
            black_level: 100,
            dark_sigma: 0,
            noise: 0,
            seed: 0,
            fpn_amplitude: 0,
            gain_cal_base: 100,
            dead_channel: None,
            channels: 16,
        }
    }
}

impl SyntheticSensor {
    const MAX_CODE: i32 = 4095;
    const GAIN_CAL_SLOPE: f64 = 110.;
    const GAIN_CAL_SLOPE_PER_CHANNEL: f64 = 2.;
    const GAIN_CAL_CURVE: f64 = 0.5;

    /// Sets the black level of dark and active pixels.
    pub fn with_black_level(mut self, black_level: u16) -> Self {
        self.black_level = black_level;
        self
    }

    /// Sets the deviation of dark rows around the black level.
    ///
    /// Even dark rows sit `sigma` above the black level and odd ones `sigma` below.
    pub fn with_dark_sigma(mut self, sigma: u16) -> Self {
        self.dark_sigma = sigma;
        self
    }

    /// Adds uniform noise of `±amplitude` codes drawn from a generator seeded with `seed`.
    pub fn with_noise(mut self, amplitude: u16, seed: u64) -> Self {
        self.noise = amplitude;
        self.seed = seed;
        self
    }

    /// Adds a fixed pattern of up to `amplitude` codes to active pixels.
    pub fn with_fpn_amplitude(mut self, amplitude: u16) -> Self {
        self.fpn_amplitude = amplitude;
        self
    }

    /// Sets the code at zero dummy voltage during gain calibration.
    pub fn with_gain_cal_base(mut self, base: u16) -> Self {
        self.gain_cal_base = base;
        self
    }

    /// Makes a channel ignore the dummy voltage.
    pub fn with_dead_channel(mut self, channel: usize) -> Self {
        self.dead_channel = Some(channel);
        self
    }

    pub(crate) const fn noise(&self) -> u16 {
        self.noise
    }

    pub(crate) const fn seed(&self) -> u64 {
        self.seed
    }

    fn clamp(code: i32) -> u16 {
        code.clamp(0, Self::MAX_CODE) as u16
    }

    /// Fixed-pattern offset of an active pixel.
    pub fn fpn(&self, col: u32, row: u32) -> u16 {
        if self.fpn_amplitude == 0 {
            return 0;
        }
        ((col * 7 + row * 3) % (self.fpn_amplitude as u32 + 1)) as u16
    }

    /// Code of a dark row pixel before noise.
    pub fn dark_code(&self, offset: i32, row: u32) -> u16 {
        let sigma = self.dark_sigma as i32;
        let deviation = if row % 2 == 0 { sigma } else { -sigma };
        Self::clamp(self.black_level as i32 + offset + deviation)
    }

    /// Code of an active pixel before noise.
    pub fn active_code(&self, offset: i32, col: u32, row: u32) -> u16 {
        Self::clamp(self.black_level as i32 + offset + self.fpn(col, row) as i32)
    }

    /// Code of a pixel in column `col` during gain calibration at dummy voltage step `v`.
    pub fn gain_cal_code(&self, col: usize, offset: i32, v: u32) -> u16 {
        let channel = col % self.channels;
        let base = self.gain_cal_base as f64 + offset as f64;
        if self.dead_channel == Some(channel) {
            return Self::clamp(base as i32);
        }
        let v = v as f64;
        let slope = Self::GAIN_CAL_SLOPE + Self::GAIN_CAL_SLOPE_PER_CHANNEL * channel as f64;
        Self::clamp((base + slope * v + Self::GAIN_CAL_CURVE * v * v) as i32)
    }
}
