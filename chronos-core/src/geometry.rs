use thiserror::Error;

/// Resolution limits of an image sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorLimits {
    /// Maximum horizontal resolution.
    pub h_max: u32,
    /// Maximum vertical resolution.
    pub v_max: u32,
    /// Minimum horizontal resolution.
    pub h_min: u32,
    /// Minimum vertical resolution.
    pub v_min: u32,
    /// Horizontal resolution and offset granularity.
    pub h_increment: u32,
    /// Vertical resolution and dark row granularity.
    pub v_increment: u32,
    /// Maximum number of optical-black rows.
    pub v_dark_max: u32,
    /// Bit depth of a pixel.
    pub bit_depth: u32,
}

impl SensorLimits {
    /// Limits of the LUX1310 sensor.
    pub const LUX1310: Self = Self {
        h_max: 1280,
        v_max: 1024,
        h_min: 192,
        v_min: 96,
        h_increment: 16,
        v_increment: 2,
        v_dark_max: 8,
        bit_depth: 12,
    };
}

/// An error produced by [`FrameGeometry::validate`].
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum GeometryError {
    /// Horizontal window does not fit in the pixel array.
    #[error("Horizontal window ({h_res} + {h_offset}) exceeds {h_max}")]
    HorizontalOutOfRange {
        /// Horizontal resolution.
        h_res: u32,
        /// Horizontal offset.
        h_offset: u32,
        /// Maximum horizontal resolution.
        h_max: u32,
    },
    /// Vertical window does not fit in the pixel array.
    #[error("Vertical window ({v_res} + {v_offset}) exceeds {v_max}")]
    VerticalOutOfRange {
        /// Vertical resolution.
        v_res: u32,
        /// Vertical offset.
        v_offset: u32,
        /// Maximum vertical resolution.
        v_max: u32,
    },
    /// Resolution is smaller than the sensor supports.
    #[error("Resolution {h_res}x{v_res} is below minimum {h_min}x{v_min}")]
    BelowMinimum {
        /// Horizontal resolution.
        h_res: u32,
        /// Vertical resolution.
        v_res: u32,
        /// Minimum horizontal resolution.
        h_min: u32,
        /// Minimum vertical resolution.
        v_min: u32,
    },
    /// A horizontal quantity is not a multiple of the increment.
    #[error("Horizontal {name} ({value}) must be a multiple of {increment}")]
    HorizontalAlignment {
        /// Name of the misaligned quantity.
        name: &'static str,
        /// Value of the misaligned quantity.
        value: u32,
        /// Required increment.
        increment: u32,
    },
    /// A vertical quantity is not a multiple of the increment.
    #[error("Vertical {name} ({value}) must be a multiple of {increment}")]
    VerticalAlignment {
        /// Name of the misaligned quantity.
        name: &'static str,
        /// Value of the misaligned quantity.
        value: u32,
        /// Required increment.
        increment: u32,
    },
    /// Too many dark rows.
    #[error("Dark rows ({v_dark}) exceed {v_dark_max}")]
    DarkRowsOutOfRange {
        /// Number of dark rows.
        v_dark: u32,
        /// Maximum number of dark rows.
        v_dark_max: u32,
    },
    /// Bit depth does not match the sensor.
    #[error("Bit depth ({bit_depth}) must be {expected}")]
    BitDepthMismatch {
        /// Requested bit depth.
        bit_depth: u32,
        /// Sensor bit depth.
        expected: u32,
    },
}

/// Readout window of the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameGeometry {
    /// Horizontal resolution.
    pub h_res: u32,
    /// Vertical resolution.
    pub v_res: u32,
    /// Horizontal offset.
    pub h_offset: u32,
    /// Vertical offset.
    pub v_offset: u32,
    /// Number of optical-black rows read out with each frame.
    pub v_dark_rows: u32,
    /// Bit depth of a pixel.
    pub bit_depth: u32,
}

impl FrameGeometry {
    /// Creates a new [`FrameGeometry`] at the origin with no dark rows and 12-bit pixels.
    #[must_use]
    pub const fn new(h_res: u32, v_res: u32) -> Self {
        Self {
            h_res,
            v_res,
            h_offset: 0,
            v_offset: 0,
            v_dark_rows: 0,
            bit_depth: 12,
        }
    }

    /// The maximum readout window of a sensor.
    #[must_use]
    pub const fn full_frame(limits: &SensorLimits) -> Self {
        Self {
            h_res: limits.h_max,
            v_res: limits.v_max,
            h_offset: 0,
            v_offset: 0,
            v_dark_rows: limits.v_dark_max,
            bit_depth: limits.bit_depth,
        }
    }

    /// Sets the window offset.
    #[must_use]
    pub const fn with_offset(mut self, h_offset: u32, v_offset: u32) -> Self {
        self.h_offset = h_offset;
        self.v_offset = v_offset;
        self
    }

    /// Sets the number of dark rows.
    #[must_use]
    pub const fn with_dark_rows(mut self, v_dark_rows: u32) -> Self {
        self.v_dark_rows = v_dark_rows;
        self
    }

    /// Sets the bit depth.
    #[must_use]
    pub const fn with_bit_depth(mut self, bit_depth: u32) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Number of rows read out per frame, including dark rows.
    #[must_use]
    pub const fn total_rows(&self) -> u32 {
        self.v_res + self.v_dark_rows
    }

    /// Size of a packed frame in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.h_res as u64 * self.total_rows() as u64 * self.bit_depth as u64 / 8
    }

    /// Checks the geometry against the sensor limits.
    pub fn validate(self, limits: &SensorLimits) -> Result<Self, GeometryError> {
        if self.h_res < limits.h_min || self.v_res < limits.v_min {
            return Err(GeometryError::BelowMinimum {
                h_res: self.h_res,
                v_res: self.v_res,
                h_min: limits.h_min,
                v_min: limits.v_min,
            });
        }
        if self.h_res + self.h_offset > limits.h_max {
            return Err(GeometryError::HorizontalOutOfRange {
                h_res: self.h_res,
                h_offset: self.h_offset,
                h_max: limits.h_max,
            });
        }
        if self.v_res + self.v_offset > limits.v_max {
            return Err(GeometryError::VerticalOutOfRange {
                v_res: self.v_res,
                v_offset: self.v_offset,
                v_max: limits.v_max,
            });
        }
        if self.v_dark_rows > limits.v_dark_max {
            return Err(GeometryError::DarkRowsOutOfRange {
                v_dark: self.v_dark_rows,
                v_dark_max: limits.v_dark_max,
            });
        }
        [("resolution", self.h_res), ("offset", self.h_offset)]
            .into_iter()
            .try_for_each(|(name, value)| {
                if value % limits.h_increment != 0 {
                    return Err(GeometryError::HorizontalAlignment {
                        name,
                        value,
                        increment: limits.h_increment,
                    });
                }
                Ok(())
            })?;
        [("resolution", self.v_res), ("dark rows", self.v_dark_rows)]
            .into_iter()
            .try_for_each(|(name, value)| {
                if value % limits.v_increment != 0 {
                    return Err(GeometryError::VerticalAlignment {
                        name,
                        value,
                        increment: limits.v_increment,
                    });
                }
                Ok(())
            })?;
        if self.bit_depth != limits.bit_depth {
            return Err(GeometryError::BitDepthMismatch {
                bit_depth: self.bit_depth,
                expected: limits.bit_depth,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: SensorLimits = SensorLimits::LUX1310;

    #[rstest::rstest]
    #[case(Ok(FrameGeometry::new(1280, 1024)), FrameGeometry::new(1280, 1024))]
    #[case(Ok(FrameGeometry::full_frame(&LIMITS)), FrameGeometry::full_frame(&LIMITS))]
    #[case(
        Ok(FrameGeometry::new(640, 480).with_offset(320, 272).with_dark_rows(4)),
        FrameGeometry::new(640, 480).with_offset(320, 272).with_dark_rows(4)
    )]
    #[case(
        Err(GeometryError::HorizontalOutOfRange { h_res: 1280, h_offset: 16, h_max: 1280 }),
        FrameGeometry::new(1280, 1024).with_offset(16, 0)
    )]
    #[case(
        Err(GeometryError::VerticalOutOfRange { v_res: 1024, v_offset: 2, v_max: 1024 }),
        FrameGeometry::new(1280, 1024).with_offset(0, 2)
    )]
    #[case(
        Err(GeometryError::BelowMinimum { h_res: 176, v_res: 96, h_min: 192, v_min: 96 }),
        FrameGeometry::new(176, 96)
    )]
    #[case(
        Err(GeometryError::BelowMinimum { h_res: 0, v_res: 0, h_min: 192, v_min: 96 }),
        FrameGeometry::new(0, 0)
    )]
    #[case(
        Err(GeometryError::HorizontalAlignment { name: "resolution", value: 650, increment: 16 }),
        FrameGeometry::new(650, 480)
    )]
    #[case(
        Err(GeometryError::HorizontalAlignment { name: "offset", value: 8, increment: 16 }),
        FrameGeometry::new(640, 480).with_offset(8, 0)
    )]
    #[case(
        Err(GeometryError::VerticalAlignment { name: "resolution", value: 481, increment: 2 }),
        FrameGeometry::new(640, 481)
    )]
    #[case(
        Err(GeometryError::VerticalAlignment { name: "dark rows", value: 3, increment: 2 }),
        FrameGeometry::new(640, 480).with_dark_rows(3)
    )]
    #[case(
        Err(GeometryError::DarkRowsOutOfRange { v_dark: 10, v_dark_max: 8 }),
        FrameGeometry::new(640, 480).with_dark_rows(10)
    )]
    #[case(
        Err(GeometryError::BitDepthMismatch { bit_depth: 10, expected: 12 }),
        FrameGeometry::new(640, 480).with_bit_depth(10)
    )]
    fn validate(#[case] expect: Result<FrameGeometry, GeometryError>, #[case] geometry: FrameGeometry) {
        assert_eq!(expect, geometry.validate(&LIMITS));
    }

    #[rstest::rstest]
    #[case(1280 * 1032 * 12 / 8, FrameGeometry::full_frame(&LIMITS))]
    #[case(1280 * 1024 * 12 / 8, FrameGeometry::new(1280, 1024))]
    #[case(640 * 484 * 12 / 8, FrameGeometry::new(640, 480).with_dark_rows(4))]
    fn size_bytes(#[case] expect: u64, #[case] geometry: FrameGeometry) {
        assert_eq!(expect, geometry.size_bytes());
    }
}
