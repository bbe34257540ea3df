#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Core traits and types for the Chronos image sensor stack.

/// Calibration coefficients held by the hardware.
pub mod calibration;
/// Conversion between the sensor and timing clock domains.
pub mod clock;
/// Fixed-point encoders used by the ADC correction registers.
pub mod fixed;
/// Frame geometry and its validation.
pub mod geometry;
/// Layout of the frame memory.
pub mod memory;
/// Sensor constants.
pub mod params;
/// Utilities for sleeping between procedure steps.
pub mod sleep;
/// Timing microcode encoding.
pub mod timing;
/// A interface to the camera hardware.
pub mod transport;
/// Analog drive pattern catalog.
pub mod wavetable;
