#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Image sensor driver for the Chronos stack: timing microcode, ADC calibration and the
//! recording sequencer.

/// ADC offset, column gain and fixed-pattern noise calibration.
pub mod calibration;
/// Driver state shared by procedures.
pub mod context;
/// Error definitions.
pub mod error;
/// Resumable hardware procedures.
pub mod procedure;
/// Sensor power-up.
pub mod reset;
/// Sensor model.
pub mod sensor;
/// Recording sequencer programs.
pub mod sequencer;
/// Timing program compiler.
pub mod timing;
/// Non-fatal conditions.
pub mod warning;
