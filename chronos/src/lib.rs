#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Control library for the Chronos high-speed camera sensor.
//!
//! ```
//! # use chronos::prelude::*;
//! # use chronos_firmware_emulator::lux1310_wavetables;
//! # fn main() -> Result<(), ChronosError> {
//! let mut camera = Camera::builder(lux1310_wavetables()).open(Nop::new())?;
//!
//! let task = camera.start_reset()?;
//! camera.run(task, &StdSleeper)?.into_value(&mut Vec::new());
//!
//! camera.configure(FrameGeometry::new(640, 480), None, None)?;
//! # Ok(())
//! # }
//! ```

/// [`Camera`] and its procedure runner.
pub mod camera;
/// Error definitions.
pub mod error;
/// A module that contains frequently used items.
pub mod prelude;
/// Emulated transports.
pub mod transport;

pub use chronos_core;
pub use chronos_driver as driver;

pub use camera::Camera;
