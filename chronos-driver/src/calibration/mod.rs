mod analog;
mod black;
mod gain;
mod offset;

pub use analog::AnalogCalibration;
pub use black::{pack_pixels, BlackCalibration};
pub use gain::{fit_channels, ChannelFit, GainCalibration, GainCalibrationConfig, GainSamples};
pub use offset::{OffsetCalibration, OffsetCalibrationConfig};
