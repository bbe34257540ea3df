pub mod fpga;
pub mod sensor;
mod wavetable;

pub use fpga::{Access, FpgaEmulator};
pub use sensor::SyntheticSensor;
pub use wavetable::lux1310_wavetables;
