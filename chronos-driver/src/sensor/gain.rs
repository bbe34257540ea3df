use chronos_core::transport::{Dac, Register, Transport};

use crate::error::ChronosDriverError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GainConfig {
    pub vrstb: f64,
    pub vrst: f64,
    pub vrsth: f64,
    pub sampling_cap: u32,
    pub feedback_cap: u32,
    pub serial_gain: u32,
}

impl GainConfig {
    pub(crate) const fn lookup(gain: u8) -> Option<Self> {
        let (vrstb, vrst, vrsth, sampling_cap, feedback_cap, serial_gain) = match gain {
            1 => (2.7, 3.3, 3.6, 0x007f, 0x007f, 0x3),
            2 => (2.7, 3.3, 3.6, 0x0fff, 0x007f, 0x3),
            4 => (2.7, 3.3, 3.6, 0x0fff, 0x007f, 0x0),
            8 => (1.7, 2.3, 2.6, 0x0fff, 0x0007, 0x0),
            16 => (1.7, 2.3, 2.6, 0x0fff, 0x0001, 0x0),
            _ => return None,
        };
        Some(Self {
            vrstb,
            vrst,
            vrsth,
            sampling_cap,
            feedback_cap,
            serial_gain,
        })
    }

    pub(crate) fn apply<T: Transport>(&self, transport: &mut T) -> Result<(), ChronosDriverError> {
        transport.set_dac(Dac::Vrstb, self.vrstb)?;
        transport.set_dac(Dac::Vrst, self.vrst)?;
        transport.set_dac(Dac::Vrsth, self.vrsth)?;
        transport.write_register(Register::GainSelSamp, self.sampling_cap)?;
        transport.write_register(Register::GainSelFb, self.feedback_cap)?;
        transport.write_register(Register::GainBit, self.serial_gain)?;
        Ok(())
    }
}
