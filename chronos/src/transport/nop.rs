use chronos_core::{
    timing::{Page, TimingMicroOp},
    transport::{Dac, Register, Transport, TransportError},
};
use chronos_firmware_emulator::FpgaEmulator;

/// A [`Transport`] without hardware behind it.
///
/// Every access is accepted and live frames show a flat black level. This transport is
/// mainly used for explanation.
#[derive(Debug, Default)]
pub struct Nop {
    emulator: FpgaEmulator,
}

impl Nop {
    /// Creates a new [`Nop`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for Nop {
    fn read_register(&mut self, reg: Register) -> Result<u32, TransportError> {
        self.emulator.read_register(reg)
    }

    fn write_register(&mut self, reg: Register, value: u32) -> Result<(), TransportError> {
        self.emulator.write_register(reg, value)
    }

    fn set_dac(&mut self, dac: Dac, volts: f64) -> Result<(), TransportError> {
        self.emulator.set_dac(dac, volts)
    }

    fn write_program(&mut self, page: Page, ops: &[TimingMicroOp]) -> Result<(), TransportError> {
        self.emulator.write_program(page, ops)
    }

    fn request_flip(&mut self) -> Result<(), TransportError> {
        self.emulator.request_flip()
    }

    fn is_flip_busy(&mut self) -> Result<bool, TransportError> {
        self.emulator.is_flip_busy()
    }

    fn force_reset(&mut self) -> Result<(), TransportError> {
        self.emulator.force_reset()
    }

    fn write_wavetable(&mut self, table: &[u8]) -> Result<(), TransportError> {
        self.emulator.write_wavetable(table)
    }

    fn write_column_gain(
        &mut self,
        column: usize,
        gain: u16,
        curve: u16,
    ) -> Result<(), TransportError> {
        self.emulator.write_column_gain(column, gain, curve)
    }

    fn write_fpn(&mut self, words: &[u32]) -> Result<(), TransportError> {
        self.emulator.write_fpn(words)
    }

    fn write_sequencer_program(&mut self, commands: &[u64]) -> Result<(), TransportError> {
        self.emulator.write_sequencer_program(commands)
    }

    fn read_live_frame(&mut self, h_res: u32, v_res: u32) -> Result<Vec<u16>, TransportError> {
        self.emulator.read_live_frame(h_res, v_res)
    }

    fn probe_dimm(&mut self, slot: usize) -> Option<u64> {
        self.emulator.probe_dimm(slot)
    }
}
