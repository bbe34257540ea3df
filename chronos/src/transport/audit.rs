use chronos_core::{
    timing::{Page, TimingMicroOp},
    transport::{Dac, Register, Transport, TransportError, NUM_DIMM_SLOTS},
};
use chronos_firmware_emulator::{FpgaEmulator, SyntheticSensor};

#[derive(Default, Clone, Debug)]
#[doc(hidden)]
pub struct AuditOption {
    pub synthetic: SyntheticSensor,
    pub dimms: Option<[Option<u64>; NUM_DIMM_SLOTS]>,
    pub chip_id: Option<u32>,
    pub broken: bool,
}

#[derive(Debug)]
#[doc(hidden)]
pub struct Audit {
    emulator: FpgaEmulator,
    broken: bool,
}

impl std::ops::Deref for Audit {
    type Target = FpgaEmulator;

    fn deref(&self) -> &Self::Target {
        &self.emulator
    }
}

impl std::ops::DerefMut for Audit {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.emulator
    }
}

impl Audit {
    pub fn new(option: AuditOption) -> Self {
        let mut emulator = FpgaEmulator::new().with_synthetic(option.synthetic);
        if let Some(dimms) = option.dimms {
            emulator = emulator.with_dimms(dimms);
        }
        if let Some(chip_id) = option.chip_id {
            emulator = emulator.with_chip_id(chip_id);
        }
        Self {
            emulator,
            broken: option.broken,
        }
    }

    pub const fn break_down(&mut self) {
        self.broken = true;
    }

    pub const fn repair(&mut self) {
        self.broken = false;
    }

    fn ensure_working(&self) -> Result<(), TransportError> {
        if self.broken {
            return Err(TransportError::new("broken".to_string()));
        }
        Ok(())
    }
}

impl Transport for Audit {
    fn read_register(&mut self, reg: Register) -> Result<u32, TransportError> {
        self.ensure_working()?;
        self.emulator.read_register(reg)
    }

    fn write_register(&mut self, reg: Register, value: u32) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.write_register(reg, value)
    }

    fn set_dac(&mut self, dac: Dac, volts: f64) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.set_dac(dac, volts)
    }

    fn write_program(&mut self, page: Page, ops: &[TimingMicroOp]) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.write_program(page, ops)
    }

    fn request_flip(&mut self) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.request_flip()
    }

    fn is_flip_busy(&mut self) -> Result<bool, TransportError> {
        self.ensure_working()?;
        self.emulator.is_flip_busy()
    }

    fn force_reset(&mut self) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.force_reset()
    }

    fn write_wavetable(&mut self, table: &[u8]) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.write_wavetable(table)
    }

    fn write_column_gain(
        &mut self,
        column: usize,
        gain: u16,
        curve: u16,
    ) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.write_column_gain(column, gain, curve)
    }

    fn write_fpn(&mut self, words: &[u32]) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.write_fpn(words)
    }

    fn write_sequencer_program(&mut self, commands: &[u64]) -> Result<(), TransportError> {
        self.ensure_working()?;
        self.emulator.write_sequencer_program(commands)
    }

    fn read_live_frame(&mut self, h_res: u32, v_res: u32) -> Result<Vec<u16>, TransportError> {
        self.ensure_working()?;
        self.emulator.read_live_frame(h_res, v_res)
    }

    fn probe_dimm(&mut self, slot: usize) -> Option<u64> {
        if self.broken {
            return None;
        }
        self.emulator.probe_dimm(slot)
    }
}
