mod flip;

use std::collections::HashMap;

use chronos_core::{
    fixed::decode_adc_offset,
    timing::{Page, TimingMicroOp},
    transport::{
        seq_control, seq_status, Dac, Register, Transport, TransportError, NUM_DIMM_SLOTS,
    },
    wavetable::Wavetables,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{lux1310_wavetables, SyntheticSensor};

use flip::FlipEngine;

const CHIP_ID: u32 = 0xDA;
const TIMING_VERSION: u32 = 2;
const COLUMNS: usize = 1280;
const ADC_CHANNELS: usize = 16;
const UNITY_GAIN: u16 = 1 << 12;

/// A hardware access recorded by [`FpgaEmulator`].
#[derive(Clone, Debug, PartialEq)]
pub enum Access {
    /// Register write.
    Register(Register, u32),
    /// DAC write.
    Dac(Dac, f64),
    /// Timing program write.
    Program(Page),
    /// Flip request.
    Flip,
    /// Timing engine reset.
    ForceReset,
    /// Wavetable load.
    Wavetable,
    /// Column gain write.
    ColumnGain(usize),
    /// FPN image write.
    Fpn,
    /// Sequencer program write.
    SequencerProgram,
}

/// An in-memory FPGA and image sensor implementing [`Transport`].
///
/// Writes are recorded in a log. Live frames are synthesized from a [`SyntheticSensor`]
/// using the ADC offsets, readout window and wavetable currently loaded.
#[derive(Debug)]
pub struct FpgaEmulator {
    registers: HashMap<Register, u32>,
    dacs: HashMap<Dac, f64>,
    pages: [Vec<TimingMicroOp>; 2],
    flip: FlipEngine,
    wavetable: Vec<u8>,
    catalog: Wavetables,
    column_gain: Vec<(u16, u16)>,
    fpn: Vec<u32>,
    sequencer_program: Vec<u64>,
    dimms: [Option<u64>; NUM_DIMM_SLOTS],
    log: Vec<Access>,
    synthetic: SyntheticSensor,
    rng: StdRng,
}

impl FpgaEmulator {
    /// Memory installed in the first slot by default.
    pub const DEFAULT_MEMORY_BYTES: u64 = 8 << 30;

    /// Creates an emulator with an 8 GiB module, a LUX1310 and the default [`SyntheticSensor`].
    pub fn new() -> Self {
        let synthetic = SyntheticSensor::default();
        Self {
            registers: [
                (Register::ChipId, CHIP_ID),
                (Register::TimingVersion, TIMING_VERSION),
            ]
            .into_iter()
            .collect(),
            dacs: HashMap::new(),
            pages: [Vec::new(), Vec::new()],
            flip: FlipEngine::default(),
            wavetable: Vec::new(),
            catalog: lux1310_wavetables(),
            column_gain: vec![(UNITY_GAIN, 0); COLUMNS],
            fpn: Vec::new(),
            sequencer_program: Vec::new(),
            dimms: [Some(Self::DEFAULT_MEMORY_BYTES), None],
            log: Vec::new(),
            rng: StdRng::seed_from_u64(synthetic.seed()),
            synthetic,
        }
    }

    /// Replaces the image source.
    pub fn with_synthetic(mut self, synthetic: SyntheticSensor) -> Self {
        self.rng = StdRng::seed_from_u64(synthetic.seed());
        self.synthetic = synthetic;
        self
    }

    /// Replaces the installed memory modules.
    pub fn with_dimms(mut self, dimms: [Option<u64>; NUM_DIMM_SLOTS]) -> Self {
        self.dimms = dimms;
        self
    }

    /// Replaces the chip ID reported by the sensor.
    pub fn with_chip_id(mut self, chip_id: u32) -> Self {
        self.registers.insert(Register::ChipId, chip_id);
        self
    }

    /// Current value of a register. Registers never written read as zero.
    pub fn register(&self, reg: Register) -> u32 {
        self.registers.get(&reg).copied().unwrap_or(0)
    }

    /// Sets a register without recording it in the log.
    pub fn set_register(&mut self, reg: Register, value: u32) {
        self.registers.insert(reg, value);
    }

    /// Last voltage written to a DAC.
    pub fn dac(&self, dac: Dac) -> Option<f64> {
        self.dacs.get(&dac).copied()
    }

    /// Timing program in a page.
    pub fn program(&self, page: Page) -> &[TimingMicroOp] {
        &self.pages[page as usize]
    }

    /// Page the timing engine is running.
    pub fn active_page(&self) -> Page {
        self.flip.active()
    }

    /// Makes the timing engine busy until it is reset.
    pub fn stall_flip(&mut self) {
        self.flip.stall();
    }

    /// Makes each flip take effect after `polls` busy polls.
    pub fn set_flip_latency(&mut self, polls: u32) {
        self.flip.set_latency(polls);
    }

    /// Number of flips requested.
    pub fn flip_count(&self) -> usize {
        self.flip.flip_count()
    }

    /// Number of timing engine resets.
    pub fn force_reset_count(&self) -> usize {
        self.flip.force_reset_count()
    }

    /// Recorded accesses, oldest first.
    pub fn write_log(&self) -> &[Access] {
        &self.log
    }

    /// Clears the access log.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Gain and curvature registers of a display column.
    pub fn column_gain(&self, column: usize) -> (u16, u16) {
        self.column_gain.get(column).copied().unwrap_or_default()
    }

    /// Packed FPN image.
    pub fn fpn(&self) -> &[u32] {
        &self.fpn
    }

    /// Sequencer program.
    pub fn sequencer_program(&self) -> &[u64] {
        &self.sequencer_program
    }

    /// Wavetable loaded in the sensor.
    pub fn wavetable(&self) -> &[u8] {
        &self.wavetable
    }

    /// Returns `true` if a gain calibration wavetable is loaded.
    pub fn is_gain_cal_mode(&self) -> bool {
        !self.wavetable.is_empty()
            && self
                .catalog
                .iter()
                .any(|wt| wt.gain_cal_table == self.wavetable)
    }

    fn adc_offset(&self, col: usize) -> i32 {
        decode_adc_offset(self.register(Register::AdcOffset((col % ADC_CHANNELS) as u8)))
    }

    fn noise(&mut self) -> i32 {
        let amplitude = self.synthetic.noise() as i32;
        if amplitude == 0 {
            return 0;
        }
        self.rng.random_range(-amplitude..=amplitude)
    }

    fn pixel(&mut self, col: u32, row: u32, dark_rows: u32, step: Option<u32>) -> u16 {
        let offset = self.adc_offset(col as usize);
        match step {
            Some(v) => self.synthetic.gain_cal_code(col as usize, offset, v),
            None => {
                let code = if row < dark_rows {
                    self.synthetic.dark_code(offset, row)
                } else {
                    self.synthetic.active_code(offset, col, row - dark_rows)
                };
                (code as i32 + self.noise()).clamp(0, 4095) as u16
            }
        }
    }

    fn write_sequencer_control(&mut self, value: u32) {
        let status = self.register(Register::SeqStatus);
        if value & seq_control::START_REC != 0 {
            tracing::debug!("Sequencer recording");
            self.set_register(Register::SeqStatus, status | seq_status::RECORDING);
        } else if value & seq_control::STOP_REC != 0 {
            tracing::debug!("Sequencer stopped");
            self.set_register(Register::SeqStatus, status & !seq_status::RECORDING);
        }
    }
}

impl Default for FpgaEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for FpgaEmulator {
    fn read_register(&mut self, reg: Register) -> Result<u32, TransportError> {
        Ok(self.register(reg))
    }

    fn write_register(&mut self, reg: Register, value: u32) -> Result<(), TransportError> {
        if matches!(reg, Register::ChipId | Register::SeqStatus | Register::TimingVersion) {
            return Err(TransportError::new(format!("{reg} is read-only")));
        }
        self.log.push(Access::Register(reg, value));
        self.set_register(reg, value);
        if reg == Register::SeqControl {
            self.write_sequencer_control(value);
        }
        Ok(())
    }

    fn set_dac(&mut self, dac: Dac, volts: f64) -> Result<(), TransportError> {
        self.log.push(Access::Dac(dac, volts));
        self.dacs.insert(dac, volts);
        Ok(())
    }

    fn write_program(&mut self, page: Page, ops: &[TimingMicroOp]) -> Result<(), TransportError> {
        if page == self.flip.active() {
            return Err(TransportError::new(format!(
                "Page {page:?} is running and cannot be written"
            )));
        }
        self.log.push(Access::Program(page));
        self.pages[page as usize] = ops.to_vec();
        Ok(())
    }

    fn request_flip(&mut self) -> Result<(), TransportError> {
        self.log.push(Access::Flip);
        self.flip.request();
        Ok(())
    }

    fn is_flip_busy(&mut self) -> Result<bool, TransportError> {
        Ok(self.flip.poll_busy())
    }

    fn force_reset(&mut self) -> Result<(), TransportError> {
        self.log.push(Access::ForceReset);
        self.flip.force_reset();
        Ok(())
    }

    fn write_wavetable(&mut self, table: &[u8]) -> Result<(), TransportError> {
        self.log.push(Access::Wavetable);
        self.wavetable = table.to_vec();
        Ok(())
    }

    fn write_column_gain(
        &mut self,
        column: usize,
        gain: u16,
        curve: u16,
    ) -> Result<(), TransportError> {
        let entry = self
            .column_gain
            .get_mut(column)
            .ok_or_else(|| TransportError::new(format!("Column {column} out of range")))?;
        *entry = (gain, curve);
        self.log.push(Access::ColumnGain(column));
        Ok(())
    }

    fn write_fpn(&mut self, words: &[u32]) -> Result<(), TransportError> {
        self.log.push(Access::Fpn);
        self.fpn = words.to_vec();
        Ok(())
    }

    fn write_sequencer_program(&mut self, commands: &[u64]) -> Result<(), TransportError> {
        self.log.push(Access::SequencerProgram);
        self.sequencer_program = commands.to_vec();
        Ok(())
    }

    fn read_live_frame(&mut self, h_res: u32, v_res: u32) -> Result<Vec<u16>, TransportError> {
        let dark_rows = self.register(Register::NbDrkRows);
        let step = self
            .is_gain_cal_mode()
            .then(|| self.register(Register::SelVdumrst));
        Ok((0..v_res)
            .flat_map(|row| (0..h_res).map(move |col| (col, row)))
            .map(|(col, row)| self.pixel(col, row, dark_rows, step))
            .collect())
    }

    fn probe_dimm(&mut self, slot: usize) -> Option<u64> {
        self.dimms.get(slot).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use chronos_core::{fixed::encode_adc_offset, timing::Signals};

    use super::*;

    #[test]
    fn registers() -> anyhow::Result<()> {
        let mut emulator = FpgaEmulator::new();
        assert_eq!(CHIP_ID, emulator.read_register(Register::ChipId)?);
        assert_eq!(TIMING_VERSION, emulator.timing_version()?);
        assert_eq!(0, emulator.read_register(Register::XStart)?);

        emulator.write_register(Register::XStart, 0x20)?;
        emulator.set_register(Register::XEnd, 0x40);
        assert_eq!(0x20, emulator.read_register(Register::XStart)?);
        assert_eq!(0x40, emulator.read_register(Register::XEnd)?);
        assert_eq!(&[Access::Register(Register::XStart, 0x20)], emulator.write_log());

        assert!(emulator.write_register(Register::ChipId, 0).is_err());
        Ok(())
    }

    #[test]
    fn program_pages() -> anyhow::Result<()> {
        let mut emulator = FpgaEmulator::new();
        let ops = [TimingMicroOp::hold(Signals::ABN, 10), TimingMicroOp::restart()];
        assert!(emulator.write_program(Page::P0, &ops).is_err());

        emulator.write_program(Page::P1, &ops)?;
        emulator.request_flip()?;
        assert!(!emulator.is_flip_busy()?);
        assert_eq!(Page::P1, emulator.active_page());
        assert_eq!(&ops, emulator.program(Page::P1));
        assert!(emulator.program(Page::P0).is_empty());
        Ok(())
    }

    #[test]
    fn sequencer() -> anyhow::Result<()> {
        let mut emulator = FpgaEmulator::new();
        emulator.write_register(Register::SeqControl, seq_control::START_REC)?;
        emulator.write_register(Register::SeqControl, 0)?;
        assert_eq!(seq_status::RECORDING, emulator.register(Register::SeqStatus));
        emulator.write_register(Register::SeqControl, seq_control::STOP_REC)?;
        assert_eq!(0, emulator.register(Register::SeqStatus));
        Ok(())
    }

    #[test]
    fn dark_and_active_rows() -> anyhow::Result<()> {
        let mut emulator = FpgaEmulator::new().with_synthetic(
            SyntheticSensor::default()
                .with_dark_sigma(4)
                .with_fpn_amplitude(15),
        );
        emulator.write_register(Register::NbDrkRows, 2)?;
        emulator.write_register(Register::AdcOffset(1), encode_adc_offset(-50))?;

        let frame = emulator.read_live_frame(32, 4)?;
        assert_eq!(32 * 4, frame.len());
        assert_eq!(104, frame[0]);
        assert_eq!(104 - 50, frame[1]);
        assert_eq!(96, frame[32]);
        assert_eq!(100, frame[64]);
        assert_eq!(100 + 7 - 50, frame[65]);
        assert_eq!(100 + 3, frame[96]);
        Ok(())
    }

    #[test]
    fn gain_cal_rows() -> anyhow::Result<()> {
        let mut emulator = FpgaEmulator::new();
        let catalog = lux1310_wavetables();
        emulator.write_wavetable(&catalog.longest().gain_cal_table)?;
        emulator.write_register(Register::SelVdumrst, 10)?;
        assert!(emulator.is_gain_cal_mode());

        let frame = emulator.read_live_frame(16, 2)?;
        let synthetic = SyntheticSensor::default();
        (0..32).for_each(|i| {
            assert_eq!(synthetic.gain_cal_code(i % 16, 0, 10), frame[i]);
        });

        emulator.write_wavetable(&catalog.longest().normal_table)?;
        assert!(!emulator.is_gain_cal_mode());
        Ok(())
    }

    #[test]
    fn seeded_noise() -> anyhow::Result<()> {
        let synthetic = SyntheticSensor::default().with_noise(3, 42);
        let mut a = FpgaEmulator::new().with_synthetic(synthetic.clone());
        let mut b = FpgaEmulator::new().with_synthetic(synthetic);
        let frame = a.read_live_frame(64, 4)?;
        assert_eq!(frame, b.read_live_frame(64, 4)?);
        assert!(frame.iter().all(|&v| (97..=103).contains(&v)));
        assert!(frame.iter().any(|&v| v != 100));
        Ok(())
    }

    #[rstest::rstest]
    #[case(FpgaEmulator::DEFAULT_MEMORY_BYTES / 32, [Some(FpgaEmulator::DEFAULT_MEMORY_BYTES), None])]
    #[case((32 << 30) / 32, [Some(16 << 30), Some(16 << 30)])]
    #[case(0, [None, None])]
    fn memory(#[case] expect: u64, #[case] dimms: [Option<u64>; NUM_DIMM_SLOTS]) {
        let mut emulator = FpgaEmulator::new().with_dimms(dimms);
        assert_eq!(expect, emulator.installed_memory_words());
        assert_eq!(None, emulator.probe_dimm(NUM_DIMM_SLOTS));
    }
}
