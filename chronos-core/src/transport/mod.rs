mod error;
mod register;

pub use error::TransportError;
pub use register::{seq_control, seq_status, Dac, Register, DISPLAY_GAIN_3POINT};

use crate::{memory::BYTES_PER_WORD, timing::{Page, TimingMicroOp}};

/// Mean and population standard deviation of the samples digitized by one ADC channel.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ChannelStats {
    /// Mean code.
    pub mean: f64,
    /// Population standard deviation of the per-pixel averages.
    pub std_dev: f64,
}

/// Number of memory slots probed by [`Transport::installed_memory_words`].
pub const NUM_DIMM_SLOTS: usize = 2;

/// A trait that provides the interface with the camera hardware.
///
/// All accesses are synchronous and the implementor is never called reentrantly.
pub trait Transport: Send {
    /// Reads a register.
    fn read_register(&mut self, reg: Register) -> Result<u32, TransportError>;

    /// Writes a register.
    fn write_register(&mut self, reg: Register, value: u32) -> Result<(), TransportError>;

    /// Sets a sensor bias DAC to the given voltage.
    fn set_dac(&mut self, dac: Dac, volts: f64) -> Result<(), TransportError>;

    /// Writes a timing program into a page.
    fn write_program(&mut self, page: Page, ops: &[TimingMicroOp]) -> Result<(), TransportError>;

    /// Requests the timing engine to switch to the other page at the end of the current frame.
    fn request_flip(&mut self) -> Result<(), TransportError>;

    /// Returns `true` while a requested flip has not taken effect.
    fn is_flip_busy(&mut self) -> Result<bool, TransportError>;

    /// Resets the timing engine so a pending flip takes effect immediately.
    fn force_reset(&mut self) -> Result<(), TransportError>;

    /// Loads an analog drive pattern into the sensor.
    fn write_wavetable(&mut self, table: &[u8]) -> Result<(), TransportError>;

    /// Writes the gain and curvature correction of a display column.
    fn write_column_gain(
        &mut self,
        column: usize,
        gain: u16,
        curve: u16,
    ) -> Result<(), TransportError>;

    /// Writes the packed fixed-pattern noise image.
    fn write_fpn(&mut self, words: &[u32]) -> Result<(), TransportError>;

    /// Writes the recording sequencer program.
    fn write_sequencer_program(&mut self, commands: &[u64]) -> Result<(), TransportError>;

    /// Reads the first `v_res` rows of the most recent live frame.
    fn read_live_frame(&mut self, h_res: u32, v_res: u32) -> Result<Vec<u16>, TransportError>;

    /// Returns the version of the FPGA timing core.
    fn timing_version(&mut self) -> Result<u32, TransportError> {
        self.read_register(Register::TimingVersion)
    }

    /// Returns the size of the memory module in `slot` in bytes, or `None` if the slot is empty.
    fn probe_dimm(&mut self, slot: usize) -> Option<u64>;

    /// Returns the installed frame memory in words.
    fn installed_memory_words(&mut self) -> u64 {
        (0..NUM_DIMM_SLOTS)
            .filter_map(|slot| self.probe_dimm(slot))
            .sum::<u64>()
            / BYTES_PER_WORD
    }

    /// Averages `frame_count` live frames over the first `row_count` rows and returns
    /// per-channel statistics. A column belongs to channel `column % channels`.
    fn read_averaged_rows(
        &mut self,
        h_res: u32,
        row_count: u32,
        frame_count: u32,
        channels: usize,
    ) -> Result<Vec<ChannelStats>, TransportError> {
        let frame_count = frame_count.max(1);
        let pixels = (h_res * row_count) as usize;
        let mut sum = vec![0u64; pixels];
        for _ in 0..frame_count {
            let frame = self.read_live_frame(h_res, row_count)?;
            if frame.len() < pixels {
                return Err(TransportError::new(format!(
                    "Short live frame: {} < {}",
                    frame.len(),
                    pixels
                )));
            }
            sum.iter_mut()
                .zip(frame)
                .for_each(|(s, v)| *s += v as u64);
        }
        let average = sum
            .into_iter()
            .map(|s| s as f64 / frame_count as f64)
            .collect::<Vec<_>>();

        Ok((0..channels)
            .map(|ch| {
                let samples = average.iter().skip(ch).step_by(channels);
                let n = samples.len() as f64;
                if n == 0. {
                    return ChannelStats::default();
                }
                let mean = samples.clone().sum::<f64>() / n;
                let var = samples.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
                ChannelStats {
                    mean,
                    std_dev: var.sqrt(),
                }
            })
            .collect())
    }
}

impl Transport for Box<dyn Transport> {
    fn read_register(&mut self, reg: Register) -> Result<u32, TransportError> {
        self.as_mut().read_register(reg)
    }

    fn write_register(&mut self, reg: Register, value: u32) -> Result<(), TransportError> {
        self.as_mut().write_register(reg, value)
    }

    fn set_dac(&mut self, dac: Dac, volts: f64) -> Result<(), TransportError> {
        self.as_mut().set_dac(dac, volts)
    }

    fn write_program(&mut self, page: Page, ops: &[TimingMicroOp]) -> Result<(), TransportError> {
        self.as_mut().write_program(page, ops)
    }

    fn request_flip(&mut self) -> Result<(), TransportError> {
        self.as_mut().request_flip()
    }

    fn is_flip_busy(&mut self) -> Result<bool, TransportError> {
        self.as_mut().is_flip_busy()
    }

    fn force_reset(&mut self) -> Result<(), TransportError> {
        self.as_mut().force_reset()
    }

    fn write_wavetable(&mut self, table: &[u8]) -> Result<(), TransportError> {
        self.as_mut().write_wavetable(table)
    }

    fn write_column_gain(
        &mut self,
        column: usize,
        gain: u16,
        curve: u16,
    ) -> Result<(), TransportError> {
        self.as_mut().write_column_gain(column, gain, curve)
    }

    fn write_fpn(&mut self, words: &[u32]) -> Result<(), TransportError> {
        self.as_mut().write_fpn(words)
    }

    fn write_sequencer_program(&mut self, commands: &[u64]) -> Result<(), TransportError> {
        self.as_mut().write_sequencer_program(commands)
    }

    fn read_live_frame(&mut self, h_res: u32, v_res: u32) -> Result<Vec<u16>, TransportError> {
        self.as_mut().read_live_frame(h_res, v_res)
    }

    fn timing_version(&mut self) -> Result<u32, TransportError> {
        self.as_mut().timing_version()
    }

    fn probe_dimm(&mut self, slot: usize) -> Option<u64> {
        self.as_mut().probe_dimm(slot)
    }

    fn installed_memory_words(&mut self) -> u64 {
        self.as_mut().installed_memory_words()
    }

    fn read_averaged_rows(
        &mut self,
        h_res: u32,
        row_count: u32,
        frame_count: u32,
        channels: usize,
    ) -> Result<Vec<ChannelStats>, TransportError> {
        self.as_mut()
            .read_averaged_rows(h_res, row_count, frame_count, channels)
    }
}
