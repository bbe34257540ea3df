use chronos_core::transport::Transport;
use itertools::Itertools;

use crate::{
    error::ChronosDriverError,
    procedure::{Procedure, SensorContext, Step},
};

/// Packs pixels of `bpp` bits into little-endian 32-bit words.
///
/// A pixel that straddles a word boundary continues in the low bits of the next word.
#[must_use]
pub fn pack_pixels(pixels: &[u16], bpp: u32) -> Vec<u32> {
    let bpp = bpp as usize;
    let mask = (1u32 << bpp) - 1;
    let mut words = vec![0u32; (pixels.len() * bpp).div_ceil(32)];
    pixels.iter().enumerate().for_each(|(n, &pix)| {
        let pix = pix as u32 & mask;
        let index = (bpp * n) / 32;
        let shift = (bpp * n) % 32;
        words[index] |= pix << shift;
        if shift + bpp > 32 {
            words[index + 1] |= pix >> (32 - shift);
        }
    });
    words
}

/// Averages live frames into a fixed-pattern noise image and loads it into the FPGA.
///
/// Completes with the soft gain that restores full scale after the FPN subtraction.
#[derive(Clone, Debug, PartialEq)]
pub struct BlackCalibration {
    num_frames: u32,
    collected: u32,
    sum: Vec<u64>,
}

impl BlackCalibration {
    /// Creates a new [`BlackCalibration`] averaging `num_frames` frames.
    #[must_use]
    pub const fn new(num_frames: u32) -> Self {
        Self {
            num_frames: if num_frames == 0 { 1 } else { num_frames },
            collected: 0,
            sum: Vec::new(),
        }
    }

    fn finish<T: Transport>(&mut self, ctx: &mut SensorContext<T>) -> Result<f64, ChronosDriverError> {
        let bpp = ctx.geometry.bit_depth;
        let average = self
            .sum
            .iter()
            .map(|&s| (s / self.collected as u64) as u16)
            .collect::<Vec<_>>();
        let (min, max) = average.iter().copied().minmax().into_option().unwrap_or((0, 0));
        let max = max - min;
        let fpn = average.into_iter().map(|v| v - min).collect::<Vec<_>>();

        ctx.transport.write_fpn(&pack_pixels(&fpn, bpp))?;

        let full_scale = (1u32 << bpp) as f64;
        let softgain = full_scale / (full_scale - max as f64);
        tracing::info!(
            "Black calibration done over {} frames: max FPN {}, soft gain {:.4}",
            self.collected,
            max,
            softgain
        );
        Ok(softgain)
    }
}

impl<T: Transport> Procedure<T> for BlackCalibration {
    type Output = f64;

    fn step(&mut self, ctx: &mut SensorContext<T>) -> Result<Step<f64>, ChronosDriverError> {
        let geometry = ctx.geometry;
        if self.sum.is_empty() {
            tracing::info!("Starting black calibration ({} frames)", self.num_frames);
            self.sum = vec![0; (geometry.h_res * geometry.total_rows()) as usize];
            return Ok(Step::Wait(ctx.frame_periods(1)));
        }

        let frame = ctx
            .transport
            .read_live_frame(geometry.h_res, geometry.total_rows())?;
        if frame.len() < self.sum.len() {
            return Err(ChronosDriverError::HardwareFault(format!(
                "Short live frame: {} < {}",
                frame.len(),
                self.sum.len()
            )));
        }
        self.sum
            .iter_mut()
            .zip(frame)
            .for_each(|(s, v)| *s += v as u64);
        self.collected += 1;
        tracing::debug!("Black calibration frame {}/{}", self.collected, self.num_frames);

        if self.collected < self.num_frames {
            return Ok(Step::Wait(ctx.frame_periods(1)));
        }
        Ok(Step::Done(self.finish(ctx)?))
    }
}
