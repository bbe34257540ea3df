use bitflags::bitflags;

use crate::geometry::FrameGeometry;

/// Size of a frame memory word in bytes.
pub const BYTES_PER_WORD: u64 = 32;
/// Frames are stored on multiples of this many words.
pub const FRAME_ALIGN_WORDS: u64 = 64;
/// Words reserved for one frame in the calibration and live regions.
pub const MAX_FRAME_WORDS: u64 = 0x10000;
/// Number of frames in the calibration region.
pub const CAL_REGION_FRAMES: u64 = 3;
/// Number of frames in the live display region.
pub const LIVE_REGION_FRAMES: u64 = 3;
/// First word of the calibration region.
pub const CAL_REGION_START: u64 = 0;
/// First word of the live display region.
pub const LIVE_REGION_START: u64 = CAL_REGION_START + MAX_FRAME_WORDS * CAL_REGION_FRAMES;
/// First word of the recording region.
pub const REC_REGION_START: u64 = LIVE_REGION_START + MAX_FRAME_WORDS * LIVE_REGION_FRAMES;

/// Returns the number of words occupied by one frame of `geometry`, rounded up to [`FRAME_ALIGN_WORDS`].
#[must_use]
pub const fn frame_stride_words(geometry: &FrameGeometry) -> u64 {
    let words = geometry.size_bytes().div_ceil(BYTES_PER_WORD);
    words.div_ceil(FRAME_ALIGN_WORDS) * FRAME_ALIGN_WORDS
}

/// A half-open range of frame memory words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    /// First word.
    pub start: u64,
    /// One past the last word.
    pub end: u64,
}

impl MemoryRegion {
    /// Number of words in the region.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the region has no words.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the two regions share a word.
    #[must_use]
    pub const fn overlaps(&self, other: &MemoryRegion) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Layout of the frame memory.
///
/// The calibration and live regions have fixed sizes. The recording region takes the
/// rest of the installed memory; its frame capacity follows the current geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegionMap {
    installed_words: u64,
    frame_stride: u64,
}

impl MemoryRegionMap {
    /// Creates a new [`MemoryRegionMap`].
    #[must_use]
    pub const fn new(installed_words: u64, geometry: &FrameGeometry) -> Self {
        Self {
            installed_words,
            frame_stride: frame_stride_words(geometry),
        }
    }

    /// Recomputes the frame stride after a geometry change. Region boundaries are unchanged.
    pub fn set_geometry(&mut self, geometry: &FrameGeometry) {
        self.frame_stride = frame_stride_words(geometry);
    }

    /// Installed memory in words.
    #[must_use]
    pub const fn installed_words(&self) -> u64 {
        self.installed_words
    }

    /// Words per frame for the current geometry.
    #[must_use]
    pub const fn frame_stride(&self) -> u64 {
        self.frame_stride
    }

    /// The calibration region.
    #[must_use]
    pub const fn calibration(&self) -> MemoryRegion {
        MemoryRegion {
            start: CAL_REGION_START,
            end: LIVE_REGION_START,
        }
    }

    /// The live display region.
    #[must_use]
    pub const fn live(&self) -> MemoryRegion {
        MemoryRegion {
            start: LIVE_REGION_START,
            end: REC_REGION_START,
        }
    }

    /// The recording region.
    #[must_use]
    pub const fn recording(&self) -> MemoryRegion {
        MemoryRegion {
            start: REC_REGION_START,
            end: if self.installed_words > REC_REGION_START {
                self.installed_words
            } else {
                REC_REGION_START
            },
        }
    }

    /// Address of the `index`-th live display buffer.
    #[must_use]
    pub const fn live_address(&self, index: u64) -> u64 {
        LIVE_REGION_START + (index % LIVE_REGION_FRAMES) * MAX_FRAME_WORDS
    }

    /// Number of frames of the current geometry that fit in the recording region.
    #[must_use]
    pub const fn max_recording_frames(&self) -> u64 {
        if self.frame_stride == 0 {
            return 0;
        }
        self.recording().len() / self.frame_stride
    }
}

bitflags! {
    /// Remapping applied by the FPGA memory management unit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MmuConfig: u32 {
        /// Swap the chip selects of the two slots.
        const INVERT_CS      = 1 << 0;
        /// Remap for two small modules.
        const SWITCH_STUFFED = 1 << 1;
    }
}

impl MmuConfig {
    /// Selects the remapping for the detected module sizes in bytes.
    #[must_use]
    pub fn from_dimms(dimm0: Option<u64>, dimm1: Option<u64>) -> Self {
        let gib0 = dimm0.unwrap_or(0) >> 30;
        let gib1 = dimm1.unwrap_or(0) >> 30;
        if gib1 > gib0 {
            Self::INVERT_CS
        } else if gib0 < 16 && gib1 < 16 {
            Self::SWITCH_STUFFED
        } else {
            Self::empty()
        }
    }
}
