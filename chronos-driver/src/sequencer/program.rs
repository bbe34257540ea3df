use chronos_core::memory::MemoryRegionMap;

use crate::error::ChronosDriverError;

use super::{SeqCommand, TerminationFlags};

/// Number of states of the recording sequencer.
pub const MAX_SEQUENCER_STATES: usize = 16;

/// One segment of a multi-segment recording.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordingSegment {
    /// Frames per block.
    pub block_size: u32,
    /// Block and recording termination conditions.
    pub termination: TerminationFlags,
    /// Index of the segment that follows, or the next one in order if `None`.
    pub next_state: Option<u8>,
}

/// Parameters of a recording.
///
/// Without `steps`, the request describes a single segment built from the flags.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordingRequest {
    /// Frames per block.
    pub block_size: Option<u32>,
    /// Frames in the recording region.
    pub frame_count: Option<u32>,
    /// End the block on a rising trigger edge.
    pub blk_term_rising: bool,
    /// End the block on a falling trigger edge.
    pub blk_term_falling: bool,
    /// End the block while the trigger is high.
    pub blk_term_high: bool,
    /// End the block while the trigger is low.
    pub blk_term_low: bool,
    /// End the block when it is full.
    pub blk_term_full: bool,
    /// End the recording at the end of the block.
    pub rec_term_block_end: bool,
    /// End the recording when the region is full.
    pub rec_term_memory: bool,
    /// End the recording on trigger.
    pub rec_term_trigger: bool,
    /// Next state of the single segment.
    pub next_state: Option<u8>,
    /// Explicit segments. Overrides the block size, flags and next state above.
    pub steps: Vec<RecordingSegment>,
}

impl Default for RecordingRequest {
    fn default() -> Self {
        Self {
            block_size: None,
            frame_count: None,
            blk_term_rising: false,
            blk_term_falling: false,
            blk_term_high: false,
            blk_term_low: false,
            blk_term_full: true,
            rec_term_block_end: true,
            rec_term_memory: true,
            rec_term_trigger: false,
            next_state: None,
            steps: Vec::new(),
        }
    }
}

impl RecordingRequest {
    /// Sets the block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Sets the number of frames in the recording region.
    #[must_use]
    pub fn with_frame_count(mut self, frame_count: u32) -> Self {
        self.frame_count = Some(frame_count);
        self
    }

    /// Sets the next state of the single segment.
    #[must_use]
    pub fn with_next_state(mut self, next_state: u8) -> Self {
        self.next_state = Some(next_state);
        self
    }

    /// Replaces the single segment with explicit segments.
    #[must_use]
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = RecordingSegment>) -> Self {
        self.steps = steps.into_iter().collect();
        self
    }

    /// Termination conditions of the single segment.
    #[must_use]
    pub fn termination(&self) -> TerminationFlags {
        [
            (self.blk_term_rising, TerminationFlags::BLK_TERM_RISING),
            (self.blk_term_falling, TerminationFlags::BLK_TERM_FALLING),
            (self.blk_term_high, TerminationFlags::BLK_TERM_HIGH),
            (self.blk_term_low, TerminationFlags::BLK_TERM_LOW),
            (self.blk_term_full, TerminationFlags::BLK_TERM_FULL),
            (self.rec_term_block_end, TerminationFlags::REC_TERM_BLOCK_END),
            (self.rec_term_memory, TerminationFlags::REC_TERM_MEMORY),
            (self.rec_term_trigger, TerminationFlags::REC_TERM_TRIGGER),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(TerminationFlags::empty(), |acc, (_, flag)| acc | flag)
    }
}

/// A compiled recording sequencer state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordingProgramStep {
    /// Frames per block.
    pub block_size_frames: u32,
    /// Block and recording termination conditions.
    pub termination: TerminationFlags,
    /// Index of the state that follows.
    pub next_state_index: u8,
    /// First word of the recording region.
    pub region_start: u64,
    /// One past the last word of the recording region.
    pub region_stop: u64,
}

impl RecordingProgramStep {
    /// Encodes the step as a sequencer command.
    #[must_use]
    pub const fn command(&self) -> SeqCommand {
        SeqCommand::encode(self.termination, self.next_state_index, self.block_size_frames)
    }
}

/// Compiles a [`RecordingRequest`] into sequencer states for the current memory layout.
///
/// Every state shares the recording region. The region holds `frame_count` frames if given,
/// otherwise as many whole frames as fit in the installed memory.
#[tracing::instrument(level = "debug", skip(memory))]
pub fn build_program(
    request: &RecordingRequest,
    memory: &MemoryRegionMap,
) -> Result<Vec<RecordingProgramStep>, ChronosDriverError> {
    let recording = memory.recording();
    let stride = memory.frame_stride();
    let max_frames = u32::try_from(memory.max_recording_frames()).unwrap_or(u32::MAX);

    let region_start = recording.start;
    let region_stop = match request.frame_count {
        Some(frame_count) => {
            let required = frame_count as u64 * stride;
            if required > recording.len() {
                return Err(ChronosDriverError::RecordingRegionOverflow {
                    required,
                    available: recording.len(),
                });
            }
            region_start + required
        }
        None => region_start + memory.max_recording_frames() * stride,
    };

    let segments = if request.steps.is_empty() {
        vec![RecordingSegment {
            block_size: request
                .block_size
                .or(request.frame_count)
                .unwrap_or(max_frames),
            termination: request.termination(),
            next_state: request.next_state,
        }]
    } else {
        request.steps.clone()
    };

    let len = segments.len();
    if len > MAX_SEQUENCER_STATES {
        return Err(ChronosDriverError::SequencerStateOverflow(len));
    }

    let program = segments
        .into_iter()
        .enumerate()
        .map(|(index, segment)| {
            if segment.block_size == 0 {
                return Err(ChronosDriverError::ZeroBlockSize);
            }
            let next = segment
                .next_state
                .map_or((index + 1) % len, |next| next as usize);
            if next >= len {
                return Err(ChronosDriverError::InvalidNextState { index, next });
            }
            Ok(RecordingProgramStep {
                block_size_frames: segment.block_size,
                termination: segment.termination,
                next_state_index: next as u8,
                region_start,
                region_stop,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "Recording program: {} states, region {:#x}..{:#x}, stride {:#x}",
        program.len(),
        region_start,
        region_stop,
        stride
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use chronos_core::{
        geometry::FrameGeometry,
        memory::{BYTES_PER_WORD, REC_REGION_START},
    };

    use super::*;

    const MEMORY_WORDS: u64 = (8 << 30) / BYTES_PER_WORD;

    fn memory() -> MemoryRegionMap {
        MemoryRegionMap::new(MEMORY_WORDS, &FrameGeometry::new(1280, 1024))
    }

    #[test]
    fn default_request() -> anyhow::Result<()> {
        let program = build_program(&RecordingRequest::default(), &memory())?;
        assert_eq!(
            vec![RecordingProgramStep {
                block_size_frames: ((MEMORY_WORDS - REC_REGION_START) / 0xF000) as u32,
                termination: TerminationFlags::BLK_TERM_FULL
                    | TerminationFlags::REC_TERM_BLOCK_END
                    | TerminationFlags::REC_TERM_MEMORY,
                next_state_index: 0,
                region_start: REC_REGION_START,
                region_stop: REC_REGION_START
                    + (MEMORY_WORDS - REC_REGION_START) / 0xF000 * 0xF000,
            }],
            program
        );
        Ok(())
    }

    #[rstest::rstest]
    #[case(FrameGeometry::new(1280, 1024))]
    #[case(FrameGeometry::new(1280, 1024).with_dark_rows(8))]
    #[case(FrameGeometry::new(640, 480).with_dark_rows(4))]
    #[case(FrameGeometry::new(192, 96))]
    fn default_region_frame_aligned(#[case] geometry: FrameGeometry) -> anyhow::Result<()> {
        let mut memory = memory();
        memory.set_geometry(&geometry);
        let program = build_program(&RecordingRequest::default(), &memory)?;
        let step = &program[0];
        let span = step.region_stop - step.region_start;
        assert_eq!(0, span % memory.frame_stride());
        assert_eq!(step.block_size_frames as u64, span / memory.frame_stride());
        assert!(step.region_stop <= memory.recording().end);
        Ok(())
    }

    #[test]
    fn frame_count() -> anyhow::Result<()> {
        let program = build_program(&RecordingRequest::default().with_frame_count(100), &memory())?;
        assert_eq!(1, program.len());
        assert_eq!(100, program[0].block_size_frames);
        assert_eq!(REC_REGION_START, program[0].region_start);
        assert_eq!(REC_REGION_START + 100 * 0xF000, program[0].region_stop);

        let program = build_program(
            &RecordingRequest::default()
                .with_frame_count(100)
                .with_block_size(10),
            &memory(),
        )?;
        assert_eq!(10, program[0].block_size_frames);
        assert_eq!(REC_REGION_START + 100 * 0xF000, program[0].region_stop);
        Ok(())
    }

    #[test]
    fn stride_follows_geometry() -> anyhow::Result<()> {
        let mut memory = memory();
        memory.set_geometry(&FrameGeometry::new(640, 480).with_dark_rows(4));
        let program = build_program(&RecordingRequest::default(), &memory)?;
        assert_eq!(
            ((MEMORY_WORDS - REC_REGION_START) / 0x38C0) as u32,
            program[0].block_size_frames
        );
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde() -> anyhow::Result<()> {
        let request = RecordingRequest::default()
            .with_frame_count(100)
            .with_steps([RecordingSegment {
                block_size: 50,
                termination: TerminationFlags::BLK_TERM_RISING | TerminationFlags::REC_TERM_TRIGGER,
                next_state: Some(0),
            }]);
        let blob = serde_json::to_string(&request)?;
        assert_eq!(request, serde_json::from_str(&blob)?);

        let program = build_program(&request, &memory())?;
        let blob = serde_json::to_string(&program)?;
        assert_eq!(program, serde_json::from_str::<Vec<RecordingProgramStep>>(&blob)?);
        Ok(())
    }

    #[test]
    fn termination_flags() {
        let request = RecordingRequest {
            blk_term_rising: true,
            blk_term_full: false,
            rec_term_memory: false,
            rec_term_trigger: true,
            ..Default::default()
        };
        assert_eq!(
            TerminationFlags::BLK_TERM_RISING
                | TerminationFlags::REC_TERM_BLOCK_END
                | TerminationFlags::REC_TERM_TRIGGER,
            request.termination()
        );
    }

    #[test]
    fn segments_form_cycle() -> anyhow::Result<()> {
        let segment = |block_size, next_state| RecordingSegment {
            block_size,
            termination: TerminationFlags::BLK_TERM_FULL,
            next_state,
        };
        let program = build_program(
            &RecordingRequest::default().with_steps([
                segment(10, None),
                segment(20, None),
                segment(30, Some(1)),
            ]),
            &memory(),
        )?;
        assert_eq!(
            vec![(10, 1), (20, 2), (30, 1)],
            program
                .iter()
                .map(|s| (s.block_size_frames, s.next_state_index))
                .collect::<Vec<_>>()
        );
        assert_eq!(
            vec![0x0000_0000_0000_9108, 0x0000_0000_0001_3208, 0x0000_0000_0001_D108],
            program
                .iter()
                .map(|s| s.command().into_bits())
                .collect::<Vec<_>>()
        );
        Ok(())
    }

    #[rstest::rstest]
    #[case(
        ChronosDriverError::SequencerStateOverflow(17),
        RecordingRequest::default().with_steps(vec![RecordingSegment { block_size: 1, termination: TerminationFlags::BLK_TERM_FULL, next_state: None }; 17])
    )]
    #[case(ChronosDriverError::ZeroBlockSize, RecordingRequest::default().with_block_size(0))]
    #[case(
        ChronosDriverError::InvalidNextState { index: 0, next: 3 },
        RecordingRequest::default().with_next_state(3)
    )]
    #[case(
        ChronosDriverError::RecordingRegionOverflow { required: 20000 * 0xF000, available: MEMORY_WORDS - REC_REGION_START },
        RecordingRequest::default().with_frame_count(20000)
    )]
    fn invalid_request(#[case] expect: ChronosDriverError, #[case] request: RecordingRequest) {
        assert_eq!(Err(expect), build_program(&request, &memory()));
    }

    #[test]
    fn no_memory() {
        let memory = MemoryRegionMap::new(0, &FrameGeometry::new(1280, 1024));
        assert_eq!(
            Err(ChronosDriverError::ZeroBlockSize),
            build_program(&RecordingRequest::default(), &memory)
        );
    }
}
