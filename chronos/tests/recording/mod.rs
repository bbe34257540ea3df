use chronos::{prelude::*, transport::AuditOption};
use chronos_core::{memory::REC_REGION_START, transport::Register};

use crate::{open, open_reset};

#[test]
fn record_and_stop() -> anyhow::Result<()> {
    let mut camera = open_reset(AuditOption::default())?;
    camera
        .configure(FrameGeometry::new(640, 480).with_dark_rows(4), None, None)?
        .into_value(&mut Vec::new());

    let task = camera.build_and_start_recording(RecordingRequest::default().with_frame_count(1000))?;
    let program = camera.run(task, &NoSleeper)?;
    assert_eq!(1, program.len());
    assert_eq!(1000, program[0].block_size_frames);
    assert_eq!(0, program[0].next_state_index);
    assert_eq!(
        (REC_REGION_START + 1000 * 0x38C0) as u32,
        camera.transport.register(Register::SeqRegionStop)
    );
    assert!(camera.is_recording()?);

    camera.stop_recording()?;
    assert!(!camera.is_recording()?);
    assert_eq!(Err(ChronosError::NotRecording), camera.stop_recording());
    Ok(())
}

#[test]
fn default_request_fills_memory() -> anyhow::Result<()> {
    let mut camera = open(AuditOption::default())?;
    let task = camera.build_and_start_recording(RecordingRequest::default())?;
    let program = camera.run(task, &NoSleeper)?;
    assert_eq!(
        camera.memory_map().max_recording_frames(),
        program[0].block_size_frames as u64
    );
    let memory = camera.memory_map();
    assert_eq!(
        memory.recording().start + memory.max_recording_frames() * memory.frame_stride(),
        program[0].region_stop
    );
    assert!(program[0].region_stop <= memory.recording().end);
    Ok(())
}

#[test]
fn segments_form_closed_cycle() -> anyhow::Result<()> {
    let mut camera = open(AuditOption::default())?;
    let segment = RecordingSegment {
        block_size: 100,
        termination: TerminationFlags::BLK_TERM_FULL,
        next_state: None,
    };
    let task = camera
        .build_and_start_recording(RecordingRequest::default().with_steps(vec![segment; 3]))?;
    let program = camera.run(task, &NoSleeper)?;
    assert_eq!(
        vec![1, 2, 0],
        program
            .iter()
            .map(|step| step.next_state_index)
            .collect::<Vec<_>>()
    );
    assert_eq!(
        program
            .iter()
            .map(|step| step.command().into_bits())
            .collect::<Vec<_>>(),
        camera.transport.sequencer_program()
    );
    Ok(())
}

#[test]
fn too_many_segments() -> anyhow::Result<()> {
    let mut camera = open(AuditOption::default())?;
    let segment = RecordingSegment {
        block_size: 1,
        termination: TerminationFlags::BLK_TERM_FULL,
        next_state: None,
    };
    camera.transport_mut().clear_log();
    let task = camera
        .build_and_start_recording(RecordingRequest::default().with_steps(vec![segment; 17]))?;
    assert_eq!(
        Err(ChronosError::Driver(ChronosDriverError::SequencerStateOverflow(17))),
        camera.run(task, &NoSleeper)
    );
    assert!(camera.transport.write_log().is_empty());
    assert!(!camera.is_busy());
    assert!(!camera.is_recording()?);
    Ok(())
}
