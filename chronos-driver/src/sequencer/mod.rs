mod command;
mod program;
mod record;

pub use command::{SeqCommand, TerminationFlags};
pub use program::{
    build_program, RecordingProgramStep, RecordingRequest, RecordingSegment, MAX_SEQUENCER_STATES,
};
pub use record::{is_recording, stop_recording, StartRecording};
