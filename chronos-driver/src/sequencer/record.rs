use chronos_core::{
    memory::LIVE_REGION_FRAMES,
    transport::{seq_control, seq_status, Register, Transport},
};

use crate::{
    error::ChronosDriverError,
    procedure::{Procedure, SensorContext, Step},
};

use super::{build_program, RecordingProgramStep, RecordingRequest};

fn word_address(words: u64) -> Result<u32, ChronosDriverError> {
    u32::try_from(words)
        .map_err(|_| ChronosDriverError::HardwareFault(format!("Address {words:#x} exceeds 32 bits")))
}

fn pulse<T: Transport>(transport: &mut T, bit: u32) -> Result<(), ChronosDriverError> {
    let control = transport.read_register(Register::SeqControl)?;
    transport.write_register(Register::SeqControl, control | bit)?;
    transport.write_register(Register::SeqControl, control & !bit)?;
    Ok(())
}

/// Returns `true` if the sequencer is recording.
pub fn is_recording<T: Transport>(transport: &mut T) -> Result<bool, ChronosDriverError> {
    Ok(transport.read_register(Register::SeqStatus)? & seq_status::RECORDING != 0)
}

/// Ends the recording in progress.
pub fn stop_recording<T: Transport>(transport: &mut T) -> Result<(), ChronosDriverError> {
    tracing::info!("Stopping recording");
    pulse(transport, seq_control::STOP_REC)
}

/// Loads a recording program and starts the sequencer.
///
/// Completes in a single step with the loaded program.
#[derive(Clone, Debug, PartialEq)]
pub struct StartRecording {
    request: RecordingRequest,
}

impl StartRecording {
    /// Creates a new [`StartRecording`].
    #[must_use]
    pub const fn new(request: RecordingRequest) -> Self {
        Self { request }
    }
}

impl<T: Transport> Procedure<T> for StartRecording {
    type Output = Vec<RecordingProgramStep>;

    fn step(
        &mut self,
        ctx: &mut SensorContext<T>,
    ) -> Result<Step<Vec<RecordingProgramStep>>, ChronosDriverError> {
        ctx.memory.set_geometry(&ctx.geometry);
        let program = build_program(&self.request, &ctx.memory)?;

        let commands = program
            .iter()
            .map(|step| step.command().into_bits())
            .collect::<Vec<_>>();
        ctx.transport.write_sequencer_program(&commands)?;

        let (start, stop) = program
            .first()
            .map_or((0, 0), |step| (step.region_start, step.region_stop));
        ctx.transport
            .write_register(Register::SeqFrameSize, word_address(ctx.memory.frame_stride())?)?;
        ctx.transport
            .write_register(Register::SeqRegionStart, word_address(start)?)?;
        ctx.transport
            .write_register(Register::SeqRegionStop, word_address(stop)?)?;
        (0..LIVE_REGION_FRAMES).try_for_each(|i| {
            ctx.transport.write_register(
                Register::SeqLiveAddr(i as u8),
                word_address(ctx.memory.live_address(i))?,
            )?;
            Ok::<_, ChronosDriverError>(())
        })?;

        pulse(&mut ctx.transport, seq_control::START_REC)?;
        tracing::info!(
            "Recording started: {} states, {} frames per block",
            program.len(),
            program.first().map_or(0, |step| step.block_size_frames)
        );
        Ok(Step::Done(program))
    }
}

#[cfg(test)]
mod tests {
    use chronos_core::{geometry::FrameGeometry, memory::REC_REGION_START};
    use chronos_firmware_emulator::{Access, FpgaEmulator};

    use super::*;
    use crate::procedure::testing::{context, run};

    #[test]
    fn start_and_stop() -> anyhow::Result<()> {
        let mut ctx = context(FpgaEmulator::new());
        ctx.geometry = FrameGeometry::new(640, 480).with_dark_rows(4);
        ctx.transport.clear_log();

        let (program, waits) = run(
            StartRecording::new(RecordingRequest::default().with_frame_count(1000)),
            &mut ctx,
        )?;
        assert!(waits.is_empty());
        assert_eq!(1, program.len());
        assert_eq!(
            vec![program[0].command().into_bits()],
            ctx.transport.sequencer_program()
        );

        assert_eq!(0x38C0, ctx.transport.register(Register::SeqFrameSize));
        assert_eq!(
            REC_REGION_START as u32,
            ctx.transport.register(Register::SeqRegionStart)
        );
        assert_eq!(
            (REC_REGION_START + 1000 * 0x38C0) as u32,
            ctx.transport.register(Register::SeqRegionStop)
        );
        assert_eq!(0x40000, ctx.transport.register(Register::SeqLiveAddr(1)));
        assert!(is_recording(&mut ctx.transport)?);

        let control = ctx
            .transport
            .write_log()
            .iter()
            .filter_map(|access| match access {
                Access::Register(Register::SeqControl, value) => Some(*value),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(vec![seq_control::START_REC, 0], control);

        stop_recording(&mut ctx.transport)?;
        assert!(!is_recording(&mut ctx.transport)?);
        Ok(())
    }

    #[test]
    fn invalid_request_writes_nothing() {
        let mut ctx = context(FpgaEmulator::new());
        ctx.transport.clear_log();
        assert_eq!(
            Err(ChronosDriverError::ZeroBlockSize),
            run(
                StartRecording::new(RecordingRequest::default().with_block_size(0)),
                &mut ctx
            )
        );
        assert!(ctx.transport.write_log().is_empty());
        assert!(!is_recording(&mut ctx.transport).unwrap());
    }
}
