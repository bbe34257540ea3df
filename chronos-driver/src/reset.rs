use core::time::Duration;

use chronos_core::{
    memory::MmuConfig,
    transport::{Dac, Register, Transport},
};

use crate::{
    error::ChronosDriverError,
    procedure::{Procedure, SensorContext, Step},
    timing::TimingMode,
    warning::{Report, Warning},
};

/// Settle time after changing the bias voltages or enabling the timing engine.
const SETTLE: Duration = Duration::from_millis(10);
/// Frame period programmed while the sensor is reset.
const RESET_FRAME_CLOCKS: u32 = 360_000;
/// Integration time programmed while the sensor is reset.
const RESET_INTEGRATION_CLOCKS: u32 = 351_000;

const DEFAULT_DACS: [(Dac, f64); 8] = [
    (Dac::Vabl, 0.3),
    (Dac::Vrstb, 2.7),
    (Dac::Vrst, 3.3),
    (Dac::Vrstl, 0.7),
    (Dac::Vrsth, 3.6),
    (Dac::Vdr1, 2.5),
    (Dac::Vdr2, 2.0),
    (Dac::Vdr3, 1.5),
];

/// Detects the installed memory modules and programs the memory remapping.
///
/// Fails with [`ChronosDriverError::HardwareFault`] if no module answers.
pub fn configure_memory<T: Transport>(transport: &mut T) -> Result<MmuConfig, ChronosDriverError> {
    let dimm0 = transport.probe_dimm(0);
    let dimm1 = transport.probe_dimm(1);
    if dimm0.is_none() && dimm1.is_none() {
        tracing::error!("No memory module detected");
        return Err(ChronosDriverError::HardwareFault(
            "No memory module detected".to_string(),
        ));
    }
    let config = MmuConfig::from_dimms(dimm0, dimm1);
    tracing::info!(
        "Memory modules: {:?} / {:?} bytes, MMU {:?}",
        dimm0,
        dimm1,
        config
    );
    transport.write_register(Register::MmuConfig, config.bits())?;
    Ok(config)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Reset,
    Finish,
}

/// Brings the sensor from power-up to a known state with unity calibration and the
/// longest wavetable loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReset {
    state: State,
    warnings: Vec<Warning>,
}

impl SensorReset {
    /// Creates a new [`SensorReset`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: State::Start,
            warnings: Vec::new(),
        }
    }

    fn reset<T: Transport>(&mut self, ctx: &mut SensorContext<T>) -> Result<(), ChronosDriverError> {
        let params = *ctx.sensor.params();
        let transport = &mut ctx.transport;

        transport.write_register(Register::SensorReset, 1)?;
        transport.write_register(Register::SensorReset, 0)?;
        transport.write_register(Register::SresetB, 0)?;

        let chip_id = transport.read_register(Register::ChipId)?;
        if chip_id != params.chip_id {
            tracing::error!(
                "Sensor chip ID mismatch: {:#x} (expected {:#x})",
                chip_id,
                params.chip_id
            );
            return Err(ChronosDriverError::HardwareFault(format!(
                "Chip ID {:#x} does not match {:#x}",
                chip_id, params.chip_id
            )));
        }

        let longest = ctx.sensor.wavetables().longest();
        transport.write_register(Register::RdoutDly, longest.clocks)?;
        transport.write_register(Register::WavetabSize, longest.clocks)?;
        transport.write_register(Register::LvDelay, params.lv_delay)?;
        transport.write_register(Register::Hblank, params.min_hblank)?;

        (0..params.adc_channels).try_for_each(|ch| {
            ctx.calibration.set_adc_offset(ch, 0);
            transport.write_register(Register::AdcOffset(ch as u8), 0)
        })?;
        transport.write_register(Register::AdcCalEn, 1)?;

        ctx.sensor.set_gain(transport, 1)?;
        ctx.sensor
            .apply_readout_window(transport, &ctx.geometry)?;
        ctx.sensor
            .apply_wavetable(transport, &ctx.geometry, longest, false)?;
        ctx.timing.mark_geometry_changed();
        Ok(())
    }
}

impl Default for SensorReset {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Procedure<T> for SensorReset {
    type Output = Report<()>;

    fn step(&mut self, ctx: &mut SensorContext<T>) -> Result<Step<Report<()>>, ChronosDriverError> {
        match self.state {
            State::Start => {
                tracing::info!("Resetting sensor");
                ctx.timing
                    .program(
                        &mut ctx.transport,
                        TimingMode::Standard {
                            frame: RESET_FRAME_CLOCKS,
                            integration: RESET_INTEGRATION_CLOCKS,
                        },
                    )?
                    .into_value(&mut self.warnings);
                ctx.timing
                    .stop_timing(&mut ctx.transport)?
                    .into_value(&mut self.warnings);
                DEFAULT_DACS
                    .iter()
                    .try_for_each(|&(dac, volts)| ctx.transport.set_dac(dac, volts))?;
                self.state = State::Reset;
                Ok(Step::Wait(SETTLE))
            }
            State::Reset => {
                self.reset(ctx)?;
                self.state = State::Finish;
                Ok(Step::Wait(SETTLE))
            }
            State::Finish => {
                ctx.timing
                    .continue_timing(&mut ctx.transport)?
                    .into_value(&mut self.warnings);
                tracing::info!("Sensor reset done");
                Ok(Step::Done(Report::with_warnings(
                    (),
                    core::mem::take(&mut self.warnings),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chronos_core::{fixed::encode_adc_offset, geometry::FrameGeometry};
    use chronos_firmware_emulator::{lux1310_wavetables, FpgaEmulator};

    use super::*;
    use crate::procedure::testing::{context, run};

    #[test]
    fn reset() -> anyhow::Result<()> {
        let mut ctx = context(FpgaEmulator::new());
        ctx.calibration.set_adc_offset(3, -100);
        ctx.transport
            .set_register(Register::AdcOffset(3), encode_adc_offset(-100));

        let (report, waits) = run(SensorReset::new(), &mut ctx)?;
        assert!(report.is_clean());
        assert_eq!(vec![SETTLE, SETTLE], waits);

        DEFAULT_DACS
            .iter()
            .for_each(|&(dac, volts)| assert_eq!(Some(volts), ctx.transport.dac(dac)));

        assert_eq!(0, ctx.transport.register(Register::SensorReset));
        assert_eq!(0, ctx.transport.register(Register::SresetB));
        assert_eq!(80, ctx.transport.register(Register::RdoutDly));
        assert_eq!(80, ctx.transport.register(Register::WavetabSize));
        assert_eq!(7, ctx.transport.register(Register::LvDelay));
        assert_eq!(2, ctx.transport.register(Register::Hblank));
        assert_eq!(1, ctx.transport.register(Register::AdcCalEn));
        assert_eq!(1, ctx.transport.register(Register::TimingEn));
        assert_eq!(0, ctx.transport.register(Register::AdcOffset(3)));
        assert_eq!(0, ctx.calibration.adc_offsets()[3]);
        assert_eq!(0x7f, ctx.transport.register(Register::GainSelSamp));
        assert_eq!(
            lux1310_wavetables().longest().normal_table.as_slice(),
            ctx.transport.wavetable()
        );
        assert_eq!(
            FrameGeometry::new(1280, 1024).with_dark_rows(8),
            ctx.sensor.current_geometry(&mut ctx.transport)?
        );
        assert_eq!(
            TimingMode::Standard {
                frame: RESET_FRAME_CLOCKS,
                integration: RESET_INTEGRATION_CLOCKS
            },
            ctx.timing.mode()
        );
        Ok(())
    }

    #[test]
    fn chip_id_mismatch() {
        let mut ctx = context(FpgaEmulator::new().with_chip_id(0x12));
        assert_eq!(
            Err(ChronosDriverError::HardwareFault(
                "Chip ID 0x12 does not match 0xda".to_string()
            )),
            run(SensorReset::new(), &mut ctx).map(|(report, _)| report)
        );
    }

    #[rstest::rstest]
    #[case(MmuConfig::SWITCH_STUFFED, [Some(8 << 30), None])]
    #[case(MmuConfig::INVERT_CS, [None, Some(16 << 30)])]
    #[case(MmuConfig::empty(), [Some(16 << 30), Some(16 << 30)])]
    fn memory(#[case] expect: MmuConfig, #[case] dimms: [Option<u64>; 2]) -> anyhow::Result<()> {
        let mut emulator = FpgaEmulator::new().with_dimms(dimms);
        assert_eq!(expect, configure_memory(&mut emulator)?);
        assert_eq!(expect.bits(), emulator.register(Register::MmuConfig));
        Ok(())
    }

    #[test]
    fn no_memory() {
        let mut emulator = FpgaEmulator::new().with_dimms([None, None]);
        assert_eq!(
            Err(ChronosDriverError::HardwareFault(
                "No memory module detected".to_string()
            )),
            configure_memory(&mut emulator)
        );
        assert!(emulator.write_log().is_empty());
    }
}
