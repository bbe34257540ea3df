use derive_more::Display;

/// Named hardware registers reachable through a [`Transport`].
///
/// Sensor registers are accessed over the serial control interface; the others live in the FPGA.
///
/// [`Transport`]: super::Transport
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Register {
    // Sensor
    ChipId,
    SresetB,
    TimingEn,
    SofDelay,
    Hblank,
    LvDelay,
    RdoutDly,
    WavetabSize,
    XStart,
    XEnd,
    YStart,
    YEnd,
    DrkRowsStAddr,
    NbDrkRows,
    AdcCalEn,
    #[display("AdcOffset({_0})")]
    AdcOffset(u8),
    GainSelSamp,
    GainSelFb,
    GainBit,
    SelVdumrst,
    FtTrigNbPulse,
    SelVdr1Width,
    SelVdr2Width,
    SelVdr3Width,
    HidyEn,
    // FPGA
    SensorReset,
    StartDelay,
    LinePeriod,
    PulsedAbnLowPeriod,
    PulsedAbnHighPeriod,
    TimingVersion,
    TimingIoWait,
    ExposureEnable,
    ShutterTriggersFrame,
    DisplayGainControl,
    FpnAddress,
    SeqControl,
    SeqStatus,
    SeqFrameSize,
    SeqRegionStart,
    SeqRegionStop,
    #[display("SeqLiveAddr({_0})")]
    SeqLiveAddr(u8),
    MmuConfig,
}

impl Register {
    /// Returns `true` if the register lives in the image sensor rather than the FPGA.
    #[must_use]
    pub const fn is_sensor(&self) -> bool {
        !matches!(
            self,
            Register::SensorReset
                | Register::StartDelay
                | Register::LinePeriod
                | Register::PulsedAbnLowPeriod
                | Register::PulsedAbnHighPeriod
                | Register::TimingVersion
                | Register::TimingIoWait
                | Register::ExposureEnable
                | Register::ShutterTriggersFrame
                | Register::DisplayGainControl
                | Register::FpnAddress
                | Register::SeqControl
                | Register::SeqStatus
                | Register::SeqFrameSize
                | Register::SeqRegionStart
                | Register::SeqRegionStop
                | Register::SeqLiveAddr(_)
                | Register::MmuConfig
        )
    }
}

/// Sensor bias DACs.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Dac {
    Vabl,
    Vrstb,
    Vrst,
    Vrstl,
    Vrsth,
    Vdr1,
    Vdr2,
    Vdr3,
}

/// Bit in [`Register::DisplayGainControl`] enabling 3-point column gain correction.
pub const DISPLAY_GAIN_3POINT: u32 = 1 << 0;

/// Bits in [`Register::SeqControl`].
pub mod seq_control {
    /// Software trigger.
    pub const SW_TRIG: u32 = 1 << 0;
    /// Start recording.
    pub const START_REC: u32 = 1 << 1;
    /// Stop recording.
    pub const STOP_REC: u32 = 1 << 2;
}

/// Bits in [`Register::SeqStatus`].
pub mod seq_status {
    /// Recording in progress.
    pub const RECORDING: u32 = 1 << 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("ChipId", Register::ChipId)]
    #[case("AdcOffset(3)", Register::AdcOffset(3))]
    #[case("SeqLiveAddr(2)", Register::SeqLiveAddr(2))]
    fn display(#[case] expect: &str, #[case] reg: Register) {
        assert_eq!(expect, reg.to_string());
    }

    #[rstest::rstest]
    #[case(true, Register::AdcOffset(0))]
    #[case(true, Register::SelVdumrst)]
    #[case(false, Register::LinePeriod)]
    #[case(false, Register::SeqLiveAddr(1))]
    fn is_sensor(#[case] expect: bool, #[case] reg: Register) {
        assert_eq!(expect, reg.is_sensor());
    }
}
