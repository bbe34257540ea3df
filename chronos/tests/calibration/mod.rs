use chronos::{prelude::*, transport::AuditOption};
use chronos_core::transport::Register;
use chronos_firmware_emulator::SyntheticSensor;

use crate::open_reset;

#[test]
fn analog_calibration() -> anyhow::Result<()> {
    let mut camera = open_reset(AuditOption {
        synthetic: SyntheticSensor::default().with_dark_sigma(4),
        ..Default::default()
    })?;
    let geometry = FrameGeometry::new(640, 480);
    let report = camera.configure(geometry, None, None)?;
    assert!(report.is_clean());
    let mode = camera.timing_mode();

    let task = camera.start_analog_calibration()?;
    let report = camera.run(task, &NoSleeper)?;
    assert!(report.is_clean());

    let state = camera.calibration_state();
    assert!(state.adc_offsets().iter().all(|&o| o < 0));
    assert!(state.is_three_point());
    assert!(state.column_gain_raw().iter().any(|&g| g != state.column_gain_raw()[0]));

    assert_eq!(geometry, camera.geometry);
    assert_eq!(0, camera.transport.register(Register::NbDrkRows));
    assert!(!camera.transport.is_gain_cal_mode());
    assert_eq!(mode, camera.timing_mode());
    assert!(!camera.is_busy());
    Ok(())
}

#[test]
fn dead_channel_falls_back_to_unity() -> anyhow::Result<()> {
    let mut camera = open_reset(AuditOption {
        synthetic: SyntheticSensor::default()
            .with_dark_sigma(4)
            .with_dead_channel(5),
        ..Default::default()
    })?;
    camera
        .configure(FrameGeometry::new(640, 480).with_dark_rows(4), None, None)?
        .into_value(&mut Vec::new());

    let task = camera.start_analog_calibration()?;
    let report = camera.run(task, &NoSleeper)?;
    assert_eq!(
        vec![Warning::GainCalibrationRange { channel: 5 }],
        report.warnings
    );
    assert!(!camera.calibration_state().is_three_point());
    assert!((0..1280).all(|col| camera.transport.column_gain(col) == (1 << 12, 0)));
    Ok(())
}

#[test]
fn black_calibration() -> anyhow::Result<()> {
    let mut camera = open_reset(AuditOption {
        synthetic: SyntheticSensor::default().with_fpn_amplitude(15),
        ..Default::default()
    })?;
    camera
        .configure(FrameGeometry::new(192, 96), None, None)?
        .into_value(&mut Vec::new());

    let task = camera.start_black_calibration(2)?;
    let softgain = camera.run(task, &NoSleeper)?;
    approx::assert_abs_diff_eq!(4096. / 4081., softgain);
    assert_eq!(192 * 96 * 12 / 32, camera.transport.fpn().len());
    Ok(())
}
