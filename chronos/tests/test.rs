use chronos::{
    prelude::*,
    transport::{Audit, AuditOption},
};
use chronos_firmware_emulator::lux1310_wavetables;

#[cfg(feature = "async")]
mod r#async;
mod calibration;
mod recording;

pub fn open(option: AuditOption) -> Result<Camera<Audit>, ChronosError> {
    Camera::builder(lux1310_wavetables())
        .with_flip_sleeper(NoSleeper)
        .open(Audit::new(option))
}

pub fn open_reset(option: AuditOption) -> anyhow::Result<Camera<Audit>> {
    let mut camera = open(option)?;
    let task = camera.start_reset()?;
    let report = camera.run(task, &NoSleeper)?;
    assert!(report.is_clean());
    Ok(camera)
}

#[test]
fn invalid_geometry_writes_nothing() -> anyhow::Result<()> {
    let mut camera = open_reset(AuditOption::default())?;
    camera.transport_mut().clear_log();

    assert!(matches!(
        camera.configure(FrameGeometry::new(100, 480), None, None),
        Err(ChronosError::Driver(ChronosDriverError::InvalidGeometry(_)))
    ));
    assert!(matches!(
        camera.configure(FrameGeometry::new(640, 480), Some(10), None),
        Err(ChronosError::Driver(ChronosDriverError::TimingInfeasible { requested: 10, .. }))
    ));
    assert!(camera.transport.write_log().is_empty());
    assert_eq!(FrameGeometry::new(1280, 1024).with_dark_rows(8), camera.geometry);
    Ok(())
}

#[test]
fn timing_changes() -> anyhow::Result<()> {
    let mut camera = open_reset(AuditOption::default())?;
    let report = camera.configure(FrameGeometry::new(640, 480), Some(200_000), Some(100_000))?;
    assert!(report.is_clean());
    assert_eq!(
        TimingMode::Standard {
            frame: 200_000,
            integration: 100_000
        },
        camera.timing_mode()
    );

    let report = camera.set_exposure(50_000)?;
    assert_eq!(Some(50_000), report.value.integration_clocks());

    let report = camera.set_frame_period(150_000)?;
    assert_eq!(Some(150_000), report.value.frame_clocks());
    assert_eq!(Some(150_000), camera.timing_mode().frame_clocks());

    camera.set_gain(4)?;
    assert!(matches!(
        camera.set_gain(5),
        Err(ChronosError::Driver(ChronosDriverError::InvalidGain(5)))
    ));
    Ok(())
}
