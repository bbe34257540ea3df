use chronos::prelude::*;

use super::test_runner::print_warnings;

pub fn analog<T: Transport>(camera: &mut Camera<T>) -> anyhow::Result<()> {
    print_warnings(camera.configure(FrameGeometry::new(1280, 1024), None, None)?);

    let task = camera.start_analog_calibration()?;
    print_warnings(camera.run(task, &StdSleeper)?);

    let state = camera.calibration_state();
    println!("ADC offsets: {:?}", state.adc_offsets());
    println!(
        "Column gains: {:?}",
        (0..16).map(|col| state.column_gain(col)).collect::<Vec<_>>()
    );
    println!("3-point correction: {}", state.is_three_point());
    Ok(())
}

pub fn black<T: Transport>(camera: &mut Camera<T>) -> anyhow::Result<()> {
    let task = camera.start_black_calibration(16)?;
    let softgain = camera.run(task, &SpinSleeper::default())?;
    println!("Software gain: {softgain:.4}");
    Ok(())
}
