use std::time::Duration;

use chronos::prelude::*;
use chronos_firmware_emulator::lux1310_wavetables;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut camera = Camera::builder(lux1310_wavetables()).open(Nop::new())?;

    let task = camera.start_reset()?;
    camera.run_async(task, &TokioSleeper).await?.into_value(&mut Vec::new());

    camera.configure(FrameGeometry::new(1280, 720), None, None)?.into_value(&mut Vec::new());

    // A covered sensor is assumed; cancel after a second from another task.
    let token = camera.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });
    let task = camera.start_black_calibration(16)?;
    match camera.run_async(task, &TokioSleeper).await {
        Ok(softgain) => println!("Black calibration done, software gain {softgain:.4}"),
        Err(ChronosError::Cancelled) => println!("Black calibration cancelled"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
