mod tests;

use anyhow::Result;

use chronos::prelude::*;
use chronos_firmware_emulator::lux1310_wavetables;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let camera = Camera::builder(lux1310_wavetables()).open(Nop::new())?;

    tests::run(camera)
}
