use std::time::{Duration, Instant};

use chronos::{prelude::*, transport::AuditOption};

use crate::open;

#[tokio::test]
async fn reset_async() -> anyhow::Result<()> {
    let mut camera = open(AuditOption::default())?;
    let task = camera.start_reset()?;
    let start = Instant::now();
    let report = camera.run_async(task, &TokioSleeper).await?;
    assert!(report.is_clean());
    assert!(Duration::from_millis(20) <= start.elapsed());
    assert!(!camera.is_busy());
    Ok(())
}

#[tokio::test]
async fn cancel_async() -> anyhow::Result<()> {
    let mut camera = open(AuditOption::default())?;
    let token = camera.cancel_token();
    let task = camera.start_black_calibration(1000)?;
    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
    });
    assert_eq!(
        Err(ChronosError::Cancelled),
        camera.run_async(task, &TokioSleeper).await
    );
    cancel.await?;
    assert!(!camera.is_busy());
    assert!(camera.transport.fpn().is_empty());
    Ok(())
}

#[tokio::test]
async fn timed_out_future_releases_camera() -> anyhow::Result<()> {
    let mut camera = open(AuditOption::default())?;
    let task = camera.start_black_calibration(1000)?;
    assert!(tokio::time::timeout(
        Duration::from_millis(10),
        camera.run_async(task, &TokioSleeper)
    )
    .await
    .is_err());
    assert!(!camera.is_busy());

    let task = camera.start_reset()?;
    assert!(camera.run_async(task, &TokioSleeper).await?.is_clean());
    Ok(())
}
