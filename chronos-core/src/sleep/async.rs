use core::time::Duration;

/// A trait for asynchronous sleep operations.
pub trait AsyncSleep: Send + Sync {
    /// Sleep for the specified duration.
    fn sleep(&self, duration: Duration) -> impl core::future::Future<Output = ()> + Send;
}

/// A sleeper that uses [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokioSleeper;

impl AsyncSleep for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokio_sleeper() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(10)).await;
        assert!(Duration::from_millis(10) <= start.elapsed());
    }
}
