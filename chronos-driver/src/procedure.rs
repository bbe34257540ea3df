use core::time::Duration;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chronos_core::transport::Transport;

pub(crate) use crate::context::SensorContext;
use crate::error::ChronosDriverError;

/// Outcome of a single [`Procedure::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step<O> {
    /// Call `step` again after the given delay.
    Wait(Duration),
    /// The procedure finished.
    Done(O),
}

/// A long-running hardware operation split into resumable steps.
///
/// A procedure never sleeps by itself. It returns [`Step::Wait`] and the runner decides how
/// to wait, which lets the same procedure be driven by a blocking or an async runner and
/// be cancelled between steps.
pub trait Procedure<T: Transport> {
    /// Value produced on completion.
    type Output;

    /// Advances the procedure.
    fn step(&mut self, ctx: &mut SensorContext<T>) -> Result<Step<Self::Output>, ChronosDriverError>;
}

impl<T: Transport, P: Procedure<T> + ?Sized> Procedure<T> for Box<P> {
    type Output = P::Output;

    fn step(&mut self, ctx: &mut SensorContext<T>) -> Result<Step<Self::Output>, ChronosDriverError> {
        self.as_mut().step(ctx)
    }
}

/// A shared flag requesting a running procedure to stop at its next step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a new token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}


#[cfg(test)]
mod tests {
    use chronos_firmware_emulator::FpgaEmulator;

    use super::{testing::*, *};

    struct Countdown(u32);

    impl<T: Transport> Procedure<T> for Countdown {
        type Output = &'static str;

        fn step(&mut self, _: &mut SensorContext<T>) -> Result<Step<Self::Output>, ChronosDriverError> {
            if self.0 == 0 {
                return Ok(Step::Done("done"));
            }
            self.0 -= 1;
            Ok(Step::Wait(Duration::from_millis(self.0 as u64)))
        }
    }

    #[test]
    fn boxed_procedure() -> anyhow::Result<()> {
        let mut ctx = context(FpgaEmulator::new());
        let procedure: Box<dyn Procedure<FpgaEmulator, Output = &'static str>> =
            Box::new(Countdown(3));
        let (output, waits) = run(procedure, &mut ctx)?;
        assert_eq!("done", output);
        assert_eq!(
            vec![
                Duration::from_millis(2),
                Duration::from_millis(1),
                Duration::ZERO
            ],
            waits
        );
        Ok(())
    }

    #[test]
    fn cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!token.is_cancelled());
        shared.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!shared.is_cancelled());
    }
}
