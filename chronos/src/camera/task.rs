use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use getset::{CopyGetters, Getters};

/// A procedure started on a [`Camera`](super::Camera) and not yet finished.
///
/// A task does nothing by itself. Drive it with [`Camera::run`](super::Camera::run),
/// [`Camera::run_async`](super::Camera::run_async) or step by step with
/// [`Camera::step`](super::Camera::step). The camera rejects other procedures until the task
/// finishes, fails, is cancelled or is dropped.
#[must_use = "the camera stays busy until the task is run, cancelled or dropped"]
#[derive(Debug, Getters, CopyGetters)]
pub struct Task<P> {
    pub(crate) id: u64,
    /// Name of the procedure, used in logs.
    #[getset(get_copy = "pub")]
    name: &'static str,
    /// The procedure.
    #[getset(get = "pub")]
    pub(crate) procedure: P,
    released: Arc<AtomicBool>,
}

impl<P> Task<P> {
    pub(crate) fn new(id: u64, name: &'static str, procedure: P) -> (Self, Lease) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                id,
                name,
                procedure,
                released: released.clone(),
            },
            Lease { id, released },
        )
    }
}

impl<P> Drop for Task<P> {
    fn drop(&mut self) {
        self.released.store(true, Ordering::Release);
    }
}

/// The camera's side of an in-flight [`Task`].
#[derive(Debug)]
pub(crate) struct Lease {
    pub(crate) id: u64,
    released: Arc<AtomicBool>,
}

impl Lease {
    /// Returns `true` once the task has been dropped.
    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}
