use chronos_core::timing::Page;

/// Page swap state of the timing engine.
#[derive(Debug, Default)]
pub(crate) struct FlipEngine {
    active: Page,
    pending: Option<u32>,
    latency: u32,
    stalled: bool,
    flip_count: usize,
    force_reset_count: usize,
}

impl FlipEngine {
    pub(crate) const fn active(&self) -> Page {
        self.active
    }

    pub(crate) const fn flip_count(&self) -> usize {
        self.flip_count
    }

    pub(crate) const fn force_reset_count(&self) -> usize {
        self.force_reset_count
    }

    pub(crate) fn stall(&mut self) {
        self.stalled = true;
    }

    pub(crate) fn set_latency(&mut self, polls: u32) {
        self.latency = polls;
    }

    pub(crate) fn request(&mut self) {
        self.flip_count += 1;
        if self.stalled || self.latency > 0 {
            self.pending = Some(self.latency);
        } else {
            self.swap();
        }
    }

    pub(crate) fn poll_busy(&mut self) -> bool {
        if self.stalled {
            return true;
        }
        match self.pending {
            Some(0) => {
                self.swap();
                false
            }
            Some(n) => {
                self.pending = Some(n - 1);
                true
            }
            None => false,
        }
    }

    pub(crate) fn force_reset(&mut self) {
        self.force_reset_count += 1;
        self.stalled = false;
        if self.pending.is_some() {
            self.swap();
        }
    }

    fn swap(&mut self) {
        self.pending = None;
        self.active = self.active.other();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate() {
        let mut flip = FlipEngine::default();
        flip.request();
        assert_eq!(Page::P1, flip.active());
        assert!(!flip.poll_busy());
        assert_eq!(1, flip.flip_count());
    }

    #[test]
    fn latency() {
        let mut flip = FlipEngine::default();
        flip.set_latency(2);
        flip.request();
        assert_eq!(Page::P0, flip.active());
        assert!(flip.poll_busy());
        assert!(flip.poll_busy());
        assert!(!flip.poll_busy());
        assert_eq!(Page::P1, flip.active());
        assert!(!flip.poll_busy());
    }

    #[test]
    fn stalled() {
        let mut flip = FlipEngine::default();
        flip.stall();
        assert!(flip.poll_busy());
        flip.request();
        assert!(flip.poll_busy());
        assert_eq!(Page::P0, flip.active());
        flip.force_reset();
        assert_eq!(Page::P1, flip.active());
        assert!(!flip.poll_busy());
        assert_eq!(1, flip.force_reset_count());
    }
}
