use core::time::Duration;

/// Timeouts of the page flip handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlipConfig {
    /// How long to wait for the timing engine to go idle before forcing the flip.
    pub timeout: Duration,
    /// Interval between busy polls.
    pub poll_interval: Duration,
}

impl FlipConfig {
    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub(crate) fn polls(&self) -> u128 {
        self.timeout.as_nanos() / self.poll_interval.as_nanos().max(1)
    }
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10),
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Parameters shared by every timing program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Delay before the anti-blooming edge at the start of a frame, in timing clocks.
    pub t2_time: u32,
    /// Length of the blank program that lets a readout finish, in timing clocks.
    pub readout_time: u32,
    /// Re-synchronize every frame on the frame trigger in standard mode.
    pub disable_frame_trig: bool,
    /// Do not drive the external IO during integration.
    pub disable_io_drive: bool,
    /// Flip handshake.
    pub flip: FlipConfig,
}

impl TimingConfig {
    /// Sets the t2 time.
    #[must_use]
    pub const fn with_t2_time(mut self, t2_time: u32) -> Self {
        self.t2_time = t2_time;
        self
    }

    /// Sets the readout time of the blank program.
    #[must_use]
    pub const fn with_readout_time(mut self, readout_time: u32) -> Self {
        self.readout_time = readout_time;
        self
    }

    /// Sets whether standard mode waits on the frame trigger.
    #[must_use]
    pub const fn with_disable_frame_trig(mut self, disable_frame_trig: bool) -> Self {
        self.disable_frame_trig = disable_frame_trig;
        self
    }

    /// Sets whether the external IO is driven during integration.
    #[must_use]
    pub const fn with_disable_io_drive(mut self, disable_io_drive: bool) -> Self {
        self.disable_io_drive = disable_io_drive;
        self
    }

    /// Sets the flip handshake.
    #[must_use]
    pub const fn with_flip(mut self, flip: FlipConfig) -> Self {
        self.flip = flip;
        self
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            t2_time: 17,
            readout_time: 90000,
            disable_frame_trig: true,
            disable_io_drive: false,
            flip: FlipConfig::default(),
        }
    }
}
