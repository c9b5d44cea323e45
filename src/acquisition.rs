use crate::sdk::SenselSdk;
use crate::session::ActiveSession;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    /// Pull every queued frame and keep the newest.
    #[default]
    Backlog,
    /// Pull one frame per cycle; anything else stays queued for later cycles.
    LatestOnly,
}

#[derive(Debug, Clone)]
pub struct FrameAcquisition {
    mode: DrainMode,
    skipped_frames: i64,
}

impl Default for FrameAcquisition {
    fn default() -> Self {
        Self::new(DrainMode::default())
    }
}

impl FrameAcquisition {
    pub fn new(mode: DrainMode) -> Self {
        Self {
            mode,
            skipped_frames: -1,
        }
    }

    /// Frames available at the last read minus one; -1 when nothing was read.
    ///
    /// In [`DrainMode::LatestOnly`] this counts frames left in the queue
    /// rather than frames discarded.
    pub fn skipped_frames(&self) -> i64 {
        self.skipped_frames
    }

    /// Forgets the previous cycle's count. Called at the start of every cycle.
    pub fn reset(&mut self) {
        self.skipped_frames = -1;
    }

    /// Reads the sensor and refreshes the session's frame buffer.
    ///
    /// With nothing available the buffer keeps its previous contents.
    pub fn acquire<S: SenselSdk>(&mut self, session: &mut ActiveSession<'_, S>) -> i64 {
        let available = match session.sdk.read_sensor(session.handle) {
            Ok(()) => session
                .sdk
                .num_available_frames(session.handle)
                .unwrap_or_else(|e| {
                    warn!("num_available_frames failed: {}", e);
                    0
                }),
            Err(e) => {
                warn!("read_sensor failed: {}", e);
                0
            }
        };

        let pulls = match self.mode {
            DrainMode::Backlog => available,
            DrainMode::LatestOnly => available.min(1),
        };

        for i in 0..pulls {
            if let Err(e) = session.sdk.get_frame(session.handle, session.frame) {
                warn!("get_frame {}/{} failed: {}", i + 1, pulls, e);
                break;
            }
        }

        self.skipped_frames = i64::from(available) - 1;
        if self.skipped_frames > 0 {
            debug!("skipped {} frame(s)", self.skipped_frames);
        } else {
            trace!("{} frame(s) available", available);
        }
        self.skipped_frames
    }
}
