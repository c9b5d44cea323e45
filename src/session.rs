use crate::sdk::{FirmwareInfo, SdkError, SenselSdk, SensorInfo};
use crate::translate::LedSink;
use tracing::warn;

/// A live, fully configured connection. The only place a frame buffer lives.
pub struct Connected<S: SenselSdk> {
    pub handle: S::Handle,
    pub frame: S::Frame,
    pub device_index: usize,
    pub firmware: FirmwareInfo,
    pub sensor: SensorInfo,
}

pub enum SessionState<S: SenselSdk> {
    Disconnected,
    Connected(Connected<S>),
    /// Frame already freed but the close call failed. Not a usable session;
    /// the close is retried on the next teardown.
    Orphaned(S::Handle),
}

impl<S: SenselSdk> Default for SessionState<S> {
    fn default() -> Self {
        SessionState::Disconnected
    }
}

impl<S: SenselSdk> SessionState<S> {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }

    pub fn has_handle(&self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    pub fn connected(&self) -> Option<&Connected<S>> {
        match self {
            SessionState::Connected(c) => Some(c),
            _ => None,
        }
    }

    /// Releases frame then handle. On failure the state reflects how far
    /// teardown got and the error is returned.
    pub fn teardown(&mut self, sdk: &mut S) -> Result<(), SdkError> {
        match std::mem::take(self) {
            SessionState::Disconnected => Ok(()),
            SessionState::Connected(mut c) => {
                if let Err((frame, e)) = sdk.free_frame(&mut c.handle, c.frame) {
                    warn!("free_frame failed, keeping session: {}", e);
                    *self = SessionState::Connected(Connected {
                        handle: c.handle,
                        frame,
                        device_index: c.device_index,
                        firmware: c.firmware,
                        sensor: c.sensor,
                    });
                    return Err(e);
                }
                Self::close_handle(self, sdk, c.handle)
            }
            SessionState::Orphaned(handle) => Self::close_handle(self, sdk, handle),
        }
    }

    fn close_handle(
        state: &mut Self,
        sdk: &mut S,
        handle: S::Handle,
    ) -> Result<(), SdkError> {
        match sdk.close(handle) {
            Ok(()) => Ok(()),
            Err((handle, e)) => {
                warn!("close failed, handle left for retry: {}", e);
                *state = SessionState::Orphaned(handle);
                Err(e)
            }
        }
    }
}

/// A borrow of the SDK together with the connected handle and frame.
///
/// Lives for a single call; nothing can tear the session down while it exists.
pub struct ActiveSession<'a, S: SenselSdk> {
    pub sdk: &'a mut S,
    pub handle: &'a mut S::Handle,
    pub frame: &'a mut S::Frame,
}

impl<'a, S: SenselSdk> ActiveSession<'a, S> {
    pub fn frame(&self) -> &S::Frame {
        &*self.frame
    }
}

impl<S: SenselSdk> LedSink for ActiveSession<'_, S> {
    fn set_led(&mut self, id: u8, level: u16) {
        if let Err(e) = self.sdk.set_led_brightness(self.handle, id, level) {
            warn!("set_led_brightness({}, {}) failed: {}", id, level, e);
        }
    }
}
