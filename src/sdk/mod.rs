//! Hardware-facing contract for pressure-sensing multitouch devices.
//!
//! The engine never talks to a device directly; everything goes through
//! [`SenselSdk`]. Backends wrap the vendor library or emulate it.

#[cfg(target_os = "linux")]
pub mod libsensel;
#[cfg(test)]
pub(crate) mod mock;
#[cfg(target_os = "linux")]
pub mod touchpad;

use thiserror::Error;

pub const FRAME_CONTENT_CONTACTS_MASK: u8 = 0x04;

pub const CONTACT_MASK_ELLIPSE: u8 = 0x01;
pub const CONTACT_MASK_BOUNDING_BOX: u8 = 0x04;
pub const CONTACT_MASK_PEAK: u8 = 0x08;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("{call} failed")]
    CallFailed { call: &'static str },
    #[error("no device at index {0}")]
    NoSuchDevice(usize),
    #[error("device i/o: {0}")]
    Io(String),
}

impl SdkError {
    pub fn failed(call: &'static str) -> Self {
        SdkError::CallFailed { call }
    }
}

/// Result of a release call. On failure the resource is handed back.
pub type Release<T> = Result<(), (T, SdkError)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceId {
    pub idx: u8,
    pub serial_num: String,
    pub com_port: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub protocol_version: u8,
    pub major: u8,
    pub minor: u8,
    pub build: u16,
    pub release: u8,
    pub device_id: u16,
    pub device_revision: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorInfo {
    pub max_contacts: u8,
    pub num_rows: u16,
    pub num_cols: u16,
    /// Physical width in millimetres.
    pub width: f32,
    /// Physical height in millimetres.
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ScanDetail {
    High = 0,
    Medium = 1,
    Low = 2,
}

/// Contact lifecycle, using the vendor's numeric encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ContactState {
    Invalid = 0,
    Start = 1,
    Move = 2,
    End = 3,
}

impl ContactState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ContactState::Start,
            2 => ContactState::Move,
            3 => ContactState::End,
            _ => ContactState::Invalid,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// One tracked contact as laid out by the vendor library.
///
/// `state` stays raw so unknown codes pass through untouched; use
/// [`Contact::state`] for the decoded value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Contact {
    pub content_bit_mask: u8,
    pub id: u8,
    pub state: u32,
    pub x_pos: f32,
    pub y_pos: f32,
    pub total_force: f32,
    pub area: f32,
    pub orientation: f32,
    pub major_axis: f32,
    pub minor_axis: f32,
    pub delta_x: f32,
    pub delta_y: f32,
    pub delta_force: f32,
    pub delta_area: f32,
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub peak_x: f32,
    pub peak_y: f32,
    pub peak_force: f32,
}

impl Contact {
    pub fn state(&self) -> ContactState {
        ContactState::from_raw(self.state)
    }

    pub fn is_ended(&self) -> bool {
        self.state() == ContactState::End
    }
}

/// A frame buffer owned by a backend. Only readable while its owner holds it.
pub trait FrameBuffer {
    fn contacts(&self) -> &[Contact];
}

/// The vendor SDK's function set, one method per hardware call.
///
/// Handles and frames are moved into `close`/`free_frame`; on failure the
/// backend returns them so the caller still owns a live resource.
pub trait SenselSdk {
    type Handle;
    type Frame: FrameBuffer;

    /// Lists attached devices. An empty list is a normal outcome.
    fn device_list(&mut self) -> Vec<DeviceId>;
    fn open(&mut self, idx: u8) -> Result<Self::Handle, SdkError>;
    fn close(&mut self, handle: Self::Handle) -> Release<Self::Handle>;

    fn firmware_info(&mut self, handle: &mut Self::Handle) -> Result<FirmwareInfo, SdkError>;
    fn sensor_info(&mut self, handle: &mut Self::Handle) -> Result<SensorInfo, SdkError>;

    fn set_max_frame_rate(&mut self, handle: &mut Self::Handle, hz: u16) -> Result<(), SdkError>;
    fn set_scan_detail(
        &mut self,
        handle: &mut Self::Handle,
        detail: ScanDetail,
    ) -> Result<(), SdkError>;
    fn set_frame_content(&mut self, handle: &mut Self::Handle, mask: u8) -> Result<(), SdkError>;
    fn set_contacts_mask(&mut self, handle: &mut Self::Handle, mask: u8) -> Result<(), SdkError>;
    fn set_dynamic_baseline_enabled(
        &mut self,
        handle: &mut Self::Handle,
        enabled: bool,
    ) -> Result<(), SdkError>;
    fn set_contacts_blob_merge(
        &mut self,
        handle: &mut Self::Handle,
        enabled: bool,
    ) -> Result<(), SdkError>;

    fn allocate_frame(&mut self, handle: &mut Self::Handle) -> Result<Self::Frame, SdkError>;
    fn free_frame(&mut self, handle: &mut Self::Handle, frame: Self::Frame)
        -> Release<Self::Frame>;

    fn start_scanning(&mut self, handle: &mut Self::Handle) -> Result<(), SdkError>;
    /// Pulls pending samples into the device queue without touching any frame.
    fn read_sensor(&mut self, handle: &mut Self::Handle) -> Result<(), SdkError>;
    fn num_available_frames(&mut self, handle: &mut Self::Handle) -> Result<u32, SdkError>;
    /// Pops the oldest queued frame into `frame`, overwriting it.
    fn get_frame(&mut self, handle: &mut Self::Handle, frame: &mut Self::Frame)
        -> Result<(), SdkError>;

    fn set_led_brightness(
        &mut self,
        handle: &mut Self::Handle,
        led_id: u8,
        brightness: u16,
    ) -> Result<(), SdkError>;
}
