use super::{
    Contact, DeviceId, FirmwareInfo, FrameBuffer, Release, ScanDetail, SdkError, SenselSdk,
    SensorInfo,
};
use libc::{c_char, c_int, c_uchar, c_uint, c_ushort, c_void};
use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_LIBRARY: &str = "libsensel.so";

const SENSEL_MAX_DEVICES: usize = 16;
const SENSEL_OK: c_int = 0;

type Status = c_int;
type RawHandle = *mut c_void;

#[repr(C)]
struct RawDeviceId {
    idx: c_uchar,
    serial_num: [c_uchar; 64],
    com_port: [c_uchar; 64],
}

#[repr(C)]
struct RawDeviceList {
    num_devices: c_uchar,
    devices: [RawDeviceId; SENSEL_MAX_DEVICES],
}

#[repr(C)]
#[derive(Default)]
struct RawSensorInfo {
    max_contacts: c_uchar,
    num_rows: c_ushort,
    num_cols: c_ushort,
    width: f32,
    height: f32,
}

#[repr(C)]
#[derive(Default)]
struct RawFirmwareInfo {
    fw_protocol_version: c_uchar,
    fw_version_major: c_uchar,
    fw_version_minor: c_uchar,
    fw_version_build: c_ushort,
    fw_version_release: c_uchar,
    device_id: c_ushort,
    device_revision: c_uchar,
}

#[repr(C)]
#[allow(dead_code)]
struct RawFrameData {
    content_bit_mask: c_uchar,
    lost_frame_count: c_int,
    n_contacts: c_uchar,
    contacts: *mut Contact,
    force_array: *mut f32,
    labels_array: *mut c_uchar,
    accel_data: *mut c_void,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid library path: {0}")]
    BadPath(String),
    #[error("dlopen {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("missing symbol {0}")]
    Symbol(&'static str),
}

struct Api {
    get_device_list: unsafe extern "C" fn(*mut RawDeviceList) -> Status,
    open_device_by_id: unsafe extern "C" fn(*mut RawHandle, c_uchar) -> Status,
    close: unsafe extern "C" fn(RawHandle) -> Status,
    get_firmware_info: unsafe extern "C" fn(RawHandle, *mut RawFirmwareInfo) -> Status,
    get_sensor_info: unsafe extern "C" fn(RawHandle, *mut RawSensorInfo) -> Status,
    set_max_frame_rate: unsafe extern "C" fn(RawHandle, c_ushort) -> Status,
    set_scan_detail: unsafe extern "C" fn(RawHandle, c_int) -> Status,
    set_frame_content: unsafe extern "C" fn(RawHandle, c_uchar) -> Status,
    set_contacts_mask: unsafe extern "C" fn(RawHandle, c_uchar) -> Status,
    set_dynamic_baseline_enabled: unsafe extern "C" fn(RawHandle, c_uchar) -> Status,
    set_contacts_enable_blob_merge: unsafe extern "C" fn(RawHandle, c_uchar) -> Status,
    allocate_frame_data: unsafe extern "C" fn(RawHandle, *mut *mut RawFrameData) -> Status,
    free_frame_data: unsafe extern "C" fn(RawHandle, *mut RawFrameData) -> Status,
    start_scanning: unsafe extern "C" fn(RawHandle) -> Status,
    read_sensor: unsafe extern "C" fn(RawHandle) -> Status,
    get_num_available_frames: unsafe extern "C" fn(RawHandle, *mut c_uint) -> Status,
    get_frame: unsafe extern "C" fn(RawHandle, *mut RawFrameData) -> Status,
    set_led_brightness: unsafe extern "C" fn(RawHandle, c_uchar, c_ushort) -> Status,
}

/// Opaque device handle returned by `senselOpenDeviceByID`.
pub struct SenselHandle(NonNull<c_void>);

/// Frame storage allocated by `senselAllocateFrameData`.
pub struct SenselFrame(NonNull<RawFrameData>);

impl FrameBuffer for SenselFrame {
    fn contacts(&self) -> &[Contact] {
        // Valid until the frame is freed, which consumes self.
        let raw = unsafe { self.0.as_ref() };
        if raw.contacts.is_null() || raw.n_contacts == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(raw.contacts, raw.n_contacts as usize) }
    }
}

pub struct LibSensel {
    lib: NonNull<c_void>,
    api: Api,
}

impl LibSensel {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let shown = path.display().to_string();
        let cpath = CString::new(path.as_os_str().as_encoded_bytes())
            .map_err(|_| LoadError::BadPath(shown.clone()))?;

        let lib = unsafe { libc::dlopen(cpath.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        let lib = NonNull::new(lib).ok_or_else(|| LoadError::Open {
            path: shown.clone(),
            reason: last_dl_error(),
        })?;

        let api = match unsafe { resolve(lib) } {
            Ok(api) => api,
            Err(e) => {
                unsafe { libc::dlclose(lib.as_ptr()) };
                return Err(e);
            }
        };

        debug!("loaded {}", shown);
        Ok(Self { lib, api })
    }
}

impl Drop for LibSensel {
    fn drop(&mut self) {
        unsafe { libc::dlclose(self.lib.as_ptr()) };
    }
}

fn last_dl_error() -> String {
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown error".to_string()
    } else {
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

unsafe fn symbol<T: Copy>(lib: NonNull<c_void>, name: &'static CStr) -> Result<T, LoadError> {
    let ptr = libc::dlsym(lib.as_ptr(), name.as_ptr() as *const c_char);
    if ptr.is_null() {
        return Err(LoadError::Symbol(name.to_str().unwrap_or("?")));
    }
    Ok(std::mem::transmute_copy::<*mut c_void, T>(&ptr))
}

unsafe fn resolve(lib: NonNull<c_void>) -> Result<Api, LoadError> {
    Ok(Api {
        get_device_list: symbol(lib, c"senselGetDeviceList")?,
        open_device_by_id: symbol(lib, c"senselOpenDeviceByID")?,
        close: symbol(lib, c"senselClose")?,
        get_firmware_info: symbol(lib, c"senselGetFirmwareInfo")?,
        get_sensor_info: symbol(lib, c"senselGetSensorInfo")?,
        set_max_frame_rate: symbol(lib, c"senselSetMaxFrameRate")?,
        set_scan_detail: symbol(lib, c"senselSetScanDetail")?,
        set_frame_content: symbol(lib, c"senselSetFrameContent")?,
        set_contacts_mask: symbol(lib, c"senselSetContactsMask")?,
        set_dynamic_baseline_enabled: symbol(lib, c"senselSetDynamicBaselineEnabled")?,
        set_contacts_enable_blob_merge: symbol(lib, c"senselSetContactsEnableBlobMerge")?,
        allocate_frame_data: symbol(lib, c"senselAllocateFrameData")?,
        free_frame_data: symbol(lib, c"senselFreeFrameData")?,
        start_scanning: symbol(lib, c"senselStartScanning")?,
        read_sensor: symbol(lib, c"senselReadSensor")?,
        get_num_available_frames: symbol(lib, c"senselGetNumAvailableFrames")?,
        get_frame: symbol(lib, c"senselGetFrame")?,
        set_led_brightness: symbol(lib, c"senselSetLEDBrightness")?,
    })
}

fn check(status: Status, call: &'static str) -> Result<(), SdkError> {
    if status == SENSEL_OK {
        Ok(())
    } else {
        Err(SdkError::failed(call))
    }
}

/// NUL-terminated prefix of a fixed-size C string field.
fn c_field(bytes: &[c_uchar]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl SenselSdk for LibSensel {
    type Handle = SenselHandle;
    type Frame = SenselFrame;

    fn device_list(&mut self) -> Vec<DeviceId> {
        let mut list: RawDeviceList = unsafe { std::mem::zeroed() };
        if let Err(e) = check(unsafe { (self.api.get_device_list)(&mut list) }, "senselGetDeviceList")
        {
            warn!("{}", e);
            return Vec::new();
        }
        let count = (list.num_devices as usize).min(SENSEL_MAX_DEVICES);
        list.devices[..count]
            .iter()
            .map(|d| DeviceId {
                idx: d.idx,
                serial_num: c_field(&d.serial_num),
                com_port: c_field(&d.com_port),
            })
            .collect()
    }

    fn open(&mut self, idx: u8) -> Result<SenselHandle, SdkError> {
        let mut raw: RawHandle = ptr::null_mut();
        check(
            unsafe { (self.api.open_device_by_id)(&mut raw, idx) },
            "senselOpenDeviceByID",
        )?;
        NonNull::new(raw)
            .map(SenselHandle)
            .ok_or_else(|| SdkError::failed("senselOpenDeviceByID"))
    }

    fn close(&mut self, handle: SenselHandle) -> Release<SenselHandle> {
        match check(unsafe { (self.api.close)(handle.0.as_ptr()) }, "senselClose") {
            Ok(()) => Ok(()),
            Err(e) => Err((handle, e)),
        }
    }

    fn firmware_info(&mut self, handle: &mut SenselHandle) -> Result<FirmwareInfo, SdkError> {
        let mut raw = RawFirmwareInfo::default();
        check(
            unsafe { (self.api.get_firmware_info)(handle.0.as_ptr(), &mut raw) },
            "senselGetFirmwareInfo",
        )?;
        Ok(FirmwareInfo {
            protocol_version: raw.fw_protocol_version,
            major: raw.fw_version_major,
            minor: raw.fw_version_minor,
            build: raw.fw_version_build,
            release: raw.fw_version_release,
            device_id: raw.device_id,
            device_revision: raw.device_revision,
        })
    }

    fn sensor_info(&mut self, handle: &mut SenselHandle) -> Result<SensorInfo, SdkError> {
        let mut raw = RawSensorInfo::default();
        check(
            unsafe { (self.api.get_sensor_info)(handle.0.as_ptr(), &mut raw) },
            "senselGetSensorInfo",
        )?;
        Ok(SensorInfo {
            max_contacts: raw.max_contacts,
            num_rows: raw.num_rows,
            num_cols: raw.num_cols,
            width: raw.width,
            height: raw.height,
        })
    }

    fn set_max_frame_rate(&mut self, handle: &mut SenselHandle, hz: u16) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.set_max_frame_rate)(handle.0.as_ptr(), hz) },
            "senselSetMaxFrameRate",
        )
    }

    fn set_scan_detail(
        &mut self,
        handle: &mut SenselHandle,
        detail: ScanDetail,
    ) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.set_scan_detail)(handle.0.as_ptr(), detail as c_int) },
            "senselSetScanDetail",
        )
    }

    fn set_frame_content(&mut self, handle: &mut SenselHandle, mask: u8) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.set_frame_content)(handle.0.as_ptr(), mask) },
            "senselSetFrameContent",
        )
    }

    fn set_contacts_mask(&mut self, handle: &mut SenselHandle, mask: u8) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.set_contacts_mask)(handle.0.as_ptr(), mask) },
            "senselSetContactsMask",
        )
    }

    fn set_dynamic_baseline_enabled(
        &mut self,
        handle: &mut SenselHandle,
        enabled: bool,
    ) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.set_dynamic_baseline_enabled)(handle.0.as_ptr(), enabled as c_uchar) },
            "senselSetDynamicBaselineEnabled",
        )
    }

    fn set_contacts_blob_merge(
        &mut self,
        handle: &mut SenselHandle,
        enabled: bool,
    ) -> Result<(), SdkError> {
        check(
            unsafe {
                (self.api.set_contacts_enable_blob_merge)(handle.0.as_ptr(), enabled as c_uchar)
            },
            "senselSetContactsEnableBlobMerge",
        )
    }

    fn allocate_frame(&mut self, handle: &mut SenselHandle) -> Result<SenselFrame, SdkError> {
        let mut raw: *mut RawFrameData = ptr::null_mut();
        check(
            unsafe { (self.api.allocate_frame_data)(handle.0.as_ptr(), &mut raw) },
            "senselAllocateFrameData",
        )?;
        NonNull::new(raw)
            .map(SenselFrame)
            .ok_or_else(|| SdkError::failed("senselAllocateFrameData"))
    }

    fn free_frame(&mut self, handle: &mut SenselHandle, frame: SenselFrame) -> Release<SenselFrame> {
        match check(
            unsafe { (self.api.free_frame_data)(handle.0.as_ptr(), frame.0.as_ptr()) },
            "senselFreeFrameData",
        ) {
            Ok(()) => Ok(()),
            Err(e) => Err((frame, e)),
        }
    }

    fn start_scanning(&mut self, handle: &mut SenselHandle) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.start_scanning)(handle.0.as_ptr()) },
            "senselStartScanning",
        )
    }

    fn read_sensor(&mut self, handle: &mut SenselHandle) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.read_sensor)(handle.0.as_ptr()) },
            "senselReadSensor",
        )
    }

    fn num_available_frames(&mut self, handle: &mut SenselHandle) -> Result<u32, SdkError> {
        let mut count: c_uint = 0;
        check(
            unsafe { (self.api.get_num_available_frames)(handle.0.as_ptr(), &mut count) },
            "senselGetNumAvailableFrames",
        )?;
        Ok(count)
    }

    fn get_frame(
        &mut self,
        handle: &mut SenselHandle,
        frame: &mut SenselFrame,
    ) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.get_frame)(handle.0.as_ptr(), frame.0.as_ptr()) },
            "senselGetFrame",
        )
    }

    fn set_led_brightness(
        &mut self,
        handle: &mut SenselHandle,
        led_id: u8,
        brightness: u16,
    ) -> Result<(), SdkError> {
        check(
            unsafe { (self.api.set_led_brightness)(handle.0.as_ptr(), led_id, brightness) },
            "senselSetLEDBrightness",
        )
    }
}
