pub mod discovery;
pub mod multitouch;

use super::{
    Contact, DeviceId, FirmwareInfo, FrameBuffer, Release, ScanDetail, SdkError, SenselSdk,
    SensorInfo,
};
use discovery::TouchpadNode;
use evdev::{AbsoluteAxisType, Device};
use multitouch::{AxisScale, ContactTracker, MAX_TOUCH_POINTS};
use std::collections::VecDeque;
use std::io;
use std::os::fd::AsRawFd;
use tracing::{debug, trace, warn};

/// Oldest frames are dropped past this many unread reports.
pub const MAX_QUEUED_FRAMES: usize = 64;

pub struct TouchpadHandle {
    device: Device,
    tracker: ContactTracker,
    queue: VecDeque<Vec<Contact>>,
    scale: AxisScale,
    ranges: (i32, i32),
}

#[derive(Debug, Default)]
pub struct TouchpadFrame {
    contacts: Vec<Contact>,
}

impl FrameBuffer for TouchpadFrame {
    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }
}

#[derive(Default)]
pub struct TouchpadSdk {
    nodes: Vec<TouchpadNode>,
}

impl TouchpadSdk {
    pub fn new() -> Self {
        Self::default()
    }
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn enqueue(queue: &mut VecDeque<Vec<Contact>>, frame: Vec<Contact>) {
    if queue.len() == MAX_QUEUED_FRAMES {
        queue.pop_front();
    }
    queue.push_back(frame);
}

/// Axis origin and resolution plus the raw (x, y) extents.
fn axis_geometry(device: &Device) -> io::Result<(AxisScale, (i32, i32))> {
    let abs = device.get_abs_state()?;
    let x = abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
    let y = abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
    Ok((
        AxisScale {
            min_x: x.minimum,
            min_y: y.minimum,
            res_x: x.resolution,
            res_y: y.resolution,
        },
        (x.maximum - x.minimum, y.maximum - y.minimum),
    ))
}

impl SenselSdk for TouchpadSdk {
    type Handle = TouchpadHandle;
    type Frame = TouchpadFrame;

    fn device_list(&mut self) -> Vec<DeviceId> {
        self.nodes = match discovery::find_touchpads() {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("touchpad discovery: {}", e);
                Vec::new()
            }
        };
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| DeviceId {
                idx: i as u8,
                serial_num: node.serial.clone(),
                com_port: node.devnode.display().to_string(),
            })
            .collect()
    }

    fn open(&mut self, idx: u8) -> Result<TouchpadHandle, SdkError> {
        let node = self
            .nodes
            .get(idx as usize)
            .ok_or(SdkError::NoSuchDevice(idx as usize))?;
        let device = Device::open(&node.devnode)
            .map_err(|e| SdkError::Io(format!("{}: {}", node.devnode.display(), e)))?;
        set_nonblocking(&device).map_err(|e| SdkError::Io(e.to_string()))?;

        let (scale, ranges) = axis_geometry(&device).unwrap_or_else(|e| {
            warn!("no axis info for {}: {}", node.devnode.display(), e);
            (AxisScale::default(), (0, 0))
        });
        debug!("opened {} ({:?})", node.devnode.display(), scale);

        Ok(TouchpadHandle {
            device,
            tracker: ContactTracker::new(scale),
            queue: VecDeque::new(),
            scale,
            ranges,
        })
    }

    fn close(&mut self, handle: TouchpadHandle) -> Release<TouchpadHandle> {
        drop(handle);
        Ok(())
    }

    fn firmware_info(&mut self, handle: &mut TouchpadHandle) -> Result<FirmwareInfo, SdkError> {
        let id = handle.device.input_id();
        Ok(FirmwareInfo {
            major: (id.version() >> 8) as u8,
            minor: id.version() as u8,
            device_id: id.product(),
            ..Default::default()
        })
    }

    fn sensor_info(&mut self, handle: &mut TouchpadHandle) -> Result<SensorInfo, SdkError> {
        let (range_x, range_y) = handle.ranges;
        let mm = |range: i32, res: i32| if res > 0 { range as f32 / res as f32 } else { 0.0 };
        Ok(SensorInfo {
            max_contacts: MAX_TOUCH_POINTS as u8,
            num_rows: range_y.clamp(0, u16::MAX as i32) as u16,
            num_cols: range_x.clamp(0, u16::MAX as i32) as u16,
            width: mm(range_x, handle.scale.res_x),
            height: mm(range_y, handle.scale.res_y),
        })
    }

    fn set_max_frame_rate(&mut self, _handle: &mut TouchpadHandle, hz: u16) -> Result<(), SdkError> {
        debug!("max frame rate {} ignored", hz);
        Ok(())
    }

    fn set_scan_detail(
        &mut self,
        _handle: &mut TouchpadHandle,
        _detail: ScanDetail,
    ) -> Result<(), SdkError> {
        Ok(())
    }

    fn set_frame_content(&mut self, _handle: &mut TouchpadHandle, _mask: u8) -> Result<(), SdkError> {
        Ok(())
    }

    fn set_contacts_mask(&mut self, _handle: &mut TouchpadHandle, _mask: u8) -> Result<(), SdkError> {
        Ok(())
    }

    fn set_dynamic_baseline_enabled(
        &mut self,
        _handle: &mut TouchpadHandle,
        _enabled: bool,
    ) -> Result<(), SdkError> {
        Ok(())
    }

    fn set_contacts_blob_merge(
        &mut self,
        _handle: &mut TouchpadHandle,
        _enabled: bool,
    ) -> Result<(), SdkError> {
        Ok(())
    }

    fn allocate_frame(&mut self, _handle: &mut TouchpadHandle) -> Result<TouchpadFrame, SdkError> {
        Ok(TouchpadFrame::default())
    }

    fn free_frame(
        &mut self,
        _handle: &mut TouchpadHandle,
        frame: TouchpadFrame,
    ) -> Release<TouchpadFrame> {
        drop(frame);
        Ok(())
    }

    fn start_scanning(&mut self, handle: &mut TouchpadHandle) -> Result<(), SdkError> {
        handle.queue.clear();
        Ok(())
    }

    fn read_sensor(&mut self, handle: &mut TouchpadHandle) -> Result<(), SdkError> {
        let events = match handle.device.fetch_events() {
            Ok(events) => events,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(SdkError::Io(e.to_string())),
        };
        for event in events {
            if let Some(frame) = handle.tracker.process(&event) {
                enqueue(&mut handle.queue, frame);
            }
        }
        trace!("{} frame(s) queued", handle.queue.len());
        Ok(())
    }

    fn num_available_frames(&mut self, handle: &mut TouchpadHandle) -> Result<u32, SdkError> {
        Ok(handle.queue.len() as u32)
    }

    fn get_frame(
        &mut self,
        handle: &mut TouchpadHandle,
        frame: &mut TouchpadFrame,
    ) -> Result<(), SdkError> {
        let contacts = handle
            .queue
            .pop_front()
            .ok_or_else(|| SdkError::failed("get_frame"))?;
        frame.contacts = contacts;
        Ok(())
    }

    fn set_led_brightness(
        &mut self,
        _handle: &mut TouchpadHandle,
        led_id: u8,
        brightness: u16,
    ) -> Result<(), SdkError> {
        trace!("led {} -> {} (no leds)", led_id, brightness);
        Ok(())
    }
}
