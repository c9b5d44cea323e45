use super::{
    Contact, ContactState, DeviceId, FirmwareInfo, FrameBuffer, Release, ScanDetail, SdkError,
    SenselSdk, SensorInfo,
};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    DeviceList,
    Open(u8),
    Close(u32),
    FirmwareInfo,
    SensorInfo,
    SetMaxFrameRate(u16),
    SetScanDetail(ScanDetail),
    SetFrameContent(u8),
    SetContactsMask(u8),
    SetDynamicBaseline(bool),
    SetBlobMerge(bool),
    Allocate(u32),
    Free(u32),
    StartScanning,
    ReadSensor,
    NumAvailable,
    GetFrame,
    SetLed(u8, u16),
}

#[derive(Debug)]
pub struct MockHandle(pub u32);

#[derive(Debug)]
pub struct MockFrame {
    pub id: u32,
    pub contacts: Vec<Contact>,
}

impl FrameBuffer for MockFrame {
    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }
}

#[derive(Debug, Default)]
pub struct MockSdk {
    pub devices: Vec<DeviceId>,
    pub firmware: FirmwareInfo,
    pub sensor: SensorInfo,
    /// Frames waiting in the device queue, oldest first.
    pub queue: VecDeque<Vec<Contact>>,
    pub calls: Vec<Call>,
    pub fail_open: bool,
    pub fail_allocate: bool,
    pub fail_read: bool,
    /// Number of upcoming close calls that fail.
    pub close_failures: u32,
    /// Number of upcoming free calls that fail.
    pub free_failures: u32,
    pub open_handles: HashSet<u32>,
    pub live_frames: HashSet<u32>,
    next_id: u32,
}

impl MockSdk {
    pub fn with_devices(count: u8) -> Self {
        let devices = (0..count)
            .map(|i| DeviceId {
                idx: i,
                serial_num: format!("SM0{}", i),
                com_port: format!("/dev/ttyACM{}", i),
            })
            .collect();
        Self {
            devices,
            firmware: FirmwareInfo {
                major: 0,
                minor: 19,
                build: 298,
                ..Default::default()
            },
            sensor: SensorInfo {
                max_contacts: 16,
                num_rows: 105,
                num_cols: 185,
                width: 240.0,
                height: 139.0,
            },
            ..Default::default()
        }
    }

    pub fn push_frame(&mut self, contacts: Vec<Contact>) {
        self.queue.push_back(contacts);
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn led_calls(&self) -> Vec<(u8, u16)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SetLed(id, level) => Some((*id, *level)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_handle(&self, handle: &MockHandle) {
        assert!(
            self.open_handles.contains(&handle.0),
            "call on closed handle {}",
            handle.0
        );
    }
}

pub fn contact(id: u8, state: ContactState) -> Contact {
    Contact {
        id,
        state: state.code(),
        x_pos: id as f32 * 10.0,
        y_pos: id as f32 * 5.0,
        total_force: 100.0 + id as f32,
        area: 20.0,
        min_x: 1.0,
        min_y: 2.0,
        max_x: 3.0,
        max_y: 4.0,
        peak_force: 50.0,
        peak_x: 6.0,
        peak_y: 7.0,
        ..Default::default()
    }
}

impl SenselSdk for MockSdk {
    type Handle = MockHandle;
    type Frame = MockFrame;

    fn device_list(&mut self) -> Vec<DeviceId> {
        self.calls.push(Call::DeviceList);
        self.devices.clone()
    }

    fn open(&mut self, idx: u8) -> Result<MockHandle, SdkError> {
        self.calls.push(Call::Open(idx));
        if self.fail_open {
            return Err(SdkError::failed("open"));
        }
        let id = self.next_id();
        self.open_handles.insert(id);
        Ok(MockHandle(id))
    }

    fn close(&mut self, handle: MockHandle) -> Release<MockHandle> {
        self.calls.push(Call::Close(handle.0));
        self.check_handle(&handle);
        if self.close_failures > 0 {
            self.close_failures -= 1;
            return Err((handle, SdkError::failed("close")));
        }
        self.open_handles.remove(&handle.0);
        Ok(())
    }

    fn firmware_info(&mut self, handle: &mut MockHandle) -> Result<FirmwareInfo, SdkError> {
        self.calls.push(Call::FirmwareInfo);
        self.check_handle(handle);
        Ok(self.firmware)
    }

    fn sensor_info(&mut self, handle: &mut MockHandle) -> Result<SensorInfo, SdkError> {
        self.calls.push(Call::SensorInfo);
        self.check_handle(handle);
        Ok(self.sensor)
    }

    fn set_max_frame_rate(&mut self, _handle: &mut MockHandle, hz: u16) -> Result<(), SdkError> {
        self.calls.push(Call::SetMaxFrameRate(hz));
        Ok(())
    }

    fn set_scan_detail(
        &mut self,
        _handle: &mut MockHandle,
        detail: ScanDetail,
    ) -> Result<(), SdkError> {
        self.calls.push(Call::SetScanDetail(detail));
        Ok(())
    }

    fn set_frame_content(&mut self, _handle: &mut MockHandle, mask: u8) -> Result<(), SdkError> {
        self.calls.push(Call::SetFrameContent(mask));
        Ok(())
    }

    fn set_contacts_mask(&mut self, _handle: &mut MockHandle, mask: u8) -> Result<(), SdkError> {
        self.calls.push(Call::SetContactsMask(mask));
        Ok(())
    }

    fn set_dynamic_baseline_enabled(
        &mut self,
        _handle: &mut MockHandle,
        enabled: bool,
    ) -> Result<(), SdkError> {
        self.calls.push(Call::SetDynamicBaseline(enabled));
        Ok(())
    }

    fn set_contacts_blob_merge(
        &mut self,
        _handle: &mut MockHandle,
        enabled: bool,
    ) -> Result<(), SdkError> {
        self.calls.push(Call::SetBlobMerge(enabled));
        Ok(())
    }

    fn allocate_frame(&mut self, handle: &mut MockHandle) -> Result<MockFrame, SdkError> {
        self.check_handle(handle);
        if self.fail_allocate {
            return Err(SdkError::failed("allocate_frame"));
        }
        let id = self.next_id();
        self.calls.push(Call::Allocate(id));
        self.live_frames.insert(id);
        Ok(MockFrame {
            id,
            contacts: Vec::new(),
        })
    }

    fn free_frame(&mut self, handle: &mut MockHandle, frame: MockFrame) -> Release<MockFrame> {
        self.calls.push(Call::Free(frame.id));
        self.check_handle(handle);
        if self.free_failures > 0 {
            self.free_failures -= 1;
            return Err((frame, SdkError::failed("free_frame")));
        }
        assert!(self.live_frames.remove(&frame.id), "double free");
        Ok(())
    }

    fn start_scanning(&mut self, handle: &mut MockHandle) -> Result<(), SdkError> {
        self.calls.push(Call::StartScanning);
        self.check_handle(handle);
        Ok(())
    }

    fn read_sensor(&mut self, handle: &mut MockHandle) -> Result<(), SdkError> {
        self.calls.push(Call::ReadSensor);
        self.check_handle(handle);
        if self.fail_read {
            return Err(SdkError::failed("read_sensor"));
        }
        Ok(())
    }

    fn num_available_frames(&mut self, handle: &mut MockHandle) -> Result<u32, SdkError> {
        self.calls.push(Call::NumAvailable);
        self.check_handle(handle);
        Ok(self.queue.len() as u32)
    }

    fn get_frame(&mut self, handle: &mut MockHandle, frame: &mut MockFrame) -> Result<(), SdkError> {
        self.calls.push(Call::GetFrame);
        self.check_handle(handle);
        assert!(self.live_frames.contains(&frame.id), "read of freed frame");
        match self.queue.pop_front() {
            Some(contacts) => {
                frame.contacts = contacts;
                Ok(())
            }
            None => Err(SdkError::failed("get_frame")),
        }
    }

    fn set_led_brightness(
        &mut self,
        handle: &mut MockHandle,
        led_id: u8,
        brightness: u16,
    ) -> Result<(), SdkError> {
        self.calls.push(Call::SetLed(led_id, brightness));
        self.check_handle(handle);
        Ok(())
    }
}
