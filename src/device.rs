use crate::sdk::{
    DeviceId, FirmwareInfo, ScanDetail, SdkError, SenselSdk, SensorInfo,
    CONTACT_MASK_BOUNDING_BOX, CONTACT_MASK_PEAK, FRAME_CONTENT_CONTACTS_MASK,
};
use crate::session::{ActiveSession, Connected, SessionState};
use tracing::{debug, info, warn};

/// Settings applied to every device right after it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub max_frame_rate: u16,
    pub scan_detail: ScanDetail,
    pub frame_content: u8,
    pub contacts_mask: u8,
    pub dynamic_baseline: bool,
    pub blob_merge: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            max_frame_rate: 125,
            scan_detail: ScanDetail::Low,
            frame_content: FRAME_CONTENT_CONTACTS_MASK,
            contacts_mask: CONTACT_MASK_BOUNDING_BOX | CONTACT_MASK_PEAK,
            dynamic_baseline: true,
            blob_merge: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected { device_index: usize },
    NoDevices,
    OpenFailed,
    AllocateFailed,
    /// The previous session could not be released; nothing else was attempted.
    TeardownFailed,
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected { .. })
    }
}

pub struct DeviceManager<S: SenselSdk> {
    sdk: S,
    state: SessionState<S>,
    devices: Vec<DeviceId>,
    firmware: FirmwareInfo,
    sensor: SensorInfo,
    config: DeviceConfig,
}

impl<S: SenselSdk> DeviceManager<S> {
    pub fn new(sdk: S) -> Self {
        Self {
            sdk,
            state: SessionState::Disconnected,
            devices: Vec::new(),
            firmware: FirmwareInfo::default(),
            sensor: SensorInfo::default(),
            config: DeviceConfig::default(),
        }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    #[cfg(test)]
    pub(crate) fn sdk_mut(&mut self) -> &mut S {
        &mut self.sdk
    }

    pub fn state(&self) -> &SessionState<S> {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Index into the device list of the connected device, if any.
    pub fn device_index(&self) -> Option<usize> {
        self.state.connected().map(|c| c.device_index)
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// Metadata from the most recent successful open.
    pub fn firmware(&self) -> FirmwareInfo {
        self.firmware
    }

    pub fn sensor(&self) -> SensorInfo {
        self.sensor
    }

    pub fn discover(&mut self) -> &[DeviceId] {
        self.devices = self.sdk.device_list();
        debug!("discovered {} device(s)", self.devices.len());
        &self.devices
    }

    /// Tears down any current session, rediscovers, and opens `device_index`.
    pub fn connect(&mut self, device_index: usize) -> ConnectOutcome {
        if self.state.teardown(&mut self.sdk).is_err() {
            return ConnectOutcome::TeardownFailed;
        }

        if self.discover().is_empty() {
            info!("no devices found");
            return ConnectOutcome::NoDevices;
        }

        let Some(idx) = self.devices.get(device_index).map(|d| d.idx) else {
            warn!(
                "device index {} out of range ({} found)",
                device_index,
                self.devices.len()
            );
            return ConnectOutcome::OpenFailed;
        };

        let mut handle = match self.sdk.open(idx) {
            Ok(h) => h,
            Err(e) => {
                warn!("open device {} failed: {}", idx, e);
                return ConnectOutcome::OpenFailed;
            }
        };

        match self.sdk.firmware_info(&mut handle) {
            Ok(fw) => self.firmware = fw,
            Err(e) => warn!("firmware info unavailable: {}", e),
        }
        match self.sdk.sensor_info(&mut handle) {
            Ok(sensor) => self.sensor = sensor,
            Err(e) => warn!("sensor info unavailable: {}", e),
        }

        self.configure(&mut handle);

        let frame = match self.sdk.allocate_frame(&mut handle) {
            Ok(f) => f,
            Err(e) => {
                warn!("frame allocation failed: {}", e);
                if let Err((_, e)) = self.sdk.close(handle) {
                    warn!("close after failed allocation failed: {}", e);
                }
                return ConnectOutcome::AllocateFailed;
            }
        };

        if let Err(e) = self.sdk.start_scanning(&mut handle) {
            warn!("start_scanning failed: {}", e);
        }

        info!(
            "connected to device {} (serial {}, firmware {}.{}.{})",
            idx,
            self.devices[device_index].serial_num,
            self.firmware.major,
            self.firmware.minor,
            self.firmware.build
        );

        self.state = SessionState::Connected(Connected {
            handle,
            frame,
            device_index,
            firmware: self.firmware,
            sensor: self.sensor,
        });
        ConnectOutcome::Connected { device_index }
    }

    /// Frees the frame then closes the handle. Safe when already disconnected.
    pub fn disconnect(&mut self) -> Result<(), SdkError> {
        let result = self.state.teardown(&mut self.sdk);
        if result.is_ok() {
            debug!("disconnected");
        }
        result
    }

    /// Borrows the live session for one call, or `None` when not connected.
    pub fn active(&mut self) -> Option<ActiveSession<'_, S>> {
        match &mut self.state {
            SessionState::Connected(c) => Some(ActiveSession {
                sdk: &mut self.sdk,
                handle: &mut c.handle,
                frame: &mut c.frame,
            }),
            _ => None,
        }
    }

    fn configure(&mut self, handle: &mut S::Handle) {
        let cfg = self.config;
        let results = [
            self.sdk.set_max_frame_rate(handle, cfg.max_frame_rate),
            self.sdk.set_scan_detail(handle, cfg.scan_detail),
            self.sdk.set_frame_content(handle, cfg.frame_content),
            self.sdk.set_contacts_mask(handle, cfg.contacts_mask),
            self.sdk
                .set_dynamic_baseline_enabled(handle, cfg.dynamic_baseline),
            self.sdk.set_contacts_blob_merge(handle, cfg.blob_merge),
        ];
        for e in results.into_iter().filter_map(Result::err) {
            warn!("device configuration: {}", e);
        }
    }
}

impl<S: SenselSdk> Drop for DeviceManager<S> {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!("teardown on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::mock::{Call, MockSdk};

    fn invariant_holds(m: &DeviceManager<MockSdk>) -> bool {
        let sdk = m.sdk();
        match m.state() {
            SessionState::Connected(_) => sdk.open_handles.len() == 1 && sdk.live_frames.len() == 1,
            SessionState::Disconnected => sdk.open_handles.is_empty() && sdk.live_frames.is_empty(),
            SessionState::Orphaned(_) => sdk.open_handles.len() == 1 && sdk.live_frames.is_empty(),
        }
    }

    #[test]
    fn test_connect_applies_fixed_config() {
        let mut m = DeviceManager::new(MockSdk::with_devices(1));
        assert_eq!(m.connect(0), ConnectOutcome::Connected { device_index: 0 });
        let calls = &m.sdk().calls;
        assert!(calls.contains(&Call::SetMaxFrameRate(125)));
        assert!(calls.contains(&Call::SetScanDetail(ScanDetail::Low)));
        assert!(calls.contains(&Call::SetFrameContent(FRAME_CONTENT_CONTACTS_MASK)));
        assert!(calls.contains(&Call::SetContactsMask(
            CONTACT_MASK_BOUNDING_BOX | CONTACT_MASK_PEAK
        )));
        assert!(calls.contains(&Call::SetDynamicBaseline(true)));
        assert!(calls.contains(&Call::SetBlobMerge(true)));
        assert_eq!(calls.last(), Some(&Call::StartScanning));
        assert_eq!(m.firmware().build, 298);
        assert_eq!(m.sensor().num_cols, 185);
        assert!(invariant_holds(&m));
    }

    #[test]
    fn test_connect_without_devices_is_idle() {
        let mut m = DeviceManager::new(MockSdk::default());
        assert_eq!(m.connect(0), ConnectOutcome::NoDevices);
        assert!(!m.is_connected());
        assert!(m.active().is_none());
        assert!(invariant_holds(&m));
    }

    #[test]
    fn test_open_failure_leaves_no_session() {
        let mut sdk = MockSdk::with_devices(1);
        sdk.fail_open = true;
        let mut m = DeviceManager::new(sdk);
        assert_eq!(m.connect(0), ConnectOutcome::OpenFailed);
        assert!(!m.state().has_handle());
        assert!(invariant_holds(&m));
    }

    #[test]
    fn test_out_of_range_index_is_open_failure() {
        let mut m = DeviceManager::new(MockSdk::with_devices(1));
        assert_eq!(m.connect(3), ConnectOutcome::OpenFailed);
        assert_eq!(m.sdk().count(|c| matches!(c, Call::Open(_))), 0);
    }

    #[test]
    fn test_allocate_failure_closes_handle() {
        let mut sdk = MockSdk::with_devices(1);
        sdk.fail_allocate = true;
        let mut m = DeviceManager::new(sdk);
        assert_eq!(m.connect(0), ConnectOutcome::AllocateFailed);
        assert!(!m.state().has_handle());
        assert!(invariant_holds(&m));
    }

    #[test]
    fn test_reconnect_releases_previous_session() {
        let mut m = DeviceManager::new(MockSdk::with_devices(2));
        m.connect(0);
        assert!(m.connect(1).is_connected());
        assert_eq!(m.device_index(), Some(1));
        assert!(invariant_holds(&m));
    }

    #[test]
    fn test_free_failure_aborts_connect() {
        let mut m = DeviceManager::new(MockSdk::with_devices(1));
        m.connect(0);
        m.sdk_mut().free_failures = 1;
        m.sdk_mut().clear_calls();

        assert_eq!(m.connect(0), ConnectOutcome::TeardownFailed);
        assert!(m.is_connected());
        assert_eq!(m.sdk().count(|c| matches!(c, Call::Close(_))), 0);
        assert_eq!(m.sdk().count(|c| *c == Call::DeviceList), 0);
        assert!(invariant_holds(&m));
    }

    #[test]
    fn test_close_failure_is_retried() {
        let mut m = DeviceManager::new(MockSdk::with_devices(1));
        m.connect(0);
        m.sdk_mut().close_failures = 1;

        assert_eq!(m.connect(0), ConnectOutcome::TeardownFailed);
        assert!(matches!(m.state(), SessionState::Orphaned(_)));
        assert!(m.active().is_none());
        assert!(invariant_holds(&m));

        assert!(m.connect(0).is_connected());
        assert!(invariant_holds(&m));
    }

    #[test]
    fn test_disconnect_when_idle_is_noop() {
        let mut m = DeviceManager::new(MockSdk::with_devices(1));
        assert!(m.disconnect().is_ok());
        assert!(m.sdk().calls.is_empty());
    }

    #[test]
    fn test_invariant_over_sequence() {
        let mut m = DeviceManager::new(MockSdk::with_devices(1));
        for step in 0..12 {
            match step % 4 {
                0 => {
                    m.connect(0);
                }
                1 => m.sdk_mut().close_failures = 1,
                2 => {
                    let _ = m.disconnect();
                }
                _ => m.sdk_mut().free_failures = 1,
            }
            assert!(invariant_holds(&m), "step {}", step);
        }
    }
}
