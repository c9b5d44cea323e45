use crate::sdk::{DeviceId, FirmwareInfo, SensorInfo};

#[derive(Debug, Clone, PartialEq)]
pub struct InfoChannel {
    pub name: &'static str,
    pub value: f32,
}

pub fn info_channels(skipped_frames: i64) -> Vec<InfoChannel> {
    vec![InfoChannel {
        name: "skippedFrames",
        value: skipped_frames as f32,
    }]
}

/// Key/value rows. Empty (0x0) when no device is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoTable {
    pub rows: Vec<(&'static str, String)>,
}

impl InfoTable {
    /// Builds the table for the first discovered device.
    pub fn build(devices: &[DeviceId], firmware: &FirmwareInfo, sensor: &SensorInfo) -> Self {
        let Some(device) = devices.first() else {
            return Self::default();
        };

        Self {
            rows: vec![
                ("device_id", device.idx.to_string()),
                ("serial_num", device.serial_num.clone()),
                ("firmware_major", firmware.major.to_string()),
                ("firmware_minor", firmware.minor.to_string()),
                ("firmware_build", firmware.build.to_string()),
                ("width", format!("{:.6}", sensor.width)),
                ("height", format!("{:.6}", sensor.height)),
                ("cols", sensor.num_cols.to_string()),
                ("rows", sensor.num_rows.to_string()),
            ],
        }
    }

    /// (rows, cols)
    pub fn size(&self) -> (usize, usize) {
        if self.rows.is_empty() {
            (0, 0)
        } else {
            (self.rows.len(), 2)
        }
    }

    pub fn entry(&self, index: usize) -> Option<(&str, &str)> {
        self.rows.get(index).map(|(k, v)| (*k, v.as_str()))
    }
}
