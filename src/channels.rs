pub const NUM_CHANNELS: usize = 13;
pub const SAMPLE_RATE: f32 = 60.0;

pub const CHANNEL_NAMES: [&str; NUM_CHANNELS] = [
    "id",
    "x_pos",
    "y_pos",
    "state",
    "total_force",
    "area",
    "box_min_x",
    "box_min_y",
    "box_max_x",
    "box_max_y",
    "peak_force",
    "peak_x",
    "peak_y",
];

/// Per-operator behaviour flags reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralInfo {
    pub cook_every_frame: bool,
    pub timeslice: bool,
}

impl Default for GeneralInfo {
    fn default() -> Self {
        Self {
            cook_every_frame: true,
            timeslice: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputInfo {
    pub num_channels: usize,
    pub num_samples: usize,
    pub sample_rate: f32,
}

impl OutputInfo {
    pub fn with_samples(num_samples: usize) -> Self {
        Self {
            num_channels: NUM_CHANNELS,
            num_samples,
            sample_rate: SAMPLE_RATE,
        }
    }
}

/// One contact's values in [`CHANNEL_NAMES`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputRow(pub [f32; NUM_CHANNELS]);

impl OutputRow {
    pub fn get(&self, name: &str) -> Option<f32> {
        CHANNEL_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }
}

/// Channel-major sample storage, `channels[channel][sample]`, zero filled.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl ChannelBuffer {
    pub fn new(info: &OutputInfo) -> Self {
        Self {
            channels: vec![vec![0.0; info.num_samples]; info.num_channels],
            num_samples: info.num_samples,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Writes `row` at sample `index`. Out-of-range rows are dropped.
    pub fn write_row(&mut self, index: usize, row: &OutputRow) {
        if index >= self.num_samples {
            return;
        }
        for (channel, value) in self.channels.iter_mut().zip(row.0.iter()) {
            channel[index] = *value;
        }
    }

    pub fn row(&self, index: usize) -> Option<OutputRow> {
        if index >= self.num_samples || self.channels.len() < NUM_CHANNELS {
            return None;
        }
        let mut row = OutputRow::default();
        for (value, channel) in row.0.iter_mut().zip(&self.channels) {
            *value = channel[index];
        }
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order() {
        assert_eq!(CHANNEL_NAMES[0], "id");
        assert_eq!(CHANNEL_NAMES[3], "state");
        assert_eq!(CHANNEL_NAMES[12], "peak_y");
    }

    #[test]
    fn test_write_row_out_of_range_dropped() {
        let mut buf = ChannelBuffer::new(&OutputInfo::with_samples(1));
        let row = OutputRow([1.0; NUM_CHANNELS]);
        buf.write_row(3, &row);
        assert_eq!(buf.row(0), Some(OutputRow::default()));

        buf.write_row(0, &row);
        assert_eq!(buf.row(0), Some(row));
        assert_eq!(buf.channel(12), Some(&[1.0][..]));
    }
}
