use crate::acquisition::{DrainMode, FrameAcquisition};
use crate::channels::{ChannelBuffer, GeneralInfo, OutputInfo, CHANNEL_NAMES};
use crate::device::{ConnectOutcome, DeviceManager};
use crate::diagnostics::{self, InfoChannel, InfoTable};
use crate::sdk::{FrameBuffer, SenselSdk};
use crate::translate;
use crate::warmup::Warmup;
use tracing::{debug, info};

pub const OP_LABEL: &str = "Sensel Morph Raw";
pub const DETECT_PULSE: &str = "Detect";

/// `output_info` refreshes the frame and decides the row count, then
/// `execute` fills that shape from the same frame. A reconnect in between
/// voids the cycle.
pub struct MorphOperator<S: SenselSdk> {
    devices: DeviceManager<S>,
    warmup: Warmup,
    acquisition: FrameAcquisition,
    /// Row count decided by `output_info`, consumed by `execute`.
    pending_rows: Option<usize>,
}

impl<S: SenselSdk> MorphOperator<S> {
    /// Creates the operator and attempts the initial connection.
    pub fn new(sdk: S, mode: DrainMode) -> Self {
        let mut op = Self {
            devices: DeviceManager::new(sdk),
            warmup: Warmup::default(),
            acquisition: FrameAcquisition::new(mode),
            pending_rows: None,
        };
        op.connect(0);
        op
    }

    pub fn devices(&self) -> &DeviceManager<S> {
        &self.devices
    }

    #[cfg(test)]
    pub(crate) fn devices_mut(&mut self) -> &mut DeviceManager<S> {
        &mut self.devices
    }

    pub fn warmup(&self) -> Warmup {
        self.warmup
    }

    pub fn general_info(&self) -> GeneralInfo {
        GeneralInfo::default()
    }

    /// Refreshes the frame and reports the output shape, or `None` when
    /// there is no session and so nothing to output.
    pub fn output_info(&mut self) -> Option<OutputInfo> {
        if self.warmup.take_pending() {
            debug!("forced reconnect before first read");
            self.connect(0);
        }

        self.acquisition.reset();
        self.pending_rows = None;

        let mut session = self.devices.active()?;
        self.acquisition.acquire(&mut session);
        let rows = translate::row_count(session.frame().contacts());
        self.pending_rows = Some(rows);
        Some(OutputInfo::with_samples(rows))
    }

    pub fn channel_name(&self, index: usize) -> Option<&'static str> {
        CHANNEL_NAMES.get(index).copied()
    }

    /// Fills `output` from the frame read by the preceding `output_info`
    /// and drives LED feedback. Does nothing without a decided shape.
    pub fn execute(&mut self, output: &mut ChannelBuffer) {
        let Some(rows) = self.pending_rows.take() else {
            return;
        };
        let Some(mut session) = self.devices.active() else {
            return;
        };

        let plan = translate::plan(session.frame().contacts());
        translate::apply_leds(&plan.leds, &mut session);
        debug_assert_eq!(plan.rows.len(), rows);
        plan.write_into(output);
    }

    pub fn info_channels(&self) -> Vec<InfoChannel> {
        diagnostics::info_channels(self.acquisition.skipped_frames())
    }

    pub fn info_table(&self) -> InfoTable {
        InfoTable::build(
            self.devices.devices(),
            &self.devices.firmware(),
            &self.devices.sensor(),
        )
    }

    pub fn pulse(&mut self, name: &str) {
        if name == DETECT_PULSE {
            info!("detect requested");
            self.connect(0);
        } else {
            debug!("ignoring unknown pulse {:?}", name);
        }
    }

    fn connect(&mut self, device_index: usize) -> ConnectOutcome {
        self.pending_rows = None;
        let outcome = self.devices.connect(device_index);
        self.warmup.on_connect(outcome.is_connected());
        outcome
    }
}
