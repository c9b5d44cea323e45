use crate::dimensions::Dimensions;
use crate::render;
use morphtap::operator::DETECT_PULSE;
use morphtap::{ChannelBuffer, MorphOperator, OutputRow, SenselSdk};
use std::collections::VecDeque;

pub const HISTORY_MAX: usize = 20;

/// Plays the host: one output cycle per repaint, then draws the rows.
pub struct MorphApp<S: SenselSdk> {
    op: MorphOperator<S>,
    dims: Dimensions,
    current_rows: Vec<OutputRow>,
    history: VecDeque<Vec<OutputRow>>,
    trails: usize,
    connected: bool,
}

impl<S: SenselSdk> MorphApp<S> {
    pub fn new(op: MorphOperator<S>, trails: usize) -> Self {
        Self {
            op,
            dims: Dimensions::default(),
            current_rows: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_MAX),
            trails,
            connected: false,
        }
    }

    fn cycle(&mut self) {
        let previous = std::mem::take(&mut self.current_rows);
        if !previous.is_empty() {
            if self.history.len() == HISTORY_MAX {
                self.history.pop_back();
            }
            self.history.push_front(previous);
        }

        self.connected = false;
        if let Some(info) = self.op.output_info() {
            self.connected = true;
            let mut buffer = ChannelBuffer::new(&info);
            self.op.execute(&mut buffer);
            self.current_rows = (0..buffer.num_samples())
                .filter_map(|i| buffer.row(i))
                .filter(render::is_contact)
                .collect();
        }

        let sensor = self.op.devices().sensor();
        self.dims.set_sensor_size(sensor.width, sensor.height);
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading(morphtap::operator::OP_LABEL);
        ui.separator();

        if ui.button("Detect Sensels").clicked() {
            self.op.pulse(DETECT_PULSE);
        }
        ui.label(if self.connected {
            "connected"
        } else {
            "no device"
        });

        ui.separator();
        for chan in self.op.info_channels() {
            ui.monospace(format!("{}: {}", chan.name, chan.value));
        }
        ui.monospace(format!("contacts: {}", self.current_rows.len()));

        ui.separator();
        let table = self.op.info_table();
        egui::Grid::new("device_info")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for (key, value) in &table.rows {
                    ui.monospace(*key);
                    ui.monospace(value.as_str());
                    ui.end_row();
                }
            });
    }
}

impl<S: SenselSdk> eframe::App for MorphApp<S> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.cycle();

        egui::SidePanel::right("diagnostics")
            .resizable(false)
            .show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::WHITE))
            .show(ctx, |ui| {
                let area = ui.max_rect();
                self.dims.screen_width = area.width();
                self.dims.screen_height = area.height();

                for row in &self.current_rows {
                    self.dims.maybe_grow_sensor_extent(row.0[1], row.0[2]);
                }

                let scale = self.dims.get_sensor_scale();
                let corner = self.dims.get_sensor_corner(area.min, scale);
                let cscale = (scale / 3.0).clamp(0.3, 1.5);
                let painter = ui.painter();

                render::draw_sensor_boundary(
                    painter,
                    corner,
                    self.dims.sensor_extent_x * scale,
                    self.dims.sensor_extent_y * scale,
                );

                for rows in self.history.iter().take(self.trails.min(HISTORY_MAX)) {
                    for row in rows {
                        render::draw_trail(painter, row, corner, scale, cscale);
                    }
                }

                for row in &self.current_rows {
                    render::draw_contact(painter, row, corner, scale, cscale);
                }

                if !self.connected {
                    painter.text(
                        area.center(),
                        egui::Align2::CENTER_CENTER,
                        "No device. Press Detect to retry",
                        egui::FontId::proportional(20.0),
                        egui::Color32::GRAY,
                    );
                }
            });

        // Request continuous repaint for animation
        ctx.request_repaint();
    }
}
