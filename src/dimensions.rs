use egui::Pos2;

/// Maps sensor millimetres onto the drawing area.
pub struct Dimensions {
    pub sensor_extent_x: f32,
    pub sensor_extent_y: f32,
    pub screen_width: f32,
    pub screen_height: f32,
    pub margin: f32,
}

impl Default for Dimensions {
    fn default() -> Self {
        // Morph active area
        Self {
            sensor_extent_x: 240.0,
            sensor_extent_y: 139.0,
            screen_width: 672.0,
            screen_height: 432.0,
            margin: 15.0,
        }
    }
}

impl Dimensions {
    /// Adopts the reported sensor size when the device gives one.
    pub fn set_sensor_size(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.sensor_extent_x = width;
            self.sensor_extent_y = height;
        }
    }

    pub fn get_sensor_scale(&self) -> f32 {
        let ratio_screen = self.screen_width / self.screen_height;
        let ratio_sensor = self.sensor_extent_x / self.sensor_extent_y;

        if ratio_screen > ratio_sensor {
            self.screen_height / (self.sensor_extent_y + self.margin * 2.0)
        } else {
            self.screen_width / (self.sensor_extent_x + self.margin * 2.0)
        }
    }

    pub fn get_sensor_corner(&self, origin: Pos2, scale: f32) -> Pos2 {
        Pos2::new(
            origin.x + self.screen_width / 2.0 - (self.sensor_extent_x / 2.0) * scale,
            origin.y + self.screen_height / 2.0 - (self.sensor_extent_y / 2.0) * scale,
        )
    }

    pub fn maybe_grow_sensor_extent(&mut self, x: f32, y: f32) {
        if self.sensor_extent_x < x {
            self.sensor_extent_x = x;
        }
        if self.sensor_extent_y < y {
            self.sensor_extent_y = y;
        }
    }
}
