use egui::{Color32, FontId, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2};
use morphtap::{ContactState, OutputRow};

pub const MAGENTA: Color32 = Color32::from_rgb(255, 0, 182);
pub const TEAL: Color32 = Color32::from_rgb(0, 213, 255);
pub const ORANGE: Color32 = Color32::from_rgb(255, 101, 0);

/// Channel indices into an output row.
const ID: usize = 0;
const X_POS: usize = 1;
const Y_POS: usize = 2;
const STATE: usize = 3;
const TOTAL_FORCE: usize = 4;
const BOX_MIN_X: usize = 6;
const BOX_MIN_Y: usize = 7;
const BOX_MAX_X: usize = 8;
const BOX_MAX_Y: usize = 9;
const PEAK_X: usize = 11;
const PEAK_Y: usize = 12;

fn fade(color: Color32, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (255.0 * alpha) as u8)
}

fn contact_color(row: &OutputRow) -> Color32 {
    if row.0[STATE] as u32 == ContactState::Start.code() {
        MAGENTA
    } else {
        TEAL
    }
}

/// The heartbeat row carries state code 0 and is not a contact.
pub fn is_contact(row: &OutputRow) -> bool {
    row.0[STATE] as u32 != ContactState::Invalid.code()
}

/// Circle radius for a given force, clamped to a readable range.
fn force_radius(force: f32, cscale: f32) -> f32 {
    (8.0 + force.max(0.0).sqrt() * 1.5).min(48.0) * cscale
}

pub fn draw_sensor_boundary(painter: &Painter, corner: Pos2, width: f32, height: f32) {
    painter.rect_stroke(
        Rect::from_min_size(corner, Vec2::new(width, height)),
        0.0,
        Stroke::new(1.0, ORANGE),
        StrokeKind::Outside,
    );
}

pub fn draw_ring(
    painter: &Painter,
    center: Pos2,
    inner_radius: f32,
    outer_radius: f32,
    color: Color32,
) {
    let mid_radius = (inner_radius + outer_radius) / 2.0;
    let thickness = outer_radius - inner_radius;
    painter.circle_stroke(center, mid_radius, Stroke::new(thickness, color));
}

pub fn draw_trail(painter: &Painter, row: &OutputRow, corner: Pos2, scale: f32, cscale: f32) {
    let pos = to_screen(row.0[X_POS], row.0[Y_POS], corner, scale);
    let color = fade(contact_color(row), 0.2);
    draw_ring(
        painter,
        pos,
        1.0,
        force_radius(row.0[TOTAL_FORCE], cscale) + 2.0,
        color,
    );
}

pub fn draw_contact(painter: &Painter, row: &OutputRow, corner: Pos2, scale: f32, cscale: f32) {
    let pos = to_screen(row.0[X_POS], row.0[Y_POS], corner, scale);
    let color = contact_color(row);

    // Bounding box
    let min = to_screen(row.0[BOX_MIN_X], row.0[BOX_MIN_Y], corner, scale);
    let max = to_screen(row.0[BOX_MAX_X], row.0[BOX_MAX_Y], corner, scale);
    painter.rect_stroke(
        Rect::from_two_pos(min, max),
        0.0,
        Stroke::new(1.0, fade(color, 0.6)),
        StrokeKind::Middle,
    );

    painter.circle_filled(pos, force_radius(row.0[TOTAL_FORCE], cscale), color);

    // Peak force marker
    let peak = to_screen(row.0[PEAK_X], row.0[PEAK_Y], corner, scale);
    painter.circle_filled(peak, 4.0 * cscale, Color32::BLACK);

    let label_pos = Pos2::new(pos.x - 10.0 * cscale, pos.y - 70.0 * cscale);
    painter.text(
        label_pos,
        egui::Align2::LEFT_TOP,
        format!("{}", row.0[ID] as u32),
        FontId::monospace(40.0 * cscale),
        Color32::BLACK,
    );
}

fn to_screen(x: f32, y: f32, corner: Pos2, scale: f32) -> Pos2 {
    Pos2::new(corner.x + x * scale, corner.y + y * scale)
}
