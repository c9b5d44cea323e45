use crate::sdk::{
    Contact, ContactState, CONTACT_MASK_BOUNDING_BOX, CONTACT_MASK_ELLIPSE, CONTACT_MASK_PEAK,
};
use evdev::{AbsoluteAxisType, EventType, InputEvent};

pub const MAX_TOUCH_POINTS: usize = 10;

const SYN_REPORT: u16 = 0;
const SYN_DROPPED: u16 = 3;

/// Converts raw axis units to millimetres using the kernel-reported resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisScale {
    pub min_x: i32,
    pub min_y: i32,
    /// Units per millimetre; 0 leaves values raw.
    pub res_x: i32,
    pub res_y: i32,
}

impl AxisScale {
    fn x(&self, raw: i32) -> f32 {
        scale(raw - self.min_x, self.res_x)
    }

    fn y(&self, raw: i32) -> f32 {
        scale(raw - self.min_y, self.res_y)
    }

    fn len(&self, raw: i32) -> f32 {
        scale(raw, self.res_x)
    }
}

fn scale(value: i32, res: i32) -> f32 {
    if res > 0 {
        value as f32 / res as f32
    } else {
        value as f32
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SlotData {
    tracking_id: Option<i32>,
    position_x: i32,
    position_y: i32,
    pressure: i32,
    touch_major: i32,
    touch_minor: i32,
    orientation: i32,
}

/// Tracks kernel MT slots and turns each SYN_REPORT into a contact frame.
///
/// A slot becomes START in the first report after it gets a tracking id,
/// MOVE while it keeps it, and END once in the report after release. A slot
/// handed a different tracking id between reports ends the old contact and
/// starts the new one in the same frame.
#[derive(Debug)]
pub struct ContactTracker {
    slot: usize,
    slots: [SlotData; MAX_TOUCH_POINTS],
    reported: [Option<i32>; MAX_TOUCH_POINTS],
    dropping: bool,
    scale: AxisScale,
}

impl ContactTracker {
    pub fn new(scale: AxisScale) -> Self {
        Self {
            slot: 0,
            slots: [SlotData::default(); MAX_TOUCH_POINTS],
            reported: [None; MAX_TOUCH_POINTS],
            dropping: false,
            scale,
        }
    }

    /// Feeds one event; returns a frame when the event completes a report.
    pub fn process(&mut self, event: &InputEvent) -> Option<Vec<Contact>> {
        match event.event_type() {
            EventType::ABSOLUTE if !self.dropping => {
                self.process_abs(AbsoluteAxisType(event.code()), event.value());
                None
            }
            EventType::SYNCHRONIZATION => match event.code() {
                SYN_REPORT if self.dropping => {
                    // Kernel state resumes after the next full report.
                    self.dropping = false;
                    None
                }
                SYN_REPORT => Some(self.emit()),
                SYN_DROPPED => {
                    self.dropping = true;
                    None
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn process_abs(&mut self, code: AbsoluteAxisType, value: i32) {
        if code == AbsoluteAxisType::ABS_MT_SLOT {
            if value >= 0 && (value as usize) < MAX_TOUCH_POINTS {
                self.slot = value as usize;
            }
            return;
        }

        let touch = &mut self.slots[self.slot];
        match code {
            AbsoluteAxisType::ABS_MT_TRACKING_ID => {
                touch.tracking_id = (value >= 0).then_some(value);
            }
            AbsoluteAxisType::ABS_MT_POSITION_X => touch.position_x = value,
            AbsoluteAxisType::ABS_MT_POSITION_Y => touch.position_y = value,
            AbsoluteAxisType::ABS_MT_PRESSURE => touch.pressure = value,
            AbsoluteAxisType::ABS_MT_TOUCH_MAJOR => touch.touch_major = value,
            AbsoluteAxisType::ABS_MT_TOUCH_MINOR => touch.touch_minor = value,
            AbsoluteAxisType::ABS_MT_ORIENTATION => touch.orientation = value,
            _ => {}
        }
    }

    fn emit(&mut self) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for slot in 0..MAX_TOUCH_POINTS {
            let touch = self.slots[slot];
            let id = slot as u8;
            match (touch.tracking_id, self.reported[slot]) {
                (Some(_), None) => contacts.push(self.contact(id, &touch, ContactState::Start)),
                (Some(now), Some(before)) if now == before => {
                    contacts.push(self.contact(id, &touch, ContactState::Move))
                }
                (Some(_), Some(_)) => {
                    contacts.push(self.contact(id, &touch, ContactState::End));
                    contacts.push(self.contact(id, &touch, ContactState::Start));
                }
                (None, Some(_)) => contacts.push(self.contact(id, &touch, ContactState::End)),
                (None, None) => continue,
            }
            self.reported[slot] = touch.tracking_id;
        }
        contacts
    }

    fn contact(&self, id: u8, touch: &SlotData, state: ContactState) -> Contact {
        let x = self.scale.x(touch.position_x);
        let y = self.scale.y(touch.position_y);
        let major = self.scale.len(touch.touch_major);
        // some pads only report the major axis
        let minor = if touch.touch_minor > 0 {
            self.scale.len(touch.touch_minor)
        } else {
            major
        };
        let force = touch.pressure as f32;

        Contact {
            content_bit_mask: CONTACT_MASK_ELLIPSE | CONTACT_MASK_BOUNDING_BOX | CONTACT_MASK_PEAK,
            id,
            state: state.code(),
            x_pos: x,
            y_pos: y,
            total_force: force,
            area: std::f32::consts::FRAC_PI_4 * major * minor,
            orientation: touch.orientation as f32,
            major_axis: major,
            minor_axis: minor,
            min_x: x - major / 2.0,
            min_y: y - minor / 2.0,
            max_x: x + major / 2.0,
            max_y: y + minor / 2.0,
            peak_x: x,
            peak_y: y,
            peak_force: force,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs(code: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, code.0, value)
    }

    fn syn(code: u16) -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION, code, 0)
    }

    fn feed(tracker: &mut ContactTracker, events: &[InputEvent]) -> Vec<Vec<Contact>> {
        events.iter().filter_map(|e| tracker.process(e)).collect()
    }

    fn touch(slot: i32, id: i32, x: i32, y: i32) -> Vec<InputEvent> {
        vec![
            abs(AbsoluteAxisType::ABS_MT_SLOT, slot),
            abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, id),
            abs(AbsoluteAxisType::ABS_MT_POSITION_X, x),
            abs(AbsoluteAxisType::ABS_MT_POSITION_Y, y),
        ]
    }

    #[test]
    fn test_lifecycle_start_move_end() {
        let mut tracker = ContactTracker::new(AxisScale::default());
        let mut events = touch(0, 40, 100, 200);
        events.push(syn(SYN_REPORT));
        events.push(abs(AbsoluteAxisType::ABS_MT_POSITION_X, 110));
        events.push(syn(SYN_REPORT));
        events.push(abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, -1));
        events.push(syn(SYN_REPORT));
        events.push(syn(SYN_REPORT));

        let frames = feed(&mut tracker, &events);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0][0].state(), ContactState::Start);
        assert_eq!(frames[0][0].x_pos, 100.0);
        assert_eq!(frames[1][0].state(), ContactState::Move);
        assert_eq!(frames[1][0].x_pos, 110.0);
        assert_eq!(frames[2][0].state(), ContactState::End);
        assert!(frames[3].is_empty());
    }

    #[test]
    fn test_reused_slot_ends_then_starts() {
        let mut tracker = ContactTracker::new(AxisScale::default());
        let mut events = touch(0, 40, 100, 200);
        events.push(syn(SYN_REPORT));
        events.push(abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, 41));
        events.push(abs(AbsoluteAxisType::ABS_MT_POSITION_X, 300));
        events.push(syn(SYN_REPORT));
        events.push(abs(AbsoluteAxisType::ABS_MT_POSITION_X, 310));
        events.push(syn(SYN_REPORT));

        let frames = feed(&mut tracker, &events);
        let states: Vec<Vec<ContactState>> = frames
            .iter()
            .map(|f| f.iter().map(|c| c.state()).collect())
            .collect();
        assert_eq!(
            states,
            vec![
                vec![ContactState::Start],
                vec![ContactState::End, ContactState::Start],
                vec![ContactState::Move],
            ]
        );
        assert!(frames[1].iter().all(|c| c.id == 0));
        assert_eq!(frames[1][1].x_pos, 300.0);
    }

    #[test]
    fn test_two_slots_use_slot_as_id() {
        let mut tracker = ContactTracker::new(AxisScale::default());
        let mut events = touch(0, 7, 10, 10);
        events.extend(touch(3, 8, 50, 50));
        events.push(syn(SYN_REPORT));

        let frames = feed(&mut tracker, &events);
        let ids: Vec<u8> = frames[0].iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 3]);
    }

    #[test]
    fn test_scale_to_millimetres() {
        let mut tracker = ContactTracker::new(AxisScale {
            min_x: 100,
            min_y: 0,
            res_x: 10,
            res_y: 20,
        });
        let mut events = touch(0, 1, 300, 400);
        events.push(abs(AbsoluteAxisType::ABS_MT_TOUCH_MAJOR, 40));
        events.push(abs(AbsoluteAxisType::ABS_MT_PRESSURE, 55));
        events.push(syn(SYN_REPORT));

        let c = feed(&mut tracker, &events)[0][0];
        assert_eq!(c.x_pos, 20.0);
        assert_eq!(c.y_pos, 20.0);
        assert_eq!(c.min_x, 18.0);
        assert_eq!(c.max_x, 22.0);
        assert_eq!(c.total_force, 55.0);
        assert_eq!(c.peak_force, 55.0);
    }

    #[test]
    fn test_dropped_events_skip_until_report() {
        let mut tracker = ContactTracker::new(AxisScale::default());
        let mut events = vec![syn(SYN_DROPPED)];
        events.extend(touch(0, 1, 5, 5));
        events.push(syn(SYN_REPORT));
        events.extend(touch(0, 2, 6, 6));
        events.push(syn(SYN_REPORT));

        let frames = feed(&mut tracker, &events);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0].x_pos, 6.0);
    }
}
