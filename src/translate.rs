use crate::channels::{ChannelBuffer, OutputRow, NUM_CHANNELS};
use crate::sdk::{Contact, ContactState};

pub const LED_ON: u16 = 100;
pub const LED_OFF: u16 = 0;

/// Anything that can drive a per-contact LED.
pub trait LedSink {
    fn set_led(&mut self, id: u8, level: u16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedCommand {
    pub id: u8,
    pub level: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationPlan {
    pub rows: Vec<OutputRow>,
    pub leds: Vec<LedCommand>,
}

impl TranslationPlan {
    /// Packs rows from sample 0 upward. Extra rows beyond the buffer are dropped.
    pub fn write_into(&self, buffer: &mut ChannelBuffer) {
        for (i, row) in self.rows.iter().enumerate() {
            buffer.write_row(i, row);
        }
    }
}

/// Rows to request for this frame: live contacts, or a single heartbeat
/// row when the frame holds no contacts at all.
pub fn row_count(contacts: &[Contact]) -> usize {
    if contacts.is_empty() {
        return 1;
    }
    contacts.iter().filter(|c| !c.is_ended()).count()
}

pub fn plan(contacts: &[Contact]) -> TranslationPlan {
    if contacts.is_empty() {
        return TranslationPlan {
            rows: vec![OutputRow([0.0; NUM_CHANNELS])],
            leds: Vec::new(),
        };
    }

    let mut plan = TranslationPlan::default();
    for contact in contacts {
        match contact.state() {
            ContactState::Start => plan.leds.push(LedCommand {
                id: contact.id,
                level: LED_ON,
            }),
            ContactState::End => {
                plan.leds.push(LedCommand {
                    id: contact.id,
                    level: LED_OFF,
                });
                continue;
            }
            _ => {}
        }
        plan.rows.push(contact_row(contact));
    }
    plan
}

pub fn apply_leds(commands: &[LedCommand], sink: &mut impl LedSink) {
    for cmd in commands {
        sink.set_led(cmd.id, cmd.level);
    }
}

fn contact_row(c: &Contact) -> OutputRow {
    OutputRow([
        c.id as f32,
        c.x_pos,
        c.y_pos,
        // raw vendor code, not remapped
        c.state as f32,
        c.total_force,
        c.area,
        c.min_x,
        c.min_y,
        c.max_x,
        c.max_y,
        c.peak_force,
        c.peak_x,
        c.peak_y,
    ])
}
