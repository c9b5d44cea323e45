//! Bridges a pressure-sensing multitouch device to a fixed 13-channel
//! per-contact output, one row per live contact per cycle.

pub mod acquisition;
pub mod channels;
pub mod device;
pub mod diagnostics;
pub mod operator;
pub mod sdk;
pub mod session;
pub mod translate;
pub mod warmup;

pub use acquisition::DrainMode;
pub use channels::{ChannelBuffer, OutputInfo, OutputRow, CHANNEL_NAMES};
pub use operator::MorphOperator;
pub use sdk::{Contact, ContactState, SenselSdk};
