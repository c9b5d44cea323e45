/// The vendor library stalls on the first sensor read of its first
/// connection; one forced reconnect before the first output request clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Warmup {
    #[default]
    NeverConnected,
    PendingReconnect,
    Stable,
}

impl Warmup {
    /// Records a connection result. Only the first success arms the reconnect.
    pub fn on_connect(&mut self, connected: bool) {
        if connected && *self == Warmup::NeverConnected {
            *self = Warmup::PendingReconnect;
        }
    }

    /// Returns true once, when the forced reconnect is due.
    pub fn take_pending(&mut self) -> bool {
        if *self == Warmup::PendingReconnect {
            *self = Warmup::Stable;
            true
        } else {
            false
        }
    }
}
