use super::*;

/// Things the pool pushes at us, in arrival order.
#[derive(Debug, Clone)]
pub enum Event {
    Notify(Notify),
    SetDifficulty(Difficulty),
    /// `client.reconnect`; the connection is torn down right after this.
    Reconnect,
    Disconnected,
}
