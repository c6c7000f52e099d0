use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum PoolState {
    #[default]
    #[display("disconnected")]
    Disconnected,
    #[display("connecting")]
    Connecting,
    #[display("connected")]
    Connected,
    #[display("authorized")]
    Authorized,
    #[display("mining")]
    Mining,
    #[display("error")]
    Error,
}
