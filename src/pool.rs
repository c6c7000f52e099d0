use {super::*, parking_lot::Mutex, selector::Cooldown};

mod config;
mod connector;
mod selector;
mod state;
mod stats;

pub use {
    config::PoolConfig,
    connector::{ConnectorEvent, ConnectorSettings, PoolConnector, PoolSnapshot},
    state::PoolState,
    stats::PoolStats,
};
