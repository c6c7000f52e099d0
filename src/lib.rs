use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    async_trait::async_trait,
    bitcoin::hashes::{Hash, sha256d},
    chrono::{DateTime, Utc},
    clap::{Args, Parser},
    decay::DecayingAverage,
    derive_more::Display,
    engine::{Engine, EngineSettings, ShareSubmitter, Target},
    event_sink::EventSink,
    hash_rate::HashRate,
    job::{Job, Share},
    metrics::Metrics,
    pool::{ConnectorEvent, ConnectorSettings, PoolConfig, PoolConnector, PoolState, PoolStats},
    primitive_types::U256,
    rand::Rng,
    serde::{Deserialize, Serialize},
    settings::Settings,
    std::{
        collections::HashSet,
        env,
        fmt::{self, Display, Formatter},
        io,
        path::PathBuf,
        process,
        str::FromStr,
        sync::{
            Arc, LazyLock,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    },
    stratum::{
        Client, ClientConfig, ClientError, Difficulty, Extranonce, JobId, MerkleNode, Nbits, Nonce,
        Notify, Ntime, PrevHash, SubmitOutcome, Version,
    },
    suggest::{NonceSuggester, Suggestions},
    tokio::{
        runtime::Runtime,
        sync::{broadcast, mpsc},
        task::JoinSet,
        time::{Instant, MissedTickBehavior, interval, sleep, timeout},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

mod arguments;
mod decay;
pub mod engine;
pub mod event_sink;
pub mod hash_rate;
pub mod job;
mod logs;
pub mod metrics;
mod options;
pub mod pool;
pub mod settings;
mod signal;
pub mod stratum;
mod subcommand;
pub mod suggest;

pub const USER_AGENT: &str = "pickaxe/0.1.0";
pub const MAX_MESSAGE_SIZE: usize = 32 * 1024;
pub const DEFAULT_STRATUM_PORT: u16 = 3333;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);
pub const SINK_CHANNEL_CAPACITY: usize = 10_000;

type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Strips an optional `stratum+tcp://` scheme and appends the default port
/// when none is given. IPv6 hosts must be bracketed, as in `[::1]:3333`.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint
        .trim()
        .trim_start_matches("stratum+tcp://")
        .trim_end_matches('/');

    let has_port = match endpoint.strip_prefix('[') {
        Some(bracketed) => bracketed.contains("]:"),
        None => endpoint.contains(':'),
    };

    if has_port {
        endpoint.to_string()
    } else {
        format!("{endpoint}:{DEFAULT_STRATUM_PORT}")
    }
}

pub fn main() {
    let _guard = logs::init();

    let args = Arguments::parse();

    Runtime::new()
        .expect("Failed to create tokio runtime")
        .block_on(async {
            let cancel_token = signal::setup_signal_handler();

            match args.run(cancel_token).await {
                Err(err) => {
                    eprintln!("error: {err}");

                    for (i, cause) in err.chain().skip(1).enumerate() {
                        if i == 0 {
                            eprintln!();
                            eprintln!("because:");
                        }
                        eprintln!("- {cause}");
                    }

                    if env::var_os("RUST_BACKTRACE")
                        .map(|val| val == "1")
                        .unwrap_or_default()
                    {
                        eprintln!();
                        eprintln!("{}", err.backtrace());
                    }
                    process::exit(1);
                }
                Ok(_) => {
                    process::exit(0);
                }
            }
        });
}
