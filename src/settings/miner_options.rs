use super::*;

#[derive(Clone, Debug, Default, Args)]
pub(crate) struct MinerOptions {
    #[arg(help = "Mine on stratum pool at <HOST:PORT>.")]
    pub(crate) stratum_endpoint: Option<String>,

    #[arg(long, help = "Authorize to the pool as <USERNAME>.")]
    pub(crate) username: Option<String>,

    #[arg(long, help = "Authorize to the pool with <PASSWORD>. [default: x]")]
    pub(crate) password: Option<String>,

    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Give the command line pool <PRIORITY>. Higher is preferred. [default: 0]"
    )]
    pub(crate) priority: Option<i32>,

    #[arg(long, help = "Number of <CPU_CORES> to use. [default: all]")]
    pub(crate) cpu_cores: Option<usize>,

    #[arg(long, help = "Search <NONCE_RANGE> nonces from each starting point.")]
    pub(crate) nonce_range: Option<u64>,

    #[arg(long, help = "Search from <RANDOM_STARTS> random nonces per job.")]
    pub(crate) random_starts: Option<usize>,

    #[arg(long, help = "Exit <ONCE> a share is accepted.")]
    pub(crate) once: bool,

    #[arg(long, help = "Log miner status every <STATUS_INTERVAL> seconds.")]
    pub(crate) status_interval: Option<u64>,
}
