use {super::*, options::Options};

mod miner;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Mine on one or more stratum pools with failover")]
    Miner(miner::Miner),
}

impl Subcommand {
    pub(crate) async fn run(self, options: Options, cancel_token: CancellationToken) -> Result {
        match self {
            Self::Miner(miner) => miner.run(options, cancel_token).await,
        }
    }
}
