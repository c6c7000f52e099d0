use {
    super::*,
    event_sink::{Event, LogSink},
    settings::MinerOptions,
};

#[derive(Debug, Parser)]
pub(crate) struct Miner {
    #[command(flatten)]
    options: MinerOptions,
}

impl Miner {
    pub(crate) async fn run(self, options: Options, cancel_token: CancellationToken) -> Result {
        let settings = Settings::load(options, self.options)?;

        for pool in &settings.pools {
            info!(
                "Pool {} at {} as {} (priority {})",
                pool.name,
                pool.address(),
                pool.username,
                pool.priority
            );
        }

        info!("CPU cores to use: {}", settings.cpu_cores());

        let connector = Arc::new(
            PoolConnector::new(settings.pools(), settings.connector_settings())
                .context("failed to set up pool connector")?,
        );

        let metrics = Arc::new(Metrics::new());
        let mut tasks = JoinSet::new();

        let sink = event_sink::spawn(
            Box::new(LogSink::default()),
            cancel_token.clone(),
            &mut tasks,
        );

        let events = connector.subscribe();
        connector.spawn(cancel_token.clone(), &mut tasks);

        spawn_status(
            metrics.clone(),
            connector.clone(),
            sink.clone(),
            settings.status_interval(),
            cancel_token.clone(),
            &mut tasks,
        );

        let shares = Engine::new(settings.engine_settings(), connector.clone(), metrics.clone())
            .with_sink(sink)
            .run(events, cancel_token.clone())
            .await;

        cancel_token.cancel();

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                warn!("Background task failed: {err}");
            }
        }

        info!("{}", metrics.status_line(None));

        if settings.once {
            println!("{}", serde_json::to_string_pretty(&shares)?);
        }

        Ok(())
    }
}

fn spawn_status(
    metrics: Arc<Metrics>,
    connector: Arc<PoolConnector>,
    sink: mpsc::Sender<Event>,
    period: Duration,
    cancel: CancellationToken,
    tasks: &mut JoinSet<()>,
) {
    tasks.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut reported = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    info!("{}", metrics.status_line(connector.current_pool().as_deref()));

                    let total = metrics.total_hashes();
                    if total > reported {
                        if sink.try_send(Event::Hashes { count: total - reported }).is_err() {
                            debug!("Event sink full; hash count deferred");
                            continue;
                        }
                        reported = total;
                    }
                }
            }
        }
    });
}
