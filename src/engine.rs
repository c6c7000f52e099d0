use {
    super::*,
    crate::event_sink::Event as SinkEvent,
    hasher::{Hasher, Search},
    starts::starting_points,
};

mod hasher;
mod header;
mod starts;
mod target;

pub use {header::Header, target::Target};

/// Where the engine sends shares. Returns whether the pool accepted.
#[async_trait]
pub trait ShareSubmitter: Send + Sync {
    async fn submit_share(&self, share: &Share) -> bool;

    fn pool_name(&self) -> Option<String> {
        None
    }
}

#[async_trait]
impl ShareSubmitter for PoolConnector {
    async fn submit_share(&self, share: &Share) -> bool {
        PoolConnector::submit_share(self, share).await
    }

    fn pool_name(&self) -> Option<String> {
        self.current_pool()
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Search tasks per job, each with its own extranonce2.
    pub workers: usize,
    /// Nonces tried from each starting point.
    pub nonce_range: u64,
    pub random_starts: usize,
    pub max_suggestions: usize,
    pub suggestion_timeout: Duration,
    /// Hashes between yields to the runtime.
    pub batch_size: u32,
    /// Stop after the first accepted share.
    pub once: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            nonce_range: 1 << 20,
            random_starts: 4,
            max_suggestions: 8,
            suggestion_timeout: Duration::from_millis(250),
            batch_size: 4096,
            once: false,
        }
    }
}

struct Solution {
    generation: u64,
    extranonce2: Extranonce,
    nonce: Nonce,
    hash: [u8; 32],
}

struct Running {
    job: Arc<Job>,
    generation: u64,
    cancel: CancellationToken,
}

struct Worker {
    job: Arc<Job>,
    generation: u64,
    extranonce2: Extranonce,
    settings: EngineSettings,
    suggester: Arc<dyn NonceSuggester>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
    solutions: mpsc::Sender<Solution>,
}

/// Turns jobs into shares. Holds at most one job in flight: a clean job
/// replaces it at once, any other job waits until the current search runs
/// out of nonces.
pub struct Engine {
    settings: EngineSettings,
    submitter: Arc<dyn ShareSubmitter>,
    suggester: Arc<dyn NonceSuggester>,
    metrics: Arc<Metrics>,
    sink: Option<mpsc::Sender<SinkEvent>>,
    extranonce2_counter: u64,
    generation: u64,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        submitter: Arc<dyn ShareSubmitter>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            settings,
            submitter,
            suggester: Arc::new(suggest::Unavailable),
            metrics,
            sink: None,
            extranonce2_counter: 0,
            generation: 0,
        }
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn NonceSuggester>) -> Self {
        self.suggester = suggester;
        self
    }

    pub fn with_sink(mut self, sink: mpsc::Sender<SinkEvent>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Mines until `cancel` fires, the connector goes away, or, with `once`
    /// set, a share is accepted. Returns the accepted shares.
    pub async fn run(
        mut self,
        mut events: broadcast::Receiver<ConnectorEvent>,
        cancel: CancellationToken,
    ) -> Vec<Share> {
        let (solutions_tx, mut solutions_rx) = mpsc::channel::<Solution>(64);
        let (outcomes_tx, mut outcomes_rx) = mpsc::channel::<(Share, bool)>(64);

        let mut workers = JoinSet::new();
        let mut submissions = JoinSet::new();
        let mut running: Option<Running> = None;
        let mut queued: Option<Arc<Job>> = None;
        let mut accepted = Vec::new();

        info!("Mining engine started with {} workers", self.settings.workers);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                event = events.recv() => match event {
                    Ok(ConnectorEvent::Job(job)) => {
                        if job.clean_jobs || running.is_none() {
                            if queued.take().is_some() {
                                debug!("Dropping queued job superseded by clean job {}", job.job_id);
                            }
                            Self::stop(&mut running, &mut workers).await;
                            running = Some(self.start(job, &mut workers, &solutions_tx));
                        } else {
                            debug!("Queued job {} until the current search finishes", job.job_id);
                            queued = Some(job);
                        }
                    }
                    Ok(ConnectorEvent::Status { pool, state: state @ (PoolState::Disconnected | PoolState::Error) }) => {
                        if running.is_some() {
                            info!("Pausing search: pool {pool} is {state}");
                        }
                        queued = None;
                        Self::stop(&mut running, &mut workers).await;
                    }
                    Ok(ConnectorEvent::Status { .. } | ConnectorEvent::Difficulty(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Mining engine missed {skipped} connector events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Connector gone; stopping engine");
                        break;
                    }
                },

                Some(solution) = solutions_rx.recv() => {
                    self.handle_solution(solution, running.as_ref(), &mut submissions, &outcomes_tx);
                }

                Some((share, ok)) = outcomes_rx.recv() => {
                    self.record_outcome(&share, ok);
                    if ok {
                        accepted.push(share);
                        if self.settings.once {
                            info!("Share accepted, exiting");
                            break;
                        }
                    }
                }

                Some(_) = submissions.join_next() => {}

                Some(result) = workers.join_next() => {
                    if let Err(err) = result
                        && err.is_panic()
                    {
                        error!("Search worker panicked: {err}");
                    }

                    if workers.is_empty() {
                        let next = queued.take().or_else(|| {
                            running.take().map(|running| {
                                debug!("Nonce ranges exhausted for job {}, rolling extranonce2", running.job.job_id);
                                running.job
                            })
                        });

                        if let Some(job) = next {
                            Self::stop(&mut running, &mut workers).await;
                            running = Some(self.start(job, &mut workers, &solutions_tx));
                        }
                    }
                }
            }
        }

        Self::stop(&mut running, &mut workers).await;
        submissions.shutdown().await;

        info!("Mining engine stopped");

        accepted
    }

    fn start(
        &mut self,
        job: Arc<Job>,
        workers: &mut JoinSet<()>,
        solutions: &mpsc::Sender<Solution>,
    ) -> Running {
        self.generation += 1;

        let cancel = CancellationToken::new();

        info!(
            "Searching job {} (difficulty {}, clean_jobs={}) on {} workers",
            job.job_id,
            job.difficulty,
            job.clean_jobs,
            self.settings.workers.max(1)
        );

        for _ in 0..self.settings.workers.max(1) {
            let extranonce2 =
                Extranonce::from_counter(self.extranonce2_counter, job.extranonce2_size);
            self.extranonce2_counter = self.extranonce2_counter.wrapping_add(1);

            workers.spawn(Self::work(Worker {
                job: job.clone(),
                generation: self.generation,
                extranonce2,
                settings: self.settings.clone(),
                suggester: self.suggester.clone(),
                metrics: self.metrics.clone(),
                cancel: cancel.clone(),
                solutions: solutions.clone(),
            }));
        }

        Running {
            job,
            generation: self.generation,
            cancel,
        }
    }

    /// Cancels the running search and waits for every worker to exit, so
    /// nothing from it can arrive afterwards.
    async fn stop(running: &mut Option<Running>, workers: &mut JoinSet<()>) {
        if let Some(running) = running.take() {
            running.cancel.cancel();
            debug!("Stopped search for job {}", running.job.job_id);
        }

        workers.abort_all();
        while workers.join_next().await.is_some() {}
    }

    async fn work(worker: Worker) {
        let header = Header::new(&worker.job, &worker.extranonce2);

        let suggested = suggest::collect(
            worker.suggester.as_ref(),
            header.prefix(),
            worker.job.difficulty,
            worker.settings.suggestion_timeout,
            worker.settings.max_suggestions,
        )
        .await;

        let starts = {
            let mut rng = rand::rng();
            starting_points(&suggested, worker.settings.random_starts, &mut rng)
        };

        let hasher = Hasher::new(
            header,
            worker.job.pool_target(),
            worker.settings.batch_size,
            worker.metrics.clone(),
        );

        for start in starts {
            let mut next = start;
            let mut remaining = worker.settings.nonce_range;

            while remaining > 0 {
                match hasher.search(next, remaining, &worker.cancel).await {
                    Search::Found {
                        nonce,
                        hash,
                        searched,
                    } => {
                        let solution = Solution {
                            generation: worker.generation,
                            extranonce2: worker.extranonce2.clone(),
                            nonce,
                            hash,
                        };

                        if worker.solutions.send(solution).await.is_err() {
                            return;
                        }

                        remaining = remaining.saturating_sub(searched);
                        next = nonce.wrapping_add(1);
                    }
                    Search::Exhausted => break,
                    Search::Cancelled => return,
                }
            }
        }
    }

    fn handle_solution(
        &self,
        solution: Solution,
        running: Option<&Running>,
        submissions: &mut JoinSet<()>,
        outcomes: &mpsc::Sender<(Share, bool)>,
    ) {
        let Some(running) = running.filter(|running| running.generation == solution.generation)
        else {
            debug!("Discarding solution from a superseded search");
            return;
        };

        let job = &running.job;

        let share = Share {
            job_id: job.job_id.clone(),
            extranonce2: solution.extranonce2,
            ntime: job.ntime,
            nonce: solution.nonce,
        };

        let hash = bitcoin::BlockHash::from_byte_array(solution.hash);

        self.metrics.add_share();

        info!(
            "Share found: job={} extranonce2={} nonce={} hash={hash}",
            share.job_id, share.extranonce2, share.nonce
        );

        if job.network_target().is_met_by(&solution.hash) {
            self.metrics.add_block();
            info!("Block candidate found! job={} hash={hash}", share.job_id);
            self.record(SinkEvent::BlockFound {
                job_id: share.job_id.clone(),
                hash: hash.to_string(),
            });
        }

        let submitter = self.submitter.clone();
        let outcomes = outcomes.clone();

        submissions.spawn(async move {
            let accepted = submitter.submit_share(&share).await;
            if outcomes.send((share, accepted)).await.is_err() {
                debug!("Share outcome dropped: engine stopped");
            }
        });
    }

    fn record_outcome(&self, share: &Share, accepted: bool) {
        if accepted {
            self.metrics.add_accepted();
        } else {
            self.metrics.add_rejected();
        }

        self.record(SinkEvent::Share {
            job_id: share.job_id.clone(),
            accepted,
            pool: self.submitter.pool_name(),
        });
    }

    fn record(&self, event: SinkEvent) {
        if let Some(sink) = &self.sink
            && let Err(err) = sink.try_send(event)
        {
            debug!("Statistics event dropped: {err}");
        }
    }
}
