use {super::*, crate::stratum::Event};

#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub keepalive_interval: Duration,
    pub reconnect_delay: Duration,
    pub failover_interval: Duration,
    pub max_attempts: u32,
    pub cooldown: Duration,
    /// Failover only considers a pool once more than this many shares went
    /// to it on the current connection.
    pub failover_min_shares: u64,
    pub failover_min_acceptance: f64,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.into(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            keepalive_interval: KEEPALIVE_INTERVAL,
            reconnect_delay: Duration::from_secs(5),
            failover_interval: Duration::from_secs(60),
            max_attempts: 5,
            cooldown: Duration::from_secs(300),
            failover_min_shares: 10,
            failover_min_acceptance: 0.9,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConnectorEvent {
    Job(Arc<Job>),
    Difficulty(Difficulty),
    Status { pool: String, state: PoolState },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolSnapshot {
    pub name: String,
    pub priority: i32,
    pub state: PoolState,
    pub current: bool,
    pub stats: PoolStats,
}

struct PoolEntry {
    config: PoolConfig,
    state: PoolState,
    stats: PoolStats,
    cooldown: Cooldown,
    /// `(submitted, accepted)` when the current connection was authorized.
    baseline: (u64, u64),
}

#[derive(Default)]
struct Inner {
    pools: Vec<PoolEntry>,
    current: Option<usize>,
    client: Option<Client>,
}

/// Keeps one stratum client alive against the best available pool. A single
/// manager task does every connect and reconnect; a monitor task nudges it
/// by dropping the current connection when the acceptance rate sours.
pub struct PoolConnector {
    settings: ConnectorSettings,
    inner: Mutex<Inner>,
    events: broadcast::Sender<ConnectorEvent>,
}

impl PoolConnector {
    pub fn new(mut pools: Vec<PoolConfig>, settings: ConnectorSettings) -> Result<Self> {
        ensure!(!pools.is_empty(), "no pools configured");

        pools.sort_by_key(|pool| std::cmp::Reverse(pool.priority));

        let pools = pools
            .into_iter()
            .map(|config| PoolEntry {
                config,
                state: PoolState::Disconnected,
                stats: PoolStats::default(),
                cooldown: Cooldown::default(),
                baseline: (0, 0),
            })
            .collect();

        let (events, _) = broadcast::channel(256);

        Ok(Self {
            settings,
            inner: Mutex::new(Inner {
                pools,
                ..Default::default()
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.events.subscribe()
    }

    /// Starts the connection manager and the failover monitor. Both stop
    /// when `cancel` fires; the manager disconnects on its way out.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken, tasks: &mut JoinSet<()>) {
        tasks.spawn(self.clone().manage(cancel.clone()));
        tasks.spawn(self.clone().monitor(cancel));
    }

    pub fn snapshot(&self) -> Vec<PoolSnapshot> {
        let inner = self.inner.lock();

        inner
            .pools
            .iter()
            .enumerate()
            .map(|(index, entry)| PoolSnapshot {
                name: entry.config.name.clone(),
                priority: entry.config.priority,
                state: entry.state,
                current: inner.current == Some(index),
                stats: entry.stats.clone(),
            })
            .collect()
    }

    pub fn current_pool(&self) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .current
            .map(|index| inner.pools[index].config.name.clone())
    }

    /// Forwards a share to the current pool. Returns false without touching
    /// any counter when there is no live connection.
    pub async fn submit_share(&self, share: &Share) -> bool {
        let Some((index, client)) = self.current_client() else {
            debug!("Dropping share for job {}: no active pool", share.job_id);
            return false;
        };

        let outcome = client
            .submit(
                share.job_id.clone(),
                share.extranonce2.clone(),
                share.ntime,
                share.nonce,
            )
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Failed to submit share for job {}: {err}", share.job_id);
                return false;
            }
        };

        let mut inner = self.inner.lock();
        let entry = &mut inner.pools[index];
        entry.stats.shares_submitted += 1;

        match &outcome {
            SubmitOutcome::Accepted => {
                entry.stats.shares_accepted += 1;
                info!(
                    "Share accepted by {}: job={} nonce={}",
                    entry.config.name, share.job_id, share.nonce
                );
            }
            SubmitOutcome::Rejected { reason } => {
                entry.stats.shares_rejected += 1;
                warn!(
                    "Share rejected by {}: job={} nonce={} reason={reason}",
                    entry.config.name, share.job_id, share.nonce
                );
            }
            SubmitOutcome::TimedOut => {
                entry.stats.shares_rejected += 1;
                warn!(
                    "Share timed out on {}: job={} nonce={}",
                    entry.config.name, share.job_id, share.nonce
                );
            }
        }

        outcome.is_accepted()
    }

    /// Drops the current connection, if any. The manager picks the next pool.
    pub async fn disconnect_current(&self) {
        let client = self.inner.lock().client.clone();

        if let Some(client) = client {
            client.disconnect().await;
        }
    }

    fn current_client(&self) -> Option<(usize, Client)> {
        let inner = self.inner.lock();
        let index = inner.current?;
        let client = inner.client.clone()?;
        client.is_connected().then_some((index, client))
    }

    async fn manage(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            match self.select_pool() {
                Some(index) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.run_session(index) => {}
                    }
                }
                None => warn!(
                    "No eligible pools; retrying in {}s",
                    self.settings.reconnect_delay.as_secs_f64()
                ),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.settings.reconnect_delay) => {}
            }
        }

        self.disconnect_current().await;

        let index = {
            let mut inner = self.inner.lock();
            inner.client = None;
            inner.current.take()
        };

        if let Some(index) = index {
            self.set_state(index, PoolState::Disconnected);
        }

        debug!("Connection manager stopped");
    }

    fn select_pool(&self) -> Option<usize> {
        let now = Instant::now();

        let index = {
            let mut inner = self.inner.lock();

            let index = selector::select(
                inner.pools.iter_mut().map(|entry| &mut entry.cooldown),
                now,
                self.settings.max_attempts,
                self.settings.cooldown,
            )?;

            let entry = &mut inner.pools[index];
            entry.cooldown.record_attempt(now);
            entry.stats.connection_attempts += 1;
            inner.current = Some(index);

            index
        };

        self.set_state(index, PoolState::Connecting);

        Some(index)
    }

    async fn run_session(&self, index: usize) {
        let config = self.inner.lock().pools[index].config.clone();

        let client = Client::new(ClientConfig {
            address: config.address(),
            username: config.username.clone(),
            password: config.password.clone(),
            user_agent: self.settings.user_agent.clone(),
            connect_timeout: self.settings.connect_timeout,
            request_timeout: self.settings.request_timeout,
            keepalive_interval: self.settings.keepalive_interval,
        });

        let mut events = client.events();

        self.inner.lock().client = Some(client.clone());

        let session = match self.establish(index, &config, &client).await {
            Ok(session) => session,
            Err(err) => {
                warn!("Failed to connect to pool {}: {err}", config.name);
                self.end_session(index, PoolState::Error);
                return;
            }
        };

        let mut difficulty = Difficulty::default();

        loop {
            match events.recv().await {
                Ok(Event::SetDifficulty(new)) => {
                    difficulty = new;
                    info!("Pool {} set difficulty {difficulty}", config.name);
                    self.publish(ConnectorEvent::Difficulty(difficulty));
                }
                Ok(Event::Notify(notify)) => {
                    match Job::from_notify(
                        notify,
                        session.extranonce1.clone(),
                        session.extranonce2_size,
                        difficulty,
                    ) {
                        Ok(job) => self.deliver_job(index, job),
                        Err(err) => warn!("Dropping job from {}: {err:#}", config.name),
                    }
                }
                Ok(Event::Reconnect) => {
                    info!("Pool {} requested reconnect", config.name);
                }
                Ok(Event::Disconnected) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Missed {skipped} events from pool {}", config.name);
                }
            }
        }

        info!("Disconnected from pool {}", config.name);

        self.end_session(index, PoolState::Disconnected);
    }

    async fn establish(
        &self,
        index: usize,
        config: &PoolConfig,
        client: &Client,
    ) -> Result<stratum::Session, ClientError> {
        let session = client
            .within_connect_timeout(async {
                client.open().await?;
                self.set_state(index, PoolState::Connected);
                client.handshake().await
            })
            .await?;

        {
            let mut inner = self.inner.lock();
            let entry = &mut inner.pools[index];
            entry.stats.connection_successes += 1;
            entry.stats.latency = Some(session.authorize_latency);
            entry.stats.last_connect = Some(Utc::now());
            entry.cooldown.reset();
            entry.baseline = (entry.stats.shares_submitted, entry.stats.shares_accepted);
        }

        info!(
            "Authorized on pool {} as {} (extranonce1={}, extranonce2_size={}, latency={}ms)",
            config.name,
            config.username,
            session.extranonce1,
            session.extranonce2_size,
            session.authorize_latency.as_millis()
        );

        self.set_state(index, PoolState::Authorized);

        Ok(session)
    }

    fn deliver_job(&self, index: usize, job: Job) {
        let first = {
            let mut inner = self.inner.lock();
            let entry = &mut inner.pools[index];
            entry.stats.jobs_received += 1;
            entry.state != PoolState::Mining
        };

        if first {
            self.set_state(index, PoolState::Mining);
        }

        debug!(
            "Job {} received (clean_jobs={}, difficulty={})",
            job.job_id, job.clean_jobs, job.difficulty
        );

        self.publish(ConnectorEvent::Job(Arc::new(job)));
    }

    fn end_session(&self, index: usize, state: PoolState) {
        {
            let mut inner = self.inner.lock();
            inner.client = None;
            if inner.current == Some(index) {
                inner.current = None;
            }
        }

        self.set_state(index, state);
    }

    fn set_state(&self, index: usize, state: PoolState) {
        let pool = {
            let mut inner = self.inner.lock();
            let entry = &mut inner.pools[index];
            if entry.state == state {
                return;
            }
            entry.state = state;
            entry.config.name.clone()
        };

        info!("Pool {pool} is now {state}");

        self.publish(ConnectorEvent::Status { pool, state });
    }

    fn publish(&self, event: ConnectorEvent) {
        if self.events.send(event).is_err() {
            debug!("Connector event dropped: no subscribers");
        }
    }

    async fn monitor(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(self.settings.failover_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some((pool, rate)) = self.failover_candidate() {
                        warn!(
                            "Acceptance rate on pool {pool} fell to {:.1}%; forcing reconnect",
                            rate * 100.0
                        );
                        self.disconnect_current().await;
                    }
                }
            }
        }

        debug!("Failover monitor stopped");
    }

    fn failover_candidate(&self) -> Option<(String, f64)> {
        let inner = self.inner.lock();
        let entry = &inner.pools[inner.current?];

        let (submitted_before, accepted_before) = entry.baseline;
        let session = PoolStats {
            shares_submitted: entry.stats.shares_submitted - submitted_before,
            shares_accepted: entry.stats.shares_accepted - accepted_before,
            ..Default::default()
        };

        let rate = session.acceptance_rate()?;

        (session.shares_submitted > self.settings.failover_min_shares
            && rate < self.settings.failover_min_acceptance)
            .then(|| (entry.config.name.clone(), rate))
    }
}
