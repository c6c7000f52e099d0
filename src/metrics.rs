use {super::*, parking_lot::Mutex};

/// Engine-side counters. Workers bump these lock-free; the status ticker
/// samples them.
pub struct Metrics {
    hashes: AtomicU64,
    shares_found: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    blocks: AtomicU64,
    started: Instant,
    rate: Mutex<RateSample>,
}

struct RateSample {
    last_total: u64,
    average: DecayingAverage,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let now = Instant::now();

        Self {
            hashes: AtomicU64::new(0),
            shares_found: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            started: now,
            rate: Mutex::new(RateSample {
                last_total: 0,
                average: DecayingAverage::new(Duration::from_secs(30), now),
            }),
        }
    }

    pub fn add_hashes(&self, hashes: u64) {
        self.hashes.fetch_add(hashes, Ordering::Relaxed);
    }

    pub fn add_share(&self) {
        self.shares_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_block(&self) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_hashes(&self) -> u64 {
        self.hashes.load(Ordering::Relaxed)
    }

    pub fn shares_found(&self) -> u64 {
        self.shares_found.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Folds the hashes since the last call into the smoothed rate.
    pub fn sample_hash_rate(&self) -> HashRate {
        let mut rate = self.rate.lock();
        let total = self.total_hashes();
        let delta = total.saturating_sub(rate.last_total);
        rate.average.record(delta as f64, Instant::now());
        rate.last_total = total;
        HashRate(rate.average.value())
    }

    pub fn status_line(&self, pool: Option<&str>) -> String {
        format!(
            "hashrate={}  shares={}  accepted={}  rejected={}  uptime={}s  pool={}",
            self.sample_hash_rate(),
            self.shares_found(),
            self.accepted(),
            self.rejected(),
            self.uptime().as_secs(),
            pool.unwrap_or("none"),
        )
    }
}
