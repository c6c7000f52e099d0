use super::*;

/// Exponentially decaying rate estimate. Each sample is a count observed
/// since the previous one; the estimate leans toward `count / elapsed` with
/// weight `1 - e^(-elapsed / window)`.
#[derive(Debug, Clone)]
pub(crate) struct DecayingAverage {
    value: f64,
    window: Duration,
    last_sample: Instant,
}

impl DecayingAverage {
    pub(crate) fn new(window: Duration, now: Instant) -> Self {
        Self {
            value: 0.0,
            window,
            last_sample: now,
        }
    }

    pub(crate) fn record(&mut self, count: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_sample).as_secs_f64();

        if elapsed <= 0.0 {
            return;
        }

        let weight = -(-(elapsed / self.window.as_secs_f64()).min(36.0)).exp_m1();

        self.value += (count / elapsed - self.value) * weight;
        self.last_sample = now;
    }

    pub(crate) fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn starts_at_zero() {
        assert_eq!(DecayingAverage::new(secs(10), Instant::now()).value(), 0.0);
    }

    #[test]
    fn ignores_zero_elapsed() {
        let start = Instant::now();
        let mut average = DecayingAverage::new(secs(10), start);
        average.record(1000.0, start);
        assert_eq!(average.value(), 0.0);
    }

    #[test]
    fn converges_to_steady_rate() {
        let start = Instant::now();
        let mut average = DecayingAverage::new(secs(10), start);

        for i in 1..=100 {
            average.record(5000.0, start + secs(i));
        }

        assert!((average.value() - 5000.0).abs() < 1.0, "{}", average.value());
    }

    #[test]
    fn long_gap_replaces_estimate() {
        let start = Instant::now();
        let mut average = DecayingAverage::new(secs(10), start);
        average.record(100.0, start + secs(1));
        average.record(100_000.0, start + secs(1001));
        assert!((average.value() - 100.0).abs() < 1e-6, "{}", average.value());
    }

    #[test]
    fn decays_when_idle() {
        let start = Instant::now();
        let mut average = DecayingAverage::new(secs(10), start);

        for i in 1..=50 {
            average.record(1000.0, start + secs(i));
        }
        let busy = average.value();

        average.record(0.0, start + secs(60));
        assert!(average.value() < busy);
        assert!(average.value() > 0.0);
    }
}
