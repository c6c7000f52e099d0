use super::*;

/// Recent connection attempts against one pool. Once `max_attempts` have
/// been made, the pool sits out until `period` has passed since the last
/// attempt, after which the count starts over.
#[derive(Debug, Clone, Default)]
pub(crate) struct Cooldown {
    attempts: u32,
    last_attempt: Option<Instant>,
}

impl Cooldown {
    pub(crate) fn record_attempt(&mut self, now: Instant) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);
    }

    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn is_eligible(&mut self, now: Instant, max_attempts: u32, period: Duration) -> bool {
        if self.attempts < max_attempts {
            return true;
        }

        match self.last_attempt {
            Some(last) if now.saturating_duration_since(last) < period => false,
            _ => {
                self.reset();
                true
            }
        }
    }
}

/// Index of the first eligible pool, walking `pools` in the order given.
/// Callers keep the list sorted by descending priority.
pub(crate) fn select<'a>(
    cooldowns: impl IntoIterator<Item = &'a mut Cooldown>,
    now: Instant,
    max_attempts: u32,
    period: Duration,
) -> Option<usize> {
    cooldowns
        .into_iter()
        .position(|cooldown| cooldown.is_eligible(now, max_attempts, period))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 5;
    const PERIOD: Duration = Duration::from_secs(300);

    fn exhausted(now: Instant) -> Cooldown {
        let mut cooldown = Cooldown::default();
        for _ in 0..MAX {
            cooldown.record_attempt(now);
        }
        cooldown
    }

    #[test]
    fn prefers_first_eligible() {
        let now = Instant::now();
        let mut cooldowns = vec![Cooldown::default(), Cooldown::default()];
        assert_eq!(select(&mut cooldowns, now, MAX, PERIOD), Some(0));
    }

    #[test]
    fn skips_pool_in_cooldown() {
        let now = Instant::now();
        let mut cooldowns = vec![exhausted(now), Cooldown::default()];
        assert_eq!(select(&mut cooldowns, now, MAX, PERIOD), Some(1));
        assert_eq!(
            select(&mut cooldowns, now + Duration::from_secs(299), MAX, PERIOD),
            Some(1)
        );
    }

    #[test]
    fn cooldown_expires_and_resets() {
        let now = Instant::now();
        let mut cooldowns = vec![exhausted(now), Cooldown::default()];

        assert_eq!(select(&mut cooldowns, now + PERIOD, MAX, PERIOD), Some(0));
        assert_eq!(cooldowns[0].attempts(), 0);
    }

    #[test]
    fn four_failures_do_not_trigger_cooldown() {
        let now = Instant::now();
        let mut cooldown = Cooldown::default();
        for _ in 0..MAX - 1 {
            cooldown.record_attempt(now);
        }
        assert!(cooldown.is_eligible(now, MAX, PERIOD));
    }

    #[test]
    fn none_when_all_cooling_down() {
        let now = Instant::now();
        let mut cooldowns = vec![exhausted(now), exhausted(now)];
        assert_eq!(select(&mut cooldowns, now, MAX, PERIOD), None);
    }
}
