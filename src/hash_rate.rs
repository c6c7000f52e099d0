use super::*;

const SI_PREFIXES: &[(&str, f64)] = &[
    ("", 1.0),
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Hashes per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct HashRate(pub f64);

impl HashRate {
    pub const ZERO: Self = Self(0.0);

    pub fn over(hashes: u64, elapsed: Duration) -> Self {
        if elapsed.is_zero() {
            return Self::ZERO;
        }

        Self(hashes as f64 / elapsed.as_secs_f64())
    }

    /// Mean time to find one share at `difficulty` at this rate.
    pub fn time_per_share(self, difficulty: Difficulty) -> Option<Duration> {
        if self.0 <= 0.0 {
            return None;
        }

        Duration::try_from_secs_f64(difficulty.expected_hashes() / self.0).ok()
    }
}

impl Display for HashRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        format_si(self.0, "H/s", f)
    }
}

pub(crate) fn format_si(value: f64, unit: &str, f: &mut Formatter<'_>) -> fmt::Result {
    if value == 0.0 {
        return write!(f, "0 {unit}");
    }

    let (prefix, divisor) = SI_PREFIXES
        .iter()
        .rev()
        .find(|(_, divisor)| value.abs() >= *divisor)
        .unwrap_or(&SI_PREFIXES[0]);

    let scaled = format!("{:.3}", value / divisor);
    let scaled = scaled.trim_end_matches('0').trim_end_matches('.');

    write!(f, "{scaled} {prefix}{unit}")
}
