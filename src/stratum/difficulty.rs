use super::*;

/// Pool share difficulty as assigned by `mining.set_difficulty`.
///
/// Difficulty 1 corresponds to the genesis target `0x1d00ffff`; a share at
/// difficulty `d` must hash below `difficulty_1_target / d`. Pools may hand
/// out fractional difficulties below 1 (test pools, very slow miners), so the
/// value is kept as a float and only turned into an integer target when the
/// engine needs it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Difficulty(f64);

impl Difficulty {
    pub const ONE: Self = Self(1.0);

    pub fn new(difficulty: f64) -> Option<Self> {
        (difficulty.is_finite() && difficulty > 0.0).then_some(Self(difficulty))
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Expected number of hashes to find one share at this difficulty.
    pub fn expected_hashes(self) -> f64 {
        self.0 * 4_294_967_296.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::ONE
    }
}

/// Panics unless `difficulty` is finite and positive. Use
/// [`Difficulty::new`] for values that come off the wire.
impl From<f64> for Difficulty {
    fn from(difficulty: f64) -> Self {
        assert!(
            difficulty.is_finite() && difficulty > 0.0,
            "difficulty must be finite and > 0"
        );
        Self(difficulty)
    }
}

/// Panics on zero.
impl From<u64> for Difficulty {
    fn from(difficulty: u64) -> Self {
        assert!(difficulty > 0, "difficulty must be > 0");
        Self(difficulty as f64)
    }
}

impl FromStr for Difficulty {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f64>().map_err(|e| InternalError::Parse {
            message: format!("invalid difficulty '{s}': {e}"),
        })?;

        Self::new(value).ok_or_else(|| InternalError::Parse {
            message: format!("difficulty must be finite and > 0, got '{s}'"),
        })
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 <= u64::MAX as f64 {
            ser.serialize_u64(self.0 as u64)
        } else {
            ser.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(de)?;
        Self::new(value).ok_or_else(|| de::Error::custom("difficulty must be finite and > 0"))
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(precision) = f.precision() {
            write!(f, "{:.*}", precision, self.0)
        } else if self.0 >= 1.0 {
            write!(f, "{}", self.0.floor() as u64)
        } else {
            let s = format!("{:.8}", self.0);
            f.write_str(s.trim_end_matches('0').trim_end_matches('.'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_from_int_or_float() {
        let a: Difficulty = serde_json::from_str("2").unwrap();
        let b: Difficulty = serde_json::from_str("2.0").unwrap();
        let c: Difficulty = serde_json::from_str("0.125").unwrap();

        assert_eq!(a, b);
        assert_eq!(c.as_f64(), 0.125);
    }

    #[test]
    fn serde_rejects_bad_inputs() {
        for diff in ["0", "0.0", "-1", "-0.001", "\"2\"", "null"] {
            assert!(
                serde_json::from_str::<Difficulty>(diff).is_err(),
                "should reject {diff}"
            );
        }
    }

    #[test]
    #[should_panic(expected = "difficulty must be finite and > 0")]
    fn from_zero_float_panics() {
        Difficulty::from(0.0);
    }

    #[test]
    #[should_panic(expected = "difficulty must be > 0")]
    fn from_zero_int_panics() {
        Difficulty::from(0u64);
    }

    #[test]
    fn new_rejects_what_from_panics_on() {
        for difficulty in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(Difficulty::new(difficulty), None, "{difficulty}");
        }
    }

    #[test]
    fn serialize_whole_as_int() {
        assert_eq!(serde_json::to_string(&Difficulty::from(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&Difficulty::from(0.5)).unwrap(),
            "0.5"
        );
    }

    #[test]
    fn display() {
        assert_eq!(Difficulty::from(1).to_string(), "1");
        assert_eq!(Difficulty::from(2.9).to_string(), "2");
        assert_eq!(Difficulty::from(0.125).to_string(), "0.125");
        assert_eq!(format!("{:.2}", Difficulty::from(0.1234)), "0.12");
    }

    #[test]
    fn from_str() {
        assert_eq!("16".parse::<Difficulty>().unwrap(), Difficulty::from(16));
        assert_eq!("0.001".parse::<Difficulty>().unwrap().as_f64(), 0.001);
        assert!("0".parse::<Difficulty>().is_err());
        assert!("abc".parse::<Difficulty>().is_err());
        assert!("inf".parse::<Difficulty>().is_err());
    }

    #[test]
    fn ordering() {
        assert!(Difficulty::from(0.5) < Difficulty::ONE);
        assert!(Difficulty::ONE < Difficulty::from(2));
    }

    #[test]
    fn expected_hashes() {
        assert_eq!(Difficulty::ONE.expected_hashes(), 4_294_967_296.0);
    }
}
