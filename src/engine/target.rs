use {
    super::*,
    bitcoin::{CompactTarget, Target as BitcoinTarget},
};

static DIFFICULTY_1_TARGET: LazyLock<U256> =
    LazyLock::new(|| U256::from_big_endian(&BitcoinTarget::MAX.to_be_bytes()));

/// A 256-bit threshold. A hash meets it when the hash, read as a
/// little-endian integer (i.e. the big-endian display hex), is strictly
/// below the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target(U256);

impl Target {
    /// `mantissa * 256^(exponent - 3)`, as the network encodes `nbits`.
    pub fn from_compact(nbits: Nbits) -> Self {
        let target = BitcoinTarget::from_compact(CompactTarget::from_consensus(nbits.to_consensus()));
        Self(U256::from_big_endian(&target.to_be_bytes()))
    }

    /// Difficulty-1 target divided by `difficulty`, rounded down. The float
    /// is split into an exact `mantissa * 2^exponent` so the division happens
    /// entirely in 256-bit integers, and values below 1 give targets above
    /// the difficulty-1 target.
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        let Some((mantissa, exponent)) = decompose(difficulty.as_f64()) else {
            return Self(U256::MAX);
        };

        let mantissa = U256::from(mantissa);
        let shift = exponent.unsigned_abs() as usize;

        if exponent >= 0 {
            if mantissa.bits() + shift > 256 {
                return Self(U256::zero());
            }
            Self(*DIFFICULTY_1_TARGET / (mantissa << shift))
        } else {
            if DIFFICULTY_1_TARGET.bits() + shift > 256 {
                return Self(U256::MAX);
            }
            Self((*DIFFICULTY_1_TARGET << shift) / mantissa)
        }
    }

    pub fn from_u256(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        U256::from_little_endian(hash) < self.0
    }
}

/// `value == mantissa * 2^exponent` with an odd mantissa, for finite
/// positive floats.
fn decompose(value: f64) -> Option<(u64, i32)> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);

    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | 1 << 52, biased - 1075)
    };

    let zeros = mantissa.trailing_zeros();

    Some((mantissa >> zeros, exponent + zeros as i32))
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0.to_big_endian()))
    }
}
