use super::*;

/// Hex-encoded extranonce. Extranonce1 is assigned by the pool at subscribe
/// time; extranonce2 is chosen by the miner and always has the width the pool
/// asked for. Arithmetic on it treats the bytes as a big-endian unsigned
/// integer of that width and wraps on overflow.
#[derive(Clone, Debug, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct Extranonce(Vec<u8>);

impl Extranonce {
    pub fn zeros(size: usize) -> Self {
        Self(vec![0; size])
    }

    pub fn random(size: usize) -> Self {
        let mut bytes = vec![0u8; size];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Low `size` bytes of `counter`, big-endian. Counters wider than the
    /// extranonce are truncated, so the value wraps at `2^(8*size)`.
    pub fn from_counter(counter: u64, size: usize) -> Self {
        let mut bytes = vec![0u8; size];
        for (i, byte) in bytes.iter_mut().rev().enumerate().take(8) {
            *byte = (counter >> (8 * i)) as u8;
        }
        Self(bytes)
    }

    pub fn increment_wrapping(&mut self) {
        for byte in self.0.iter_mut().rev() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                return;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Display for Extranonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Extranonce {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(hex::decode(s).context(error::HexSnafu)?))
    }
}
