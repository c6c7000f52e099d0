use super::*;

/// Compact network target from `mining.notify`, sent as 8 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Nbits(u32);

impl Nbits {
    pub fn to_consensus(self) -> u32 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl FromStr for Nbits {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u32_hex("nbits", s).map(Nbits)
    }
}

impl Display for Nbits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl From<u32> for Nbits {
    fn from(n: u32) -> Self {
        Nbits(n)
    }
}

impl From<Nbits> for u32 {
    fn from(n: Nbits) -> u32 {
        n.0
    }
}

/// Stratum encodes 32-bit header fields as exactly eight big-endian hex digits.
pub(crate) fn parse_u32_hex(field: &str, s: &str) -> Result<u32> {
    if s.len() != 8 {
        return Err(InternalError::Parse {
            message: format!("invalid {field} '{s}': expected 8 hex digits"),
        });
    }

    u32::from_str_radix(s, 16).map_err(|e| InternalError::Parse {
        message: format!("invalid {field} '{s}': {e}"),
    })
}
