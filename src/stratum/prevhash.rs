use super::*;

/// Previous block hash as sent in `mining.notify`: the 32 bytes of the hash in
/// header order, with every 4-byte word byte-swapped. Parsing undoes the word
/// swap so the inner `BlockHash` holds the bytes exactly as they go into the
/// header, which is the reverse of the usual display hex.
#[derive(Debug, PartialEq, Eq, Clone, DeserializeFromStr, SerializeDisplay)]
pub struct PrevHash(BlockHash);

impl PrevHash {
    pub fn to_header_bytes(&self) -> [u8; 32] {
        self.0.to_byte_array()
    }
}

impl FromStr for PrevHash {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = <[u8; 32]>::from_hex(s).map_err(|e| InternalError::Parse {
            message: format!("invalid prevhash '{s}': {e}"),
        })?;

        let mut header_order = [0u8; 32];
        for (src, dst) in bytes.chunks_exact(4).zip(header_order.chunks_exact_mut(4)) {
            LittleEndian::write_u32(dst, BigEndian::read_u32(src));
        }

        Ok(PrevHash(BlockHash::from_byte_array(header_order)))
    }
}

impl Display for PrevHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut swapped = [0u8; 32];
        for (src, dst) in self
            .0
            .as_byte_array()
            .chunks_exact(4)
            .zip(swapped.chunks_exact_mut(4))
        {
            BigEndian::write_u32(dst, LittleEndian::read_u32(src));
        }

        f.write_str(&hex::encode(swapped))
    }
}

impl From<BlockHash> for PrevHash {
    fn from(blockhash: BlockHash) -> Self {
        PrevHash(blockhash)
    }
}

impl From<PrevHash> for BlockHash {
    fn from(prevhash: PrevHash) -> Self {
        prevhash.0
    }
}
