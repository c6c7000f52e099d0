use super::*;

/// The first 76 bytes of a block header for one `(job, extranonce2)` pair:
/// `version || prevhash || merkle_root || ntime || nbits`, all in header byte
/// order. The nonce fills the last four bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    prefix: [u8; 76],
}

impl Header {
    pub const PREFIX_LEN: usize = 76;

    pub fn new(job: &Job, extranonce2: &Extranonce) -> Self {
        let mut prefix = [0u8; Self::PREFIX_LEN];
        prefix[0..4].copy_from_slice(&job.version.to_le_bytes());
        prefix[4..36].copy_from_slice(&job.prevhash.to_header_bytes());
        prefix[36..68].copy_from_slice(&job.merkle_root(extranonce2));
        prefix[68..72].copy_from_slice(&job.ntime.to_le_bytes());
        prefix[72..76].copy_from_slice(&job.nbits.to_le_bytes());
        Self { prefix }
    }

    pub fn prefix(&self) -> &[u8; 76] {
        &self.prefix
    }

    pub fn with_nonce(&self, nonce: Nonce) -> [u8; 80] {
        let mut header = [0u8; 80];
        header[..Self::PREFIX_LEN].copy_from_slice(&self.prefix);
        header[Self::PREFIX_LEN..].copy_from_slice(&nonce.to_le_bytes());
        header
    }

    /// `sha256d(header)` in the order it comes out of the hash function.
    pub fn hash(&self, nonce: Nonce) -> [u8; 32] {
        sha256d::Hash::hash(&self.with_nonce(nonce)).to_byte_array()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::job::tests::job, pretty_assertions::assert_eq};

    #[test]
    fn field_layout() {
        let job = job("bf", true, Difficulty::ONE);
        let extranonce2 = Extranonce::from_counter(7, 4);
        let header = Header::new(&job, &extranonce2).with_nonce(Nonce::from(0xb2957c02));

        assert_eq!(header.len(), 80);
        assert_eq!(hex::encode(&header[0..4]), "02000000");
        assert_eq!(&header[4..36], job.prevhash.to_header_bytes().as_slice());
        assert_eq!(&header[36..68], job.merkle_root(&extranonce2).as_slice());
        assert_eq!(hex::encode(&header[68..72]), "b9864e50");
        assert_eq!(hex::encode(&header[72..76]), "afc42a1c");
        assert_eq!(hex::encode(&header[76..80]), "027c95b2");
    }

    #[test]
    fn prevhash_is_display_reversed() {
        let job = job("bf", true, Difficulty::ONE);
        let header = Header::new(&job, &Extranonce::zeros(4));

        let mut display = header.prefix()[4..36].to_vec();
        display.reverse();

        assert_eq!(
            hex::encode(display),
            "00000000440b921e1b77c6c0487ae5616de67f788f44ae2a5af6e2194d16b6f8"
        );
    }

    #[test]
    fn hash_matches_bitcoin_header() {
        use bitcoin::{
            BlockHash, CompactTarget, TxMerkleNode,
            block::{Header as BlockHeader, Version as BlockVersion},
        };

        let job = job("bf", true, Difficulty::ONE);
        let extranonce2 = Extranonce::from_counter(1, 4);
        let header = Header::new(&job, &extranonce2);

        let expected = BlockHeader {
            version: BlockVersion::from_consensus(2),
            prev_blockhash: BlockHash::from(job.prevhash.clone()),
            merkle_root: TxMerkleNode::from_byte_array(job.merkle_root(&extranonce2)),
            time: 0x504e86b9,
            bits: CompactTarget::from_consensus(0x1c2ac4af),
            nonce: 42,
        };

        assert_eq!(
            header.hash(Nonce::from(42)),
            expected.block_hash().to_byte_array()
        );
    }
}
