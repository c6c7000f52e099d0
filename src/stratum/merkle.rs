use super::*;

/// One merkle-branch sibling, hex on the wire in header byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct MerkleNode([u8; 32]);

impl MerkleNode {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for MerkleNode {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for MerkleNode {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).context(error::HexSnafu)?;
        let actual = bytes.len();
        let bytes = <[u8; 32]>::try_from(bytes)
            .map_err(|_| InternalError::Length { expected: 32, actual })?;
        Ok(Self(bytes))
    }
}

impl Display for MerkleNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Folds the coinbase txid up the branch: `root = sha256d(root || sibling)`
/// for every sibling in order. The result is in header byte order.
pub fn merkle_root(coinbase: &[u8], merkle_branches: &[MerkleNode]) -> [u8; 32] {
    let mut root = sha256d::Hash::hash(coinbase).to_byte_array();

    for branch in merkle_branches {
        let mut concat = [0u8; 64];
        concat[..32].copy_from_slice(&root);
        concat[32..].copy_from_slice(branch.as_bytes());
        root = sha256d::Hash::hash(&concat).to_byte_array();
    }

    root
}
