use super::*;

/// One block template from the pool, bound to the session it arrived on.
/// Never mutated; a newer notify produces a new `Job`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: JobId,
    pub version: Version,
    pub prevhash: PrevHash,
    pub coinb1: Vec<u8>,
    pub coinb2: Vec<u8>,
    pub merkle_branches: Vec<MerkleNode>,
    pub ntime: Ntime,
    pub nbits: Nbits,
    pub clean_jobs: bool,
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
    pub difficulty: Difficulty,
}

impl Job {
    pub fn from_notify(
        notify: Notify,
        extranonce1: Extranonce,
        extranonce2_size: usize,
        difficulty: Difficulty,
    ) -> Result<Self> {
        let coinb1 = hex::decode(&notify.coinb1)
            .with_context(|| format!("job {}: invalid coinb1 hex", notify.job_id))?;
        let coinb2 = hex::decode(&notify.coinb2)
            .with_context(|| format!("job {}: invalid coinb2 hex", notify.job_id))?;

        ensure!(
            extranonce2_size > 0,
            "job {}: extranonce2 size must be positive",
            notify.job_id
        );

        Ok(Self {
            job_id: notify.job_id,
            version: notify.version,
            prevhash: notify.prevhash,
            coinb1,
            coinb2,
            merkle_branches: notify.merkle_branches,
            ntime: notify.ntime,
            nbits: notify.nbits,
            clean_jobs: notify.clean_jobs,
            extranonce1,
            extranonce2_size,
            difficulty,
        })
    }

    /// `coinb1 || extranonce1 || extranonce2 || coinb2`
    pub fn coinbase(&self, extranonce2: &Extranonce) -> Vec<u8> {
        let mut coinbase = Vec::with_capacity(
            self.coinb1.len() + self.extranonce1.len() + extranonce2.len() + self.coinb2.len(),
        );
        coinbase.extend_from_slice(&self.coinb1);
        coinbase.extend_from_slice(self.extranonce1.as_bytes());
        coinbase.extend_from_slice(extranonce2.as_bytes());
        coinbase.extend_from_slice(&self.coinb2);
        coinbase
    }

    pub fn merkle_root(&self, extranonce2: &Extranonce) -> [u8; 32] {
        stratum::merkle_root(&self.coinbase(extranonce2), &self.merkle_branches)
    }

    pub fn pool_target(&self) -> Target {
        Target::from_difficulty(self.difficulty)
    }

    pub fn network_target(&self) -> Target {
        Target::from_compact(self.nbits)
    }
}

/// A solution found by the engine, waiting to be sent as `mining.submit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub job_id: JobId,
    pub extranonce2: Extranonce,
    pub ntime: Ntime,
    pub nonce: Nonce,
}
