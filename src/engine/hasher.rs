use super::*;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Search {
    /// `searched` counts every nonce tried, the winning one included.
    Found {
        nonce: Nonce,
        hash: [u8; 32],
        searched: u64,
    },
    Exhausted,
    Cancelled,
}

/// Scans nonces for one header. Works in batches and yields to the runtime
/// between them so pool I/O on the same threads keeps flowing.
pub(crate) struct Hasher {
    header: Header,
    target: Target,
    batch_size: u32,
    metrics: Arc<Metrics>,
}

impl Hasher {
    pub(crate) fn new(header: Header, target: Target, batch_size: u32, metrics: Arc<Metrics>) -> Self {
        Self {
            header,
            target,
            batch_size: batch_size.max(1),
            metrics,
        }
    }

    /// Tries `count` nonces from `start` upward, wrapping past `u32::MAX`.
    pub(crate) async fn search(
        &self,
        start: Nonce,
        count: u64,
        cancel: &CancellationToken,
    ) -> Search {
        let count = count.min(1 << 32);
        let mut searched = 0u64;
        let mut nonce = start;

        while searched < count {
            if cancel.is_cancelled() {
                return Search::Cancelled;
            }

            let batch = (count - searched).min(u64::from(self.batch_size));

            for i in 0..batch {
                let hash = self.header.hash(nonce);

                if self.target.is_met_by(&hash) {
                    self.metrics.add_hashes(i + 1);
                    return Search::Found {
                        nonce,
                        hash,
                        searched: searched + i + 1,
                    };
                }

                nonce = nonce.wrapping_add(1);
            }

            searched += batch;
            self.metrics.add_hashes(batch);

            tokio::task::yield_now().await;
        }

        Search::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::job::tests::job};

    fn setup(target: Target) -> (Hasher, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        let header = Header::new(&job("bf", true, Difficulty::ONE), &Extranonce::zeros(4));
        (Hasher::new(header, target, 16, metrics.clone()), metrics)
    }

    #[tokio::test]
    async fn finds_first_nonce_meeting_target() {
        let target = Target::from_u256(U256::MAX >> 2);
        let (hasher, metrics) = setup(target);

        let Search::Found {
            nonce,
            hash,
            searched,
        } = hasher.search(Nonce::from(0), 1000, &CancellationToken::new()).await
        else {
            panic!("expected a solution");
        };

        assert!(target.is_met_by(&hash));
        assert_eq!(u64::from(u32::from(nonce)) + 1, searched);
        assert_eq!(metrics.total_hashes(), searched);

        for earlier in 0..u32::from(nonce) {
            assert!(!target.is_met_by(&hasher.header.hash(Nonce::from(earlier))));
        }
    }

    #[tokio::test]
    async fn exhausts_range() {
        let (hasher, metrics) = setup(Target::from_u256(U256::zero()));

        assert_eq!(
            hasher.search(Nonce::from(0), 100, &CancellationToken::new()).await,
            Search::Exhausted
        );
        assert_eq!(metrics.total_hashes(), 100);
    }

    #[tokio::test]
    async fn wraps_past_max_nonce() {
        let target = Target::from_u256(U256::MAX);
        let (hasher, _) = setup(target);

        let result = hasher
            .search(Nonce::from(u32::MAX), 10, &CancellationToken::new())
            .await;

        assert!(matches!(result, Search::Found { nonce, .. } if nonce == Nonce::from(u32::MAX)));

        let (hasher, _) = setup(Target::from_u256(U256::zero()));
        assert_eq!(
            hasher
                .search(Nonce::from(u32::MAX - 1), 5, &CancellationToken::new())
                .await,
            Search::Exhausted
        );
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let (hasher, metrics) = setup(Target::from_u256(U256::zero()));

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            hasher.search(Nonce::from(0), 1_000_000, &cancel).await,
            Search::Cancelled
        );
        assert_eq!(metrics.total_hashes(), 0);
    }
}
