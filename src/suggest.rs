use super::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggestions {
    pub nonces: Vec<Nonce>,
    /// How much the source believes in these, from 0 to 1. Informational.
    pub confidence: f64,
}

/// An outside source of promising starting nonces. The engine only ever uses
/// these as extra places to start searching; every candidate still goes
/// through the normal target check.
#[async_trait]
pub trait NonceSuggester: Send + Sync {
    async fn suggest_nonces(
        &self,
        header_prefix: &[u8],
        difficulty: Difficulty,
    ) -> Result<Suggestions>;
}

/// No suggestion source configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl NonceSuggester for Unavailable {
    async fn suggest_nonces(&self, _: &[u8], _: Difficulty) -> Result<Suggestions> {
        Ok(Suggestions::default())
    }
}

/// Always suggests the same nonces.
#[derive(Debug, Clone, Default)]
pub struct Fixed(pub Vec<Nonce>);

#[async_trait]
impl NonceSuggester for Fixed {
    async fn suggest_nonces(&self, _: &[u8], _: Difficulty) -> Result<Suggestions> {
        Ok(Suggestions {
            nonces: self.0.clone(),
            confidence: 1.0,
        })
    }
}

/// Asks `suggester` for nonces, giving up after `limit`. Errors and timeouts
/// count as no suggestions. At most `cap` nonces are returned.
pub(crate) async fn collect(
    suggester: &dyn NonceSuggester,
    header_prefix: &[u8],
    difficulty: Difficulty,
    limit: Duration,
    cap: usize,
) -> Vec<Nonce> {
    match timeout(limit, suggester.suggest_nonces(header_prefix, difficulty)).await {
        Ok(Ok(mut suggestions)) => {
            suggestions.nonces.truncate(cap);
            if !suggestions.nonces.is_empty() {
                debug!(
                    "Using {} suggested nonces (confidence {:.2})",
                    suggestions.nonces.len(),
                    suggestions.confidence
                );
            }
            suggestions.nonces
        }
        Ok(Err(err)) => {
            debug!("Nonce suggester failed: {err:#}");
            Vec::new()
        }
        Err(_) => {
            debug!("Nonce suggester timed out after {limit:?}");
            Vec::new()
        }
    }
}
