use super::*;

/// Writes every event to the log at debug level and keeps running totals.
#[derive(Debug, Default)]
pub struct LogSink {
    recorded: u64,
    hashes: u64,
    accepted: u64,
    rejected: u64,
    blocks: u64,
}

#[async_trait]
impl EventSink for LogSink {
    async fn record(&mut self, event: Event) -> Result<u64> {
        match &event {
            Event::Hashes { count } => self.hashes += count,
            Event::Share { accepted: true, .. } => self.accepted += 1,
            Event::Share { accepted: false, .. } => self.rejected += 1,
            Event::BlockFound { .. } => self.blocks += 1,
        }

        self.recorded += 1;

        debug!("event: {}", serde_json::to_string(&event)?);

        Ok(self.recorded)
    }

    async fn close(&mut self) -> Result {
        info!(
            "Session totals: hashes={} accepted={} rejected={} blocks={}",
            self.hashes, self.accepted, self.rejected, self.blocks
        );
        Ok(())
    }
}
