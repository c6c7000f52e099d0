use super::*;

mod event;
mod log;

pub use {event::Event, log::LogSink};

/// Receives statistics after the fact. Nothing recorded here feeds back into
/// mining or the pool connection.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Returns how many events this sink has recorded so far.
    async fn record(&mut self, event: Event) -> Result<u64>;

    async fn flush(&mut self) -> Result {
        Ok(())
    }

    async fn close(&mut self) -> Result {
        self.flush().await
    }
}

/// Runs `sink` on its own task behind a bounded channel. On cancellation the
/// channel is drained before the sink is closed.
pub fn spawn(
    mut sink: Box<dyn EventSink>,
    cancel: CancellationToken,
    tasks: &mut JoinSet<()>,
) -> mpsc::Sender<Event> {
    let (tx, mut rx) = mpsc::channel(SINK_CHANNEL_CAPACITY);

    tasks.spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    while let Ok(event) = rx.try_recv() {
                        if let Err(err) = sink.record(event).await {
                            warn!("Error recording event during shutdown: {err}");
                        }
                    }
                    break;
                }

                event = rx.recv() => match event {
                    Some(event) => {
                        if let Err(err) = sink.record(event).await {
                            warn!("Error recording event: {err}");
                        }
                    }
                    None => break,
                },
            }
        }

        if let Err(err) = sink.close().await {
            warn!("Error closing event sink: {err}");
        }
    });

    tx
}
