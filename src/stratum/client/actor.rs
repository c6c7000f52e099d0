use {
    super::*,
    tokio::{net::tcp::OwnedReadHalf, task::JoinHandle},
};

const MAX_PENDING_REQUESTS: usize = 1024;

type Writer = Arc<Mutex<BufWriter<OwnedWriteHalf>>>;

type PendingRequest = (oneshot::Sender<Result<Message>>, Instant);

struct Connection {
    generation: u64,
    writer: Writer,
    reader: JoinHandle<()>,
    keepalive: JoinHandle<()>,
}

/// Sent by a connection's reader and keepalive tasks. Tagged with the
/// connection generation so a late message from a torn-down socket cannot
/// close its successor.
struct Incoming {
    generation: u64,
    kind: IncomingKind,
}

enum IncomingKind {
    Message(Message),
    Closed,
    Failed(ClientError),
}

pub(super) enum ClientMessage {
    Connect {
        respond_to: oneshot::Sender<Result>,
    },
    Request {
        method: &'static str,
        params: Value,
        respond_to: oneshot::Sender<Result<Message>>,
    },
    Disconnect {
        respond_to: oneshot::Sender<()>,
    },
}

pub(super) struct ClientActor {
    config: Arc<ClientConfig>,
    rx: mpsc::Receiver<ClientMessage>,
    events: broadcast::Sender<Event>,
    connected: watch::Sender<bool>,
    id_counter: u64,
    generation: u64,
    pending: HashMap<Id, PendingRequest>,
    connection: Option<Connection>,
}

impl ClientActor {
    pub(super) fn new(
        config: Arc<ClientConfig>,
        rx: mpsc::Receiver<ClientMessage>,
        events: broadcast::Sender<Event>,
        connected: watch::Sender<bool>,
    ) -> Self {
        Self {
            config,
            rx,
            events,
            connected,
            id_counter: 0,
            generation: 0,
            pending: HashMap::new(),
            connection: None,
        }
    }

    pub(super) async fn run(mut self) {
        let (incoming_tx, mut incoming_rx) = mpsc::channel::<Incoming>(CHANNEL_BUFFER_SIZE);

        let mut sweep = interval((self.config.request_timeout / 4).max(Duration::from_millis(10)));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                Some(incoming) = incoming_rx.recv() => {
                    self.handle_incoming(incoming).await;
                }
                msg = self.rx.recv() => {
                    let Some(msg) = msg else {
                        debug!("Client actor shutting down");
                        self.handle_disconnect().await;
                        break;
                    };

                    match msg {
                        ClientMessage::Connect { respond_to } => {
                            let result = self.handle_connect(incoming_tx.clone()).await;
                            if respond_to.send(result).is_err() {
                                debug!("Connect response dropped: caller gave up");
                            }
                        }
                        ClientMessage::Request { method, params, respond_to } => {
                            self.handle_request(method, params, respond_to).await;
                        }
                        ClientMessage::Disconnect { respond_to } => {
                            self.handle_disconnect().await;
                            if respond_to.send(()).is_err() {
                                debug!("Disconnect response dropped: caller gave up");
                            }
                        }
                    }
                }
                _ = sweep.tick() => {
                    self.evict_expired_pending();
                }
            }
        }
    }

    fn next_id(&mut self) -> Id {
        self.id_counter += 1;
        Id::Number(self.id_counter)
    }

    fn evict_expired_pending(&mut self) {
        let now = Instant::now();

        let expired_ids = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| now >= *deadline)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();

        for id in expired_ids {
            if let Some((tx, _)) = self.pending.remove(&id) {
                debug!("Request {id} expired without a response");
                if tx
                    .send(Err(ClientError::RequestTimeout {
                        method: "request".into(),
                    }))
                    .is_err()
                {
                    debug!("RequestTimeout response dropped: caller gave up");
                }
            }
        }
    }

    async fn handle_connect(&mut self, incoming_tx: mpsc::Sender<Incoming>) -> Result {
        if self.connection.is_some() {
            self.handle_disconnect().await;
        }

        let address = self.config.address.clone();

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&address))
            .await
            .context(error::ConnectTimeoutSnafu {
                address: address.clone(),
            })?
            .context(error::IoSnafu)?;

        stream.set_nodelay(true).context(error::IoSnafu)?;

        let (reader, writer) = stream.into_split();
        let writer = Arc::new(Mutex::new(BufWriter::new(writer)));
        let framed_reader =
            FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_SIZE));

        self.generation += 1;
        let generation = self.generation;

        let reader = tokio::spawn(Self::reader_task(
            framed_reader,
            generation,
            incoming_tx.clone(),
        ));

        let keepalive = tokio::spawn(Self::keepalive_task(
            writer.clone(),
            self.config.keepalive_interval,
            generation,
            incoming_tx,
        ));

        self.connection = Some(Connection {
            generation,
            writer,
            reader,
            keepalive,
        });

        self.connected.send_replace(true);

        debug!("Connected to {address}");

        Ok(())
    }

    async fn handle_request(
        &mut self,
        method: &'static str,
        params: Value,
        respond_to: oneshot::Sender<Result<Message>>,
    ) {
        self.evict_expired_pending();

        if self.pending.len() >= MAX_PENDING_REQUESTS {
            if respond_to
                .send(Err(ClientError::TooManyPendingRequests))
                .is_err()
            {
                debug!("TooManyPendingRequests response dropped: caller gave up");
            }
            return;
        }

        let id = self.next_id();
        let deadline = Instant::now() + self.config.request_timeout;

        let msg = Message::Request {
            id: id.clone(),
            method: method.to_owned(),
            params,
        };

        match self.send_message(&msg).await {
            Ok(()) => {
                self.pending.insert(id, (respond_to, deadline));
            }
            Err(err) => {
                let transport = err.is_transport();

                if respond_to.send(Err(err)).is_err() {
                    debug!("Request error response dropped: caller gave up");
                }

                if transport {
                    self.handle_disconnect().await;
                }
            }
        }
    }

    async fn send_message(&mut self, msg: &Message) -> Result {
        let connection = self.connection.as_ref().ok_or(ClientError::NotConnected)?;

        let frame = serde_json::to_string(msg).context(error::SerializationSnafu)? + "\n";

        let mut writer = connection.writer.lock().await;

        writer
            .write_all(frame.as_bytes())
            .await
            .context(error::IoSnafu)?;

        writer.flush().await.context(error::IoSnafu)?;

        Ok(())
    }

    async fn handle_disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        connection.reader.abort();
        connection.keepalive.abort();

        if let Err(err) = connection.writer.lock().await.shutdown().await {
            debug!("Error closing connection: {err}");
        }

        let pending = std::mem::take(&mut self.pending);
        for (_, (tx, _)) in pending {
            if tx.send(Err(ClientError::NotConnected)).is_err() {
                debug!("NotConnected response dropped: caller gave up");
            }
        }

        self.connected.send_replace(false);

        debug!("Disconnected from {}", self.config.address);

        if self.events.send(Event::Disconnected).is_err() {
            debug!("Disconnected event dropped: no subscribers");
        }
    }

    async fn handle_incoming(&mut self, incoming: Incoming) {
        let current = self.connection.as_ref().map(|connection| connection.generation);

        if current != Some(incoming.generation) {
            debug!("Dropping message from closed connection");
            return;
        }

        match incoming.kind {
            IncomingKind::Message(message) => self.handle_message(message).await,
            IncomingKind::Closed => {
                warn!("Pool {} closed the connection", self.config.address);
                self.handle_disconnect().await;
            }
            IncomingKind::Failed(err) => {
                error!("Connection to {} failed: {err}", self.config.address);
                self.handle_disconnect().await;
            }
        }
    }

    async fn handle_message(&mut self, message: Message) {
        match message {
            Message::Response { ref id, .. } => {
                let id = id.clone();
                if let Some((tx, _)) = self.pending.remove(&id) {
                    if tx.send(Ok(message)).is_err() {
                        debug!("Response dropped: caller gave up");
                    }
                } else {
                    warn!("Unmatched response ID={id}");
                }
            }
            Message::Notification { method, params } => {
                self.handle_notification(&method, params).await;
            }
            Message::Request { id, method, .. } => {
                warn!("Ignoring server request {method} (id {id})");
            }
        }
    }

    async fn handle_notification(&mut self, method: &str, params: Value) {
        match method {
            "mining.notify" => match serde_json::from_value::<Notify>(params) {
                Ok(notify) => {
                    debug!(
                        "New job {} (clean_jobs={})",
                        notify.job_id, notify.clean_jobs
                    );
                    if self.events.send(Event::Notify(notify)).is_err() {
                        debug!("Notify event dropped: no subscribers");
                    }
                }
                Err(e) => warn!("Failed to parse mining.notify: {e}"),
            },
            "mining.set_difficulty" => match serde_json::from_value::<SetDifficulty>(params) {
                Ok(set_difficulty) => match set_difficulty.difficulty() {
                    Some(difficulty) => {
                        debug!("Pool difficulty set to {difficulty}");
                        if self.events.send(Event::SetDifficulty(difficulty)).is_err() {
                            debug!("SetDifficulty event dropped: no subscribers");
                        }
                    }
                    None => warn!("mining.set_difficulty without a value"),
                },
                Err(e) => warn!("Failed to parse mining.set_difficulty: {e}"),
            },
            "client.reconnect" => {
                info!("Pool {} asked us to reconnect", self.config.address);
                if self.events.send(Event::Reconnect).is_err() {
                    debug!("Reconnect event dropped: no subscribers");
                }
                self.handle_disconnect().await;
            }
            "client.show_message" => {
                info!("Message from pool {}: {params}", self.config.address);
            }
            _ => warn!("Unhandled notification: {method}"),
        }
    }

    async fn reader_task(
        mut reader: FramedRead<OwnedReadHalf, LinesCodec>,
        generation: u64,
        incoming_tx: mpsc::Sender<Incoming>,
    ) {
        let kind = loop {
            let line = match reader.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    break IncomingKind::Failed(ClientError::Io {
                        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                    });
                }
                None => break IncomingKind::Closed,
            };

            if line.trim().is_empty() {
                continue;
            }

            let message = match serde_json::from_str::<Message>(&line) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Invalid JSON message: {line:?} - {e}");
                    continue;
                }
            };

            if incoming_tx
                .send(Incoming {
                    generation,
                    kind: IncomingKind::Message(message),
                })
                .await
                .is_err()
            {
                debug!("Message forwarding dropped: actor shutting down");
                return;
            }
        };

        if incoming_tx.send(Incoming { generation, kind }).await.is_err() {
            debug!("Close notification dropped: actor already shut down");
        }
    }

    async fn keepalive_task(
        writer: Writer,
        period: Duration,
        generation: u64,
        incoming_tx: mpsc::Sender<Incoming>,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let result = {
                let mut writer = writer.lock().await;
                match writer.write_all(b"\n").await {
                    Ok(()) => writer.flush().await,
                    Err(err) => Err(err),
                }
            };

            if let Err(source) = result {
                warn!("Keepalive write failed: {source}");
                if incoming_tx
                    .send(Incoming {
                        generation,
                        kind: IncomingKind::Failed(ClientError::Io { source }),
                    })
                    .await
                    .is_err()
                {
                    debug!("Keepalive failure dropped: actor shutting down");
                }
                return;
            }
        }
    }
}
