use {
    super::*,
    actor::{ClientActor, ClientMessage},
    serde::de::DeserializeOwned,
    tokio::sync::Mutex,
};

mod actor;
mod error;

pub use error::ClientError;

pub type Result<T = (), E = ClientError> = std::result::Result<T, E>;

pub type EventReceiver = broadcast::Receiver<Event>;

const CHANNEL_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub address: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub keepalive_interval: Duration,
}

impl ClientConfig {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            user_agent: USER_AGENT.into(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            keepalive_interval: KEEPALIVE_INTERVAL,
        }
    }
}

/// What the pool told us during the handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: Option<String>,
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
    pub authorize_latency: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected { reason: String },
    TimedOut,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl Display for SubmitOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected { reason } => write!(f, "rejected ({reason})"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Handle to one stratum connection. Cloning is cheap; every clone talks to
/// the same actor task, which owns the socket and the pending-request map.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    tx: mpsc::Sender<ClientMessage>,
    events: broadcast::Sender<Event>,
    connected: watch::Receiver<bool>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let config = Arc::new(config);
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (events, _) = broadcast::channel(CHANNEL_BUFFER_SIZE);
        let (connected_tx, connected) = watch::channel(false);

        let actor = ClientActor::new(config.clone(), rx, events.clone(), connected_tx);
        tokio::spawn(actor.run());

        Self {
            config,
            tx,
            events,
            connected,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe before calling [`Client::connect`] to see the first
    /// difficulty and job, which pools send right after authorize.
    pub fn events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Resolves once the connection is gone, whoever closed it.
    pub async fn closed(&self) {
        let mut connected = self.connected.clone();
        if connected.wait_for(|connected| !connected).await.is_err() {
            debug!("Client actor exited");
        }
    }

    /// Opens the socket, then subscribes and authorizes, all within the
    /// connect timeout. Any failure leaves the client disconnected.
    pub async fn connect(&self) -> Result<Session> {
        self.within_connect_timeout(async {
            self.open().await?;
            self.handshake().await
        })
        .await
    }

    /// Runs a connection attempt under the connect timeout. An attempt that
    /// runs out of time is abandoned and the client disconnected.
    pub async fn within_connect_timeout<T>(
        &self,
        attempt: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.connect_timeout, attempt).await {
            Ok(result) => result,
            Err(elapsed) => {
                self.disconnect().await;
                Err(ClientError::ConnectTimeout {
                    address: self.config.address.clone(),
                    source: elapsed,
                })
            }
        }
    }

    /// Opens the transport only. The connection starts pumping messages and
    /// sending keepalives right away.
    pub async fn open(&self) -> Result {
        let (respond_to, rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::Connect { respond_to })
            .await
            .map_err(|_| ClientError::ChannelClosed)?;

        rx.await.map_err(|_| ClientError::ChannelClosed)?
    }

    /// `mining.subscribe` followed by `mining.authorize` on an open
    /// connection. Disconnects on failure.
    pub async fn handshake(&self) -> Result<Session> {
        match self.subscribe_and_authorize().await {
            Ok(session) => Ok(session),
            Err(err) => {
                self.disconnect().await;
                Err(err)
            }
        }
    }

    async fn subscribe_and_authorize(&self) -> Result<Session> {
        let subscribe = self
            .request(
                "mining.subscribe",
                &Subscribe {
                    user_agent: self.config.user_agent.clone(),
                },
            )
            .await?;

        let subscribe = Self::result_of::<SubscribeResult>("mining.subscribe", subscribe)?;

        let start = Instant::now();

        let authorize = self
            .request(
                "mining.authorize",
                &Authorize {
                    username: self.config.username.clone(),
                    password: self.config.password.clone(),
                },
            )
            .await?;

        let authorize_latency = start.elapsed();

        let authorized = match Self::result_of::<bool>("mining.authorize", authorize) {
            Ok(authorized) => authorized,
            Err(ClientError::Stratum { error, .. }) => {
                return error::UnauthorizedSnafu {
                    username: self.config.username.clone(),
                    reason: error.message,
                }
                .fail();
            }
            Err(err) => return Err(err),
        };

        if !authorized {
            return error::UnauthorizedSnafu {
                username: self.config.username.clone(),
                reason: "pool answered false",
            }
            .fail();
        }

        Ok(Session {
            session_id: subscribe.session_id().map(str::to_string),
            extranonce1: subscribe.extranonce1,
            extranonce2_size: subscribe.extranonce2_size,
            authorize_latency,
        })
    }

    /// Submits a share. A response that never arrives resolves to
    /// [`SubmitOutcome::TimedOut`] and leaves the connection up.
    pub async fn submit(
        &self,
        job_id: JobId,
        extranonce2: Extranonce,
        ntime: Ntime,
        nonce: Nonce,
    ) -> Result<SubmitOutcome> {
        let submit = Submit {
            username: self.config.username.clone(),
            job_id,
            extranonce2,
            ntime,
            nonce,
        };

        let message = match self.request("mining.submit", &submit).await {
            Ok(message) => message,
            Err(ClientError::RequestTimeout { .. }) => return Ok(SubmitOutcome::TimedOut),
            Err(err) => return Err(err),
        };

        match message {
            Message::Response {
                error: Some(error), ..
            } => Ok(SubmitOutcome::Rejected {
                reason: error.message,
            }),
            Message::Response {
                result: Some(Value::Bool(true)),
                ..
            } => Ok(SubmitOutcome::Accepted),
            Message::Response { reject_reason, .. } => Ok(SubmitOutcome::Rejected {
                reason: reject_reason.unwrap_or_else(|| "rejected".into()),
            }),
            other => error::ProtocolSnafu {
                message: format!("unexpected mining.submit reply: {other:?}"),
            }
            .fail(),
        }
    }

    /// Closes the connection. Calling it on a closed client is a no-op.
    pub async fn disconnect(&self) {
        let (respond_to, rx) = oneshot::channel();

        if self
            .tx
            .send(ClientMessage::Disconnect { respond_to })
            .await
            .is_err()
        {
            debug!("Disconnect skipped: client actor already gone");
            return;
        }

        if rx.await.is_err() {
            debug!("Disconnect response dropped: client actor gone");
        }
    }

    async fn request<P: Serialize>(&self, method: &'static str, params: &P) -> Result<Message> {
        let params = serde_json::to_value(params).context(error::SerializationSnafu)?;

        let (respond_to, rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::Request {
                method,
                params,
                respond_to,
            })
            .await
            .map_err(|_| ClientError::ChannelClosed)?;

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::ChannelClosed),
            Err(_) => error::RequestTimeoutSnafu { method }.fail(),
        }
    }

    fn result_of<T: DeserializeOwned>(method: &str, message: Message) -> Result<T> {
        match message {
            Message::Response {
                error: Some(error), ..
            } => error::StratumSnafu { method, error }.fail(),
            Message::Response {
                result: Some(result),
                ..
            } => serde_json::from_value(result).context(error::SerializationSnafu),
            Message::Response { result: None, .. } => error::ProtocolSnafu {
                message: format!("{method} returned no result"),
            }
            .fail(),
            other => error::ProtocolSnafu {
                message: format!("unexpected {method} reply: {other:?}"),
            }
            .fail(),
        }
    }
}
