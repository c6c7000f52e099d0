use super::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Connection to {address} timed out"))]
    ConnectTimeout {
        address: String,
        source: tokio::time::error::Elapsed,
    },

    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("Not connected"))]
    NotConnected,

    #[snafu(display("Client actor channel closed"))]
    ChannelClosed,

    #[snafu(display("{message}"))]
    Protocol { message: String },

    #[snafu(display("Serialization error: {source}"))]
    Serialization { source: serde_json::Error },

    #[snafu(display("{method} failed: {error}"))]
    Stratum { method: String, error: JsonRpcError },

    #[snafu(display("Worker {username} was not authorized: {reason}"))]
    Unauthorized { username: String, reason: String },

    #[snafu(display("{method} timed out waiting for a response"))]
    RequestTimeout { method: String },

    #[snafu(display("Too many pending requests"))]
    TooManyPendingRequests,
}

impl ClientError {
    /// Socket-level failures. These are only ever cured by reconnecting.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. } | Self::Io { .. } | Self::NotConnected | Self::ChannelClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(ClientError::NotConnected.is_transport());
        assert!(
            ClientError::Io {
                source: std::io::Error::from(std::io::ErrorKind::ConnectionReset)
            }
            .is_transport()
        );
        assert!(
            !ClientError::Unauthorized {
                username: "w".into(),
                reason: "rejected".into()
            }
            .is_transport()
        );
        assert!(
            !ClientError::RequestTimeout {
                method: "mining.submit".into()
            }
            .is_transport()
        );
        assert!(!ClientError::TooManyPendingRequests.is_transport());
    }
}
