use super::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InternalError {
    #[snafu(display("invalid hex: {source}"))]
    Hex { source: hex::FromHexError },

    #[snafu(display("{message}"))]
    Parse { message: String },

    #[snafu(display("expected {expected} bytes, got {actual}"))]
    Length { expected: usize, actual: usize },
}

/// The `[code, message, traceback]` triple stratum pools put in the `error`
/// field of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    pub error_code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl<'de> Deserialize<'de> for JsonRpcError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Triple(i32, String, Option<Value>),
            Pair(i32, String),
            Object {
                code: i32,
                message: String,
            },
            Text(String),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Triple(error_code, message, traceback) => JsonRpcError {
                error_code,
                message,
                traceback,
            },
            Wire::Pair(error_code, message) | Wire::Object {
                code: error_code,
                message,
            } => JsonRpcError {
                error_code,
                message,
                traceback: None,
            },
            Wire::Text(message) => JsonRpcError {
                error_code: 20,
                message,
                traceback: None,
            },
        })
    }
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.error_code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl Display for JsonRpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "stratum error {}: {}", self.error_code, self.message)
    }
}
