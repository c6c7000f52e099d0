use super::*;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Clone)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Message {
    Request {
        id: Id,
        method: String,
        params: Value,
    },
    Response {
        id: Id,
        result: Option<Value>,
        error: Option<JsonRpcError>,
        #[serde(skip_serializing_if = "Option::is_none", rename = "reject-reason")]
        reject_reason: Option<String>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

impl Message {
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request { method, .. } | Self::Notification { method, .. } => Some(method),
            Self::Response { .. } => None,
        }
    }
}

/// Pools send notifications with `"id": null` (or no id at all) and answer
/// requests with `result`/`error`. Anything carrying a method and a real id is
/// a server-initiated request.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        let object = value
            .as_object()
            .ok_or_else(|| de::Error::custom("message is not a JSON object"))?;

        let id = match object.get("id") {
            None | Some(Value::Null) => None,
            Some(id) => Some(Id::deserialize(id).map_err(de::Error::custom)?),
        };

        if let Some(method) = object.get("method") {
            let method = method
                .as_str()
                .ok_or_else(|| de::Error::custom("method is not a string"))?
                .to_string();

            let params = object.get("params").cloned().unwrap_or(Value::Array(Vec::new()));

            return Ok(match id {
                Some(id) => Message::Request { id, method, params },
                None => Message::Notification { method, params },
            });
        }

        if object.contains_key("result")
            || object.contains_key("error")
            || object.contains_key("reject-reason")
        {
            let id = id.ok_or_else(|| de::Error::missing_field("id"))?;

            let result = match object.get("result") {
                None | Some(Value::Null) => None,
                Some(result) => Some(result.clone()),
            };

            let error = match object.get("error") {
                None | Some(Value::Null) => None,
                Some(error) => Some(JsonRpcError::deserialize(error).map_err(de::Error::custom)?),
            };

            let reject_reason = object
                .get("reject-reason")
                .and_then(Value::as_str)
                .map(str::to_string);

            return Ok(Message::Response {
                id,
                result,
                error,
                reject_reason,
            });
        }

        Err(de::Error::custom("unknown message format"))
    }
}
