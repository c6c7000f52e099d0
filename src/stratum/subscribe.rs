use super::*;

#[derive(Debug, PartialEq)]
pub struct Subscribe {
    pub user_agent: String,
}

impl Serialize for Subscribe {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(1))?;
        seq.serialize_element(&self.user_agent)?;
        seq.end()
    }
}

/// `[[["mining.notify", session_id], ...], extranonce1, extranonce2_size]`
#[derive(Debug, PartialEq, Clone)]
pub struct SubscribeResult {
    pub subscriptions: Vec<(String, String)>,
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
}

impl SubscribeResult {
    pub fn session_id(&self) -> Option<&str> {
        self.subscriptions
            .iter()
            .find(|(method, _)| method == "mining.notify")
            .map(|(_, id)| id.as_str())
    }
}

impl Serialize for SubscribeResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.subscriptions)?;
        seq.serialize_element(&self.extranonce1)?;
        seq.serialize_element(&self.extranonce2_size)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SubscribeResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Some pools send a single ["mining.notify", id] pair instead of a list.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Subscriptions {
            Many(Vec<(String, String)>),
            One((String, String)),
        }

        let (subscriptions, extranonce1, extranonce2_size) =
            <(Subscriptions, Extranonce, usize)>::deserialize(deserializer)?;

        if extranonce2_size == 0 {
            return Err(de::Error::custom("extranonce2_size must be > 0"));
        }

        Ok(SubscribeResult {
            subscriptions: match subscriptions {
                Subscriptions::Many(many) => many,
                Subscriptions::One(one) => vec![one],
            },
            extranonce1,
            extranonce2_size,
        })
    }
}
