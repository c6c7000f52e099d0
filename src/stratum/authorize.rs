use super::*;

#[derive(Debug, PartialEq)]
pub struct Authorize {
    pub username: String,
    pub password: String,
}

impl Serialize for Authorize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.username, &self.password).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_params() {
        assert_eq!(
            serde_json::to_value(Authorize {
                username: "slush.miner1".into(),
                password: "password".into(),
            })
            .unwrap(),
            json!(["slush.miner1", "password"])
        );
    }
}
