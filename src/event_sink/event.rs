use super::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Hashes computed since the previous `Hashes` event.
    Hashes { count: u64 },
    Share {
        job_id: JobId,
        accepted: bool,
        pool: Option<String>,
    },
    BlockFound { job_id: JobId, hash: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_json() {
        assert_eq!(
            serde_json::to_value(Event::Share {
                job_id: JobId::from("bf"),
                accepted: true,
                pool: Some("main".into()),
            })
            .unwrap(),
            serde_json::json!({
                "type": "share",
                "job_id": "bf",
                "accepted": true,
                "pool": "main",
            })
        );

        assert_eq!(
            serde_json::to_value(Event::Hashes { count: 7 }).unwrap(),
            serde_json::json!({ "type": "hashes", "count": 7 })
        );
    }
}
