use serde::{Deserialize, Serialize};

/// Progress of the indexing service, for display only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexingState {
    #[default]
    Idle,
    Indexing { name: String },
    Complete { name: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(IndexingState::Indexing { name: "a.pdf".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "indexing", "name": "a.pdf" }));
        let idle = serde_json::to_value(IndexingState::Idle).unwrap();
        assert_eq!(idle, serde_json::json!({ "state": "idle" }));
    }

    #[test]
    fn reads_back_from_tagged_json() {
        let err: IndexingState = serde_json::from_str(r#"{"state":"error","message":"disk full"}"#).unwrap();
        assert_eq!(err, IndexingState::Error { message: "disk full".into() });
        assert_eq!(IndexingState::default(), IndexingState::Idle);
    }
}
