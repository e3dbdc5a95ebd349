//! Request parsing for the line-delimited RPC loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request line: `{"id": ..., "method": "...", "params": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Caller-chosen request id, echoed back verbatim
    #[serde(default)]
    pub id: Value,

    /// Method name (e.g. "tidbits.create" or "create_memory")
    #[serde(default)]
    pub method: String,

    /// Method parameters
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Parse a single request line.
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Params as an object; absent or null params become `{}`.
    pub fn params_or_empty(&self) -> Value {
        if self.params.is_null() {
            Value::Object(Default::default())
        } else {
            self.params.clone()
        }
    }
}

fn default_magnitude() -> i64 {
    1
}

fn default_order_by() -> String {
    "votes".to_string()
}

/// Params for `tidbits.create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParams {
    pub content: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub voter_id: Option<String>,
}

/// Params for `tidbits.upvote` / `tidbits.downvote`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteParams {
    pub memory_id: String,
    #[serde(default)]
    pub voter_id: Option<String>,
    /// Vote magnitude
    #[serde(default = "default_magnitude")]
    pub n: i64,
}

/// Params for `tidbits.unvote`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnvoteParams {
    pub memory_id: String,
    pub voter_id: String,
}

/// Params for `tidbits.update`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateParams {
    pub memory_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Params for `tidbits.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Params for `tidbits.get_memories`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetMemoriesParams {
    #[serde(default)]
    pub voter_id: Option<String>,
}

/// Params for methods addressing a single memory.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryIdParams {
    pub memory_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let line = r#"{"id": 3, "method": "tidbits.upvote", "params": {"memory_id": "m1"}}"#;
        let request = RpcRequest::parse(line).unwrap();
        assert_eq!(request.id, 3);
        assert_eq!(request.method, "tidbits.upvote");

        let params: VoteParams = serde_json::from_value(request.params_or_empty()).unwrap();
        assert_eq!(params.memory_id, "m1");
        assert_eq!(params.voter_id, None);
        assert_eq!(params.n, 1);
    }

    #[test]
    fn test_missing_params_become_empty_object() {
        let request = RpcRequest::parse(r#"{"id": "a", "method": "tidbits.get_memories"}"#).unwrap();
        assert_eq!(request.params_or_empty(), serde_json::json!({}));

        let params: ListParams = serde_json::from_value(request.params_or_empty()).unwrap();
        assert_eq!(params.order_by, "votes");
        assert_eq!(params.limit, None);
    }

    #[test]
    fn test_missing_required_param_fails() {
        let result = serde_json::from_value::<UnvoteParams>(serde_json::json!({"memory_id": "m1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_line() {
        assert!(RpcRequest::parse("{not json").is_err());
    }
}
