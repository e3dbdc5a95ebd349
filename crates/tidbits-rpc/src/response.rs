//! Response lines written back by the RPC loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

/// One response line: `{"id": ..., "result": ...}` or `{"id": ..., "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Request id (null when the request could not be parsed)
    pub id: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Write the response as a single line and flush.
    pub fn write_line<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        serde_json::to_writer(&mut *out, self)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_line() {
        let mut out = Vec::new();
        RpcResponse::success(json!(1), json!({"removed": true}))
            .write_line(&mut out)
            .unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap().trim_end(), @r#"{"id":1,"result":{"removed":true}}"#);
    }

    #[test]
    fn test_failure_line() {
        let response = RpcResponse::failure(Value::Null, "invalid JSON: oops");
        assert!(response.is_error());
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"id":null,"error":"invalid JSON: oops"}"#);
    }
}
