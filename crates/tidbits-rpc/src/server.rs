//! Line-delimited RPC loop.
//!
//! Reads one JSON request per line and writes one JSON response per line.
//! No request can end the loop; only EOF or an I/O failure on the
//! streams themselves does.

use crate::debug::{RequestDebugLog, debug_log_path};
use crate::dispatch::{Dispatcher, RpcError};
use crate::request::RpcRequest;
use crate::response::RpcResponse;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tidbits_memory::{MemoryAdapter, MemoryStore};

pub struct Server<A = Box<dyn MemoryAdapter>> {
    dispatcher: Dispatcher<A>,
    debug_log: Option<PathBuf>,
}

impl<A: MemoryAdapter> Server<A> {
    /// Server over `store`, with the debug log taken from the environment.
    pub fn new(store: MemoryStore<A>) -> Self {
        Self {
            dispatcher: Dispatcher::new(store),
            debug_log: debug_log_path(),
        }
    }

    pub fn with_debug_log(mut self, path: Option<PathBuf>) -> Self {
        self.debug_log = path;
        self
    }

    /// Handle one input line. Blank lines produce no response.
    pub fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request = match RpcRequest::parse(line) {
            Ok(request) => request,
            Err(e) => {
                let err = RpcError::Parse(e);
                log::warn!("{err}");
                return Some(RpcResponse::failure(Value::Null, err.to_string()));
            }
        };

        let params = request.params_or_empty();
        let response = match self.dispatcher.call(&request.method, params.clone()) {
            Ok(result) => RpcResponse::success(request.id.clone(), result),
            Err(err) => {
                if let RpcError::Internal(_) = err {
                    log::error!("{} failed: {err}", request.method);
                } else {
                    log::debug!("{} rejected: {err}", request.method);
                }
                RpcResponse::failure(request.id.clone(), err.to_string())
            }
        };

        if let Some(path) = &self.debug_log {
            let entry = RequestDebugLog::new(request.id, &request.method)
                .with_params(&params)
                .with_outcome(response.error.as_deref());
            if let Err(e) = entry.write(path) {
                log::warn!("failed to write debug log {}: {e}", path.display());
            }
        }

        Some(response)
    }

    /// Serve until `input` reaches EOF.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, output: &mut W) -> Result<()> {
        log::info!("tidbits-memory server ready (line-delimited JSON-RPC)");
        for line in input.lines() {
            let line = line.context("Failed to read request line")?;
            if let Some(response) = self.handle_line(&line) {
                response
                    .write_line(output)
                    .context("Failed to write response")?;
            }
        }
        log::info!("input closed, server exiting");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::tempdir;
    use tidbits_memory::InMemoryAdapter;

    fn server() -> Server<InMemoryAdapter> {
        Server::new(MemoryStore::new(InMemoryAdapter::new())).with_debug_log(None)
    }

    fn run(server: &Server<InMemoryAdapter>, input: &str) -> Vec<RpcResponse> {
        let mut out = Vec::new();
        server.serve(Cursor::new(input.to_string()), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_loop_survives_bad_lines() {
        let server = server();
        let input = [
            "{not json",
            "",
            r#"{"id": 1, "method": "tidbits.bogus"}"#,
            r#"{"id": 2, "method": "tidbits.create", "params": {"content": "  "}}"#,
            r#"{"id": 3, "method": "tidbits.create", "params": {"content": "ok"}}"#,
        ]
        .join("\n");

        let responses = run(&server, &input);
        assert_eq!(responses.len(), 4);

        assert_eq!(responses[0].id, Value::Null);
        assert!(responses[0].error.as_deref().unwrap().starts_with("invalid JSON: "));
        assert_eq!(responses[1].error.as_deref(), Some("unknown method: tidbits.bogus"));
        assert_eq!(
            responses[2].error.as_deref(),
            Some("memory content must not be empty")
        );
        assert_eq!(responses[3].id, json!(3));
        assert_eq!(responses[3].result.as_ref().unwrap()["content"], "ok");
    }

    #[test]
    fn test_scenario_over_the_wire() {
        let server = server();
        let created = server
            .handle_line(r#"{"id": "c", "method": "tidbits.create", "params": {"content": "hello", "voter_id": "v1"}}"#)
            .unwrap();
        let id = created.result.unwrap()["id"].as_str().unwrap().to_string();

        let line = |method: &str, voter: &str| {
            json!({"id": method, "method": method, "params": {"memory_id": id, "voter_id": voter}})
                .to_string()
        };

        let up = server.handle_line(&line("tidbits.upvote", "v2")).unwrap();
        assert_eq!(up.result.unwrap()["votes"], 2);

        let dup = server.handle_line(&line("tidbits.upvote", "v1")).unwrap();
        assert!(dup.error.unwrap().contains("already voted"));

        let un = server.handle_line(&line("tidbits.unvote", "v2")).unwrap();
        assert_eq!(un.result.unwrap()["votes"], 1);
    }

    #[test]
    fn test_anonymous_rate_limit_over_the_wire() {
        let server = server();
        let created = server
            .handle_line(r#"{"id": 1, "method": "tidbits.create", "params": {"content": "x"}}"#)
            .unwrap();
        let id = created.result.unwrap()["id"].clone();
        let vote = json!({"id": 2, "method": "tidbits.downvote", "params": {"memory_id": id}}).to_string();

        assert!(!server.handle_line(&vote).unwrap().is_error());
        let limited = server.handle_line(&vote).unwrap();
        assert!(limited.error.unwrap().contains("rate-limited"));
    }

    #[test]
    fn test_debug_log_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rpc.jsonl");
        let server = server().with_debug_log(Some(path.clone()));

        server.handle_line(r#"{"id": 1, "method": "tidbits.create_voter_id"}"#);
        server.handle_line(r#"{"id": 2, "method": "tidbits.remove", "params": {}}"#);

        let contents = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["outcome"], "ok");
        assert_eq!(entries[1]["outcome"], "error");
        assert!(entries[1]["error"].as_str().unwrap().starts_with("invalid params"));
    }
}
