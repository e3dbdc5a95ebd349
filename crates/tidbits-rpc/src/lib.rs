//! Line-delimited JSON-RPC surface for the tidbits memory store.
//!
//! This crate provides:
//! - Request/response wire types
//! - The method table exposing each store operation as a tool
//! - The serve loop
//! - Debug logging of handled requests

pub mod debug;
pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use debug::{RequestDebugLog, debug_log_path};
pub use dispatch::{Dispatcher, Method, RpcError, TOOLS, ToolSpec};
pub use request::RpcRequest;
pub use response::RpcResponse;
pub use server::Server;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::dispatch::{Dispatcher, Method, RpcError};
    pub use crate::request::RpcRequest;
    pub use crate::response::RpcResponse;
    pub use crate::server::Server;
    pub use anyhow::{Context, Result};
}
