//! Method table mapping RPC calls onto store operations.

use crate::request::{
    CreateParams, GetMemoriesParams, ListParams, MemoryIdParams, UnvoteParams, UpdateParams,
    VoteParams,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tidbits_memory::{
    ErrorKind, ListQuery, MemoryAdapter, MemoryStore, MemoryUpdate, NewMemory, OrderBy,
    StoreError, VoteDirection, create_voter_id,
};

/// A callable operation, addressable by RPC method or tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Create,
    Upvote,
    Downvote,
    Unvote,
    Update,
    List,
    Get,
    GetMemories,
    Remove,
    CreateVoterId,
}

/// Description of one exposed tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub method: Method,
    /// Line-protocol method name
    pub rpc_name: &'static str,
    /// Tool name as shown to agents
    pub tool_name: &'static str,
    pub description: &'static str,
}

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        method: Method::Create,
        rpc_name: "tidbits.create",
        tool_name: "create_memory",
        description: "Create a new memory/tidbit. Returns the created memory with its id.",
    },
    ToolSpec {
        method: Method::Upvote,
        rpc_name: "tidbits.upvote",
        tool_name: "upvote_memory",
        description: "Upvote a memory. Provide voter_id to enforce one vote per session.",
    },
    ToolSpec {
        method: Method::Downvote,
        rpc_name: "tidbits.downvote",
        tool_name: "downvote_memory",
        description: "Downvote a memory. Provide voter_id to enforce one vote per session.",
    },
    ToolSpec {
        method: Method::Unvote,
        rpc_name: "tidbits.unvote",
        tool_name: "unvote_memory",
        description: "Remove a prior vote from a memory by voter_id.",
    },
    ToolSpec {
        method: Method::Update,
        rpc_name: "tidbits.update",
        tool_name: "update_memory",
        description: "Edit the content and/or tags of a memory. Votes are kept.",
    },
    ToolSpec {
        method: Method::List,
        rpc_name: "tidbits.list",
        tool_name: "list_memory",
        description: "List memories sorted descending by votes or created_at. Optionally filter by tags.",
    },
    ToolSpec {
        method: Method::Get,
        rpc_name: "tidbits.get",
        tool_name: "get_memory",
        description: "Fetch a single memory by id, or null.",
    },
    ToolSpec {
        method: Method::GetMemories,
        rpc_name: "tidbits.get_memories",
        tool_name: "get_memories",
        description: "Get all memories in random order without vote counts. \
                      If voter_id is not provided, a new one is generated and \
                      included in the response for use in subsequent votes.",
    },
    ToolSpec {
        method: Method::Remove,
        rpc_name: "tidbits.remove",
        tool_name: "remove_memory",
        description: "Remove a memory by id.",
    },
    ToolSpec {
        method: Method::CreateVoterId,
        rpc_name: "tidbits.create_voter_id",
        tool_name: "create_voter_id",
        description: "Generate a new unique voter_id for this agent session.",
    },
];

impl Method {
    /// Resolve either an RPC method name or a tool name.
    pub fn lookup(name: &str) -> Option<Self> {
        TOOLS
            .iter()
            .find(|t| t.rpc_name == name || t.tool_name == name)
            .map(|t| t.method)
    }
}

/// Failure of a single RPC call. Rendered into the response `error` field.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid JSON: {0}")]
    Parse(serde_json::Error),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("invalid params: {0}")]
    InvalidParams(serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for RpcError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Storage(e) => Self::Internal(e.to_string()),
            other => Self::Rejected(other),
        }
    }
}

impl RpcError {
    /// Store error classification, if this came from the store.
    pub fn store_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::NotFound(_) => Some(ErrorKind::NotFound),
            Self::Rejected(e) => Some(e.kind()),
            _ => None,
        }
    }
}

fn params<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(RpcError::InvalidParams)
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

/// Routes calls to a [`MemoryStore`].
pub struct Dispatcher<A = Box<dyn MemoryAdapter>> {
    store: MemoryStore<A>,
}

impl<A: MemoryAdapter> Dispatcher<A> {
    pub fn new(store: MemoryStore<A>) -> Self {
        Self { store }
    }

    /// Run one call by name.
    pub fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let method = Method::lookup(method).ok_or_else(|| RpcError::UnknownMethod(method.into()))?;
        self.invoke(method, params)
    }

    pub fn invoke(&self, method: Method, raw: Value) -> Result<Value, RpcError> {
        let store = &self.store;
        match method {
            Method::Create => {
                let p: CreateParams = params(raw)?;
                let mut new = NewMemory::new(p.content).with_tags(p.tags.unwrap_or_default());
                new.creator = p.creator;
                new.voter_id = p.voter_id;
                to_value(&store.create(new)?)
            }
            Method::Upvote | Method::Downvote => {
                let p: VoteParams = params(raw)?;
                let direction = if method == Method::Upvote {
                    VoteDirection::Up
                } else {
                    VoteDirection::Down
                };
                to_value(&store.vote(&p.memory_id, direction, p.voter_id.as_deref(), p.n)?)
            }
            Method::Unvote => {
                let p: UnvoteParams = params(raw)?;
                to_value(&store.unvote(&p.memory_id, &p.voter_id)?)
            }
            Method::Update => {
                let p: UpdateParams = params(raw)?;
                let update = MemoryUpdate {
                    content: p.content,
                    tags: p.tags,
                };
                to_value(&store.update(&p.memory_id, update)?)
            }
            Method::List => {
                let p: ListParams = params(raw)?;
                let query = ListQuery {
                    order_by: p.order_by.parse::<OrderBy>()?,
                    limit: p.limit,
                    tags: p.tags.unwrap_or_default(),
                };
                to_value(&store.list(&query)?)
            }
            Method::Get => {
                let p: MemoryIdParams = params(raw)?;
                to_value(&store.get(&p.memory_id)?)
            }
            Method::GetMemories => {
                let p: GetMemoriesParams = params(raw)?;
                to_value(&store.get_memories(p.voter_id.as_deref())?)
            }
            Method::Remove => {
                let p: MemoryIdParams = params(raw)?;
                let removed = store.remove(&p.memory_id)?;
                Ok(json!({"removed": removed, "id": p.memory_id}))
            }
            Method::CreateVoterId => Ok(json!({"voter_id": create_voter_id()})),
        }
    }
}
