//! Command-line definition.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tidbits_memory::Backend;
use tidbits_memory::config::{DB_PATH_ENV, DEFAULT_DB_PATH};

#[derive(Parser, Debug)]
#[command(
    name = "tidbits-memory",
    version,
    about = "tidbits-memory: a memory/tidbits voting framework for AI agents"
)]
pub struct Cli {
    /// Storage backend
    #[arg(long, global = true, value_enum, env = "TIDBITS_BACKEND", default_value = "json")]
    pub backend: BackendArg,

    /// Path to storage file (JSON file or SQLite database)
    #[arg(long, global = true, env = DB_PATH_ENV, default_value = DEFAULT_DB_PATH)]
    pub db: Utf8PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Json,
    Sqlite,
    Memory,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Json => Backend::Json,
            BackendArg::Sqlite => Backend::Sqlite,
            BackendArg::Memory => Backend::Memory,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByArg {
    Votes,
    #[value(name = "created_at")]
    CreatedAt,
}

impl OrderByArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Votes => "votes",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the stdin/stdout line-delimited JSON-RPC server
    Serve,

    /// Create a new memory
    Create(CreateArgs),

    /// Upvote a memory
    Upvote(VoteArgs),

    /// Downvote a memory
    Downvote(VoteArgs),

    /// Remove a prior vote
    Unvote(UnvoteArgs),

    /// Edit a memory's content or tags
    Update(UpdateArgs),

    /// List memories (sorted descending)
    List(ListArgs),

    /// Show a single memory
    Get(MemoryIdArgs),

    /// Get memories (random order, no votes)
    GetMemories(GetMemoriesArgs),

    /// Remove a memory
    Remove(MemoryIdArgs),

    /// Generate a new voter_id
    CreateVoterId,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Memory content text
    pub content: String,

    #[arg(long)]
    pub creator: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long)]
    pub voter_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct VoteArgs {
    pub memory_id: String,

    #[arg(long)]
    pub voter_id: Option<String>,

    /// Vote magnitude
    #[arg(long, default_value_t = 1)]
    pub n: i64,
}

#[derive(Args, Debug, Clone)]
pub struct UnvoteArgs {
    pub memory_id: String,
    pub voter_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    pub memory_id: String,

    #[arg(long)]
    pub content: Option<String>,

    /// Comma-separated tags (replaces existing tags)
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value = "votes")]
    pub order_by: OrderByArg,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Only memories carrying any of these comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MemoryIdArgs {
    pub memory_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct GetMemoriesArgs {
    #[arg(long)]
    pub voter_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_with_tags() {
        let cli = Cli::try_parse_from([
            "tidbits-memory",
            "--backend",
            "memory",
            "create",
            "fact",
            "--tags",
            "a,b",
            "--voter-id",
            "v1",
        ])
        .unwrap();
        assert_eq!(cli.backend, BackendArg::Memory);
        match cli.command {
            Command::Create(args) => {
                assert_eq!(args.content, "fact");
                assert_eq!(args.tags, vec!["a", "b"]);
                assert_eq!(args.voter_id.as_deref(), Some("v1"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_order_by() {
        let cli = Cli::try_parse_from(["tidbits-memory", "list", "--order-by", "created_at"]).unwrap();
        match cli.command {
            Command::List(args) => assert_eq!(args.order_by, OrderByArg::CreatedAt),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["tidbits-memory", "list", "--order-by", "content"]).is_err());
    }
}
