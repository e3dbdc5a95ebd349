//! tidbits-memory: store, vote on and retrieve agent memories.
//!
//! Every subcommand maps onto one store operation and prints the same JSON
//! the RPC server would return for it. `serve` runs the line-delimited
//! JSON-RPC loop on stdin/stdout.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use serde_json::{Value, json};
use std::io;
use tidbits_memory::{MemoryStore, StoreConfig, create_voter_id};
use tidbits_rpc::{Dispatcher, Method, Server};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let Cli {
        backend,
        db,
        command,
    } = Cli::parse();

    // Pure; never touches storage.
    if let Command::CreateVoterId = command {
        return print_json(&json!({"voter_id": create_voter_id()}));
    }

    let config = StoreConfig::new(backend.into(), db);
    let store = MemoryStore::from_config(&config)
        .with_context(|| format!("Failed to open {} store at {}", config.backend, config.path))?;

    let Some((method, params)) = to_call(command) else {
        let server = Server::new(store);
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        return server.serve(stdin.lock(), &mut stdout.lock());
    };

    let result = Dispatcher::new(store).invoke(method, params)?;
    print_json(&result)
}

/// Translate a subcommand into a dispatcher call. `serve` has none.
fn to_call(command: Command) -> Option<(Method, Value)> {
    let call = match command {
        Command::Create(args) => (
            Method::Create,
            json!({
                "content": args.content,
                "creator": args.creator,
                "tags": args.tags,
                "voter_id": args.voter_id,
            }),
        ),
        Command::Upvote(args) => (
            Method::Upvote,
            json!({"memory_id": args.memory_id, "voter_id": args.voter_id, "n": args.n}),
        ),
        Command::Downvote(args) => (
            Method::Downvote,
            json!({"memory_id": args.memory_id, "voter_id": args.voter_id, "n": args.n}),
        ),
        Command::Unvote(args) => (
            Method::Unvote,
            json!({"memory_id": args.memory_id, "voter_id": args.voter_id}),
        ),
        Command::Update(args) => (
            Method::Update,
            json!({"memory_id": args.memory_id, "content": args.content, "tags": args.tags}),
        ),
        Command::List(args) => (
            Method::List,
            json!({"order_by": args.order_by.as_str(), "limit": args.limit, "tags": args.tags}),
        ),
        Command::Get(args) => (Method::Get, json!({"memory_id": args.memory_id})),
        Command::GetMemories(args) => (Method::GetMemories, json!({"voter_id": args.voter_id})),
        Command::Remove(args) => (Method::Remove, json!({"memory_id": args.memory_id})),
        Command::CreateVoterId => (Method::CreateVoterId, json!({})),
        Command::Serve => return None,
    };
    Some(call)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
