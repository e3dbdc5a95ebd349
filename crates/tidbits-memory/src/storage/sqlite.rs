//! SQLite backend.

use super::MemoryAdapter;
use crate::error::StorageError;
use crate::schema::{Memory, VoteRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id                TEXT PRIMARY KEY,
    content           TEXT NOT NULL,
    votes             INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    last_updated      TEXT NOT NULL,
    creator           TEXT,
    tags              TEXT NOT NULL DEFAULT '[]',
    voters            TEXT NOT NULL DEFAULT '{}',
    last_anon_vote_at TEXT
);
";

const COLUMNS: &str =
    "id, content, votes, created_at, last_updated, creator, tags, voters, last_anon_vote_at";

/// One row per memory; tags and voters live in JSON text columns.
pub struct SqliteAdapter {
    conn: Mutex<Connection>,
}

impl SqliteAdapter {
    /// Open a database file, or a private in-memory database for `":memory:"`.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("opened sqlite store at {}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }
}

/// Raw column values, decoded into a [`Memory`] outside the row callback.
struct MemoryRow {
    id: String,
    content: String,
    votes: i64,
    created_at: String,
    last_updated: String,
    creator: Option<String>,
    tags: String,
    voters: String,
    last_anon_vote_at: Option<String>,
}

impl MemoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            votes: row.get(2)?,
            created_at: row.get(3)?,
            last_updated: row.get(4)?,
            creator: row.get(5)?,
            tags: row.get(6)?,
            voters: row.get(7)?,
            last_anon_vote_at: row.get(8)?,
        })
    }

    fn into_memory(self) -> Result<Memory, StorageError> {
        let voters: BTreeMap<String, VoteRecord> = serde_json::from_str(&self.voters)?;
        Ok(Memory {
            id: self.id,
            content: self.content,
            votes: self.votes,
            created_at: parse_time(&self.created_at)?,
            last_updated: parse_time(&self.last_updated)?,
            creator: self.creator,
            tags: serde_json::from_str(&self.tags)?,
            voters,
            last_anon_vote_at: self.last_anon_vote_at.as_deref().map(parse_time).transpose()?,
        })
    }
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| StorageError::Timestamp {
            value: value.to_string(),
            source,
        })
}

impl MemoryAdapter for SqliteAdapter {
    fn save(&self, memory: &Memory) -> Result<(), StorageError> {
        let tags = serde_json::to_string(&memory.tags)?;
        let voters = serde_json::to_string(&memory.voters)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO memories
                 (id, content, votes, created_at, last_updated,
                  creator, tags, voters, last_anon_vote_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                 content = excluded.content,
                 votes = excluded.votes,
                 last_updated = excluded.last_updated,
                 creator = excluded.creator,
                 tags = excluded.tags,
                 voters = excluded.voters,
                 last_anon_vote_at = excluded.last_anon_vote_at",
            params![
                memory.id,
                memory.content,
                memory.votes,
                format_time(&memory.created_at),
                format_time(&memory.last_updated),
                memory.creator,
                tags,
                voters,
                memory.last_anon_vote_at.as_ref().map(format_time),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Memory>, StorageError> {
        let row = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM memories WHERE id = ?1"),
                params![id],
                MemoryRow::from_row,
            )
            .optional()?
        };
        row.map(MemoryRow::into_memory).transpose()
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn list_all(&self) -> Result<Vec<Memory>, StorageError> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM memories"))?;
            let rows = stmt
                .query_map([], MemoryRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        rows.into_iter().map(MemoryRow::into_memory).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_contract() {
        contract::save_and_get(&SqliteAdapter::open_in_memory().unwrap());
        contract::get_missing(&SqliteAdapter::open_in_memory().unwrap());
        contract::upsert_replaces(&SqliteAdapter::open_in_memory().unwrap());
        contract::delete(&SqliteAdapter::open_in_memory().unwrap());
        contract::list_all(&SqliteAdapter::open_in_memory().unwrap());
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let adapter = SqliteAdapter::open_in_memory().unwrap();
        let mut memory = Memory::new("a", Utc::now());
        adapter.save(&memory).unwrap();
        let original_created = memory.created_at;

        memory.created_at = original_created + Duration::days(1);
        memory.votes = 4;
        adapter.save(&memory).unwrap();

        let loaded = adapter.get(&memory.id).unwrap().unwrap();
        assert_eq!(loaded.created_at, original_created);
        assert_eq!(loaded.votes, 4);
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memories.db");
        let path = path.to_str().unwrap();

        let memory = Memory::new("durable", Utc::now()).with_tag("db");
        {
            let adapter = SqliteAdapter::open(path).unwrap();
            adapter.save(&memory).unwrap();
        }
        let adapter = SqliteAdapter::open(path).unwrap();
        assert_eq!(adapter.get(&memory.id).unwrap(), Some(memory));
    }

    #[test]
    fn test_json_columns() {
        let adapter = SqliteAdapter::open_in_memory().unwrap();
        let mut memory = Memory::new("a", Utc::now()).with_tags(vec!["x".into(), "y".into()]);
        memory
            .voters
            .insert("v1".into(), VoteRecord::new(-2, Utc::now()));
        adapter.save(&memory).unwrap();

        let conn = adapter.conn.lock();
        let (tags, voters): (String, String) = conn
            .query_row(
                "SELECT tags, voters FROM memories WHERE id = ?1",
                params![memory.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(tags, r#"["x","y"]"#);
        let voters: serde_json::Value = serde_json::from_str(&voters).unwrap();
        assert_eq!(voters["v1"]["value"], -2);
    }
}
