//! Memory schema - the stored tidbit and its vote records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single vote cast by an identified voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Signed vote value (`direction * magnitude`, never zero)
    pub value: i64,

    /// When the vote was cast
    pub timestamp: DateTime<Utc>,
}

impl VoteRecord {
    pub fn new(value: i64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

/// A stored memory (tidbit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier
    pub id: String,

    /// Memory content
    pub content: String,

    /// Running vote total (starts at 1)
    #[serde(default = "default_votes")]
    pub votes: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Advanced on every vote, unvote and edit
    pub last_updated: DateTime<Utc>,

    /// Informational creator label
    #[serde(default)]
    pub creator: Option<String>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Identified voters and their current vote
    #[serde(default)]
    pub voters: BTreeMap<String, VoteRecord>,

    /// Last anonymous vote, for the per-memory cooldown
    #[serde(default)]
    pub last_anon_vote_at: Option<DateTime<Utc>>,
}

fn default_votes() -> i64 {
    1
}

impl Memory {
    /// Create a new memory with a fresh id and a single implicit vote.
    pub fn new(content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            content: content.into(),
            votes: 1,
            created_at: now,
            last_updated: now,
            creator: None,
            tags: Vec::new(),
            voters: BTreeMap::new(),
            last_anon_vote_at: None,
        }
    }

    /// Set creator.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Replace tags, dropping duplicates.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = dedupe_tags(tags);
        self
    }

    /// Add tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Whether any of `tags` is attached to this memory.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }

    /// Sum of all identified voters' values.
    pub fn voter_total(&self) -> i64 {
        self.voters.values().map(|v| v.value).sum()
    }

    /// Projection handed to agents: no vote counts, no voters.
    pub fn public_view(&self) -> PublicMemory {
        PublicMemory {
            id: self.id.clone(),
            content: self.content.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Public projection of a memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMemory {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Randomized listing returned by `get_memories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryListing {
    pub memories: Vec<PublicMemory>,

    /// Only present when the caller did not bring its own voter id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voter_id: Option<String>,
}

/// Keep the first occurrence of every tag.
pub fn dedupe_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Generate a globally unique identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
