//! Store API: creation, voting and retrieval on top of any adapter.
//!
//! The store holds no entity cache. Every call reads from the adapter,
//! checks the vote invariants in memory and writes the result back.
//! Mutating calls on one store are serialized by an internal lock, so two
//! callers sharing a store cannot lose each other's votes. Separate
//! processes sharing a JSON file are not covered by that lock.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::schema::{Memory, MemoryListing, VoteRecord, dedupe_tags, generate_id};
use crate::storage::MemoryAdapter;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt;
use std::str::FromStr;

/// Minimum gap between two anonymous votes on the same memory.
pub const ANON_VOTE_COOLDOWN_SECS: i64 = 60;

/// Up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn sign(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// Sort key for [`MemoryStore::list`]. Always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Votes,
    CreatedAt,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Votes => "votes",
            Self::CreatedAt => "created_at",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderBy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "votes" => Ok(Self::Votes),
            "created_at" => Ok(Self::CreatedAt),
            other => Err(StoreError::InvalidInput(format!(
                "invalid order_by {other:?}; must be one of [\"created_at\", \"votes\"]"
            ))),
        }
    }
}

/// Arguments for [`MemoryStore::create`].
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub content: String,
    pub creator: Option<String>,
    pub tags: Vec<String>,
    /// Pre-registers an up-vote for this voter
    pub voter_id: Option<String>,
}

impl NewMemory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_voter_id(mut self, voter_id: impl Into<String>) -> Self {
        self.voter_id = Some(voter_id.into());
        self
    }
}

/// Fields to change in [`MemoryStore::update`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct MemoryUpdate {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Filter, order and limit for [`MemoryStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub order_by: OrderBy,
    pub limit: Option<usize>,
    /// Empty means no tag filtering
    pub tags: Vec<String>,
}

impl ListQuery {
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Core API for creating, voting on and retrieving memories.
pub struct MemoryStore<A = Box<dyn MemoryAdapter>> {
    adapter: A,
    rng: Mutex<StdRng>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    /// Build a store over the backend described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(config.open_adapter()?))
    }
}

impl<A: MemoryAdapter> MemoryStore<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_rng(adapter, StdRng::from_entropy())
    }

    /// Use a specific random source for shuffling `get_memories`.
    pub fn with_rng(adapter: A, rng: StdRng) -> Self {
        Self {
            adapter,
            rng: Mutex::new(rng),
            write_lock: Mutex::new(()),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Generate a new unique voter id.
    pub fn create_voter_id() -> String {
        create_voter_id()
    }

    fn get_or_not_found(&self, id: &str) -> Result<Memory> {
        self.adapter
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn create(&self, new: NewMemory) -> Result<Memory> {
        validate_content(&new.content)?;
        let now = Utc::now();

        let mut memory = Memory::new(new.content, now).with_tags(new.tags);
        memory.creator = new.creator;
        if let Some(voter_id) = new.voter_id.filter(|v| !v.is_empty()) {
            memory.voters.insert(voter_id, VoteRecord::new(1, now));
        }

        let _guard = self.write_lock.lock();
        self.adapter.save(&memory)?;
        log::debug!("created memory {}", memory.id);
        Ok(memory)
    }

    /// Cast a vote of `direction * magnitude`.
    ///
    /// With a voter id the vote is recorded per voter and a second vote by
    /// the same voter is rejected. Without one the vote only moves the
    /// total and is limited to one per memory per cooldown window.
    pub fn vote(
        &self,
        id: &str,
        direction: VoteDirection,
        voter_id: Option<&str>,
        magnitude: i64,
    ) -> Result<Memory> {
        if magnitude < 1 {
            return Err(StoreError::InvalidInput(format!(
                "n must be >= 1, got {magnitude}"
            )));
        }
        let value = direction.sign() * magnitude;

        let _guard = self.write_lock.lock();
        let mut memory = self.get_or_not_found(id)?;
        let now = Utc::now();

        match voter_id.filter(|v| !v.is_empty()) {
            Some(voter_id) => {
                if memory.voters.contains_key(voter_id) {
                    return Err(StoreError::DuplicateVote {
                        memory_id: id.to_string(),
                        voter_id: voter_id.to_string(),
                    });
                }
                memory.votes = add_votes(memory.votes, value)?;
                memory
                    .voters
                    .insert(voter_id.to_string(), VoteRecord::new(value, now));
            }
            None => {
                if anon_cooldown_active(memory.last_anon_vote_at, now) {
                    return Err(StoreError::RateLimited {
                        memory_id: id.to_string(),
                        cooldown_secs: ANON_VOTE_COOLDOWN_SECS,
                    });
                }
                memory.votes = add_votes(memory.votes, value)?;
                memory.last_anon_vote_at = Some(now);
            }
        }

        memory.last_updated = now;
        self.adapter.save(&memory)?;
        log::debug!("vote {value:+} on memory {id} -> {}", memory.votes);
        Ok(memory)
    }

    pub fn upvote(&self, id: &str, voter_id: Option<&str>) -> Result<Memory> {
        self.vote(id, VoteDirection::Up, voter_id, 1)
    }

    pub fn downvote(&self, id: &str, voter_id: Option<&str>) -> Result<Memory> {
        self.vote(id, VoteDirection::Down, voter_id, 1)
    }

    /// Withdraw a voter's vote. A voter with no vote is a no-op.
    pub fn unvote(&self, id: &str, voter_id: &str) -> Result<Memory> {
        let _guard = self.write_lock.lock();
        let mut memory = self.get_or_not_found(id)?;
        let Some(record) = memory.voters.get(voter_id).copied() else {
            return Ok(memory);
        };

        memory.votes = sub_votes(memory.votes, record.value)?;
        memory.voters.remove(voter_id);
        memory.last_updated = Utc::now();
        self.adapter.save(&memory)?;
        log::debug!("voter {voter_id} withdrew {:+} on memory {id}", record.value);
        Ok(memory)
    }

    /// Edit content and/or tags. Votes and voters are untouched.
    pub fn update(&self, id: &str, update: MemoryUpdate) -> Result<Memory> {
        if let Some(content) = &update.content {
            validate_content(content)?;
        }

        let _guard = self.write_lock.lock();
        let mut memory = self.get_or_not_found(id)?;
        if let Some(content) = update.content {
            memory.content = content;
        }
        if let Some(tags) = update.tags {
            memory.tags = dedupe_tags(tags);
        }
        memory.last_updated = Utc::now();
        self.adapter.save(&memory)?;
        Ok(memory)
    }

    /// Memories sorted descending by the requested key.
    pub fn list(&self, query: &ListQuery) -> Result<Vec<Memory>> {
        let mut memories = self.adapter.list_all()?;
        if !query.tags.is_empty() {
            memories.retain(|m| m.has_any_tag(&query.tags));
        }
        match query.order_by {
            OrderBy::Votes => memories.sort_by(|a, b| b.votes.cmp(&a.votes)),
            OrderBy::CreatedAt => memories.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        if let Some(limit) = query.limit {
            memories.truncate(limit);
        }
        Ok(memories)
    }

    /// All memories in random order, without vote information.
    ///
    /// If `voter_id` is not supplied a new one is generated and returned
    /// so the caller can use it for subsequent votes.
    pub fn get_memories(&self, voter_id: Option<&str>) -> Result<MemoryListing> {
        let generated = match voter_id {
            Some(v) if !v.is_empty() => None,
            _ => Some(Self::create_voter_id()),
        };

        let mut memories = self.adapter.list_all()?;
        memories.shuffle(&mut *self.rng.lock());

        Ok(MemoryListing {
            memories: memories.iter().map(Memory::public_view).collect(),
            voter_id: generated,
        })
    }

    pub fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let removed = self.adapter.delete(id)?;
        if removed {
            log::debug!("removed memory {id}");
        }
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Result<Option<Memory>> {
        Ok(self.adapter.get(id)?)
    }
}

/// Generate a new unique voter id. No storage involved.
pub fn create_voter_id() -> String {
    generate_id()
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "memory content must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn add_votes(votes: i64, value: i64) -> Result<i64> {
    votes
        .checked_add(value)
        .ok_or_else(|| StoreError::InvalidInput(format!("vote of {value} overflows total")))
}

fn sub_votes(votes: i64, value: i64) -> Result<i64> {
    votes
        .checked_sub(value)
        .ok_or_else(|| StoreError::InvalidInput(format!("withdrawing {value} overflows total")))
}

fn anon_cooldown_active(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last.is_some_and(|last| now - last < Duration::seconds(ANON_VOTE_COOLDOWN_SECS))
}
