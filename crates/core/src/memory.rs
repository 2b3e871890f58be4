//! In-memory engine backends.
//!
//! [`InMemoryVoteStore`] and [`MemoryFeed`] implement the engine traits
//! without a database so the engines can be exercised in isolation.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use agora_common::AppResult;
use agora_db::{entities::vote::Polarity, repositories::VoteChange};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::services::{
    pagination::ScanSource,
    vote::{VoteStore, VoteTarget, next_state},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct VoteState {
    counts: HashMap<VoteTarget, (i64, i64)>,
    votes: HashMap<(VoteTarget, String), Polarity>,
}

/// Vote store holding targets and votes in memory.
#[derive(Debug, Default)]
pub struct InMemoryVoteStore {
    state: Mutex<VoteState>,
}

impl InMemoryVoteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a votable target with zero votes.
    pub fn add_target(&self, target: &VoteTarget) {
        lock(&self.state).counts.insert(target.clone(), (0, 0));
    }

    /// Count the stored vote rows of a target by polarity.
    #[must_use]
    pub fn polarity_rows(&self, target: &VoteTarget) -> (i64, i64) {
        let state = lock(&self.state);
        state
            .votes
            .iter()
            .filter(|((t, _), _)| t == target)
            .fold((0, 0), |(up, down), (_, polarity)| match polarity {
                Polarity::Up => (up + 1, down),
                Polarity::Down => (up, down + 1),
            })
    }
}

#[async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn counts(&self, target: &VoteTarget) -> AppResult<Option<(i64, i64)>> {
        Ok(lock(&self.state).counts.get(target).copied())
    }

    async fn toggle(
        &self,
        target: &VoteTarget,
        user_id: &str,
        requested: Polarity,
    ) -> AppResult<VoteChange> {
        let mut state = lock(&self.state);
        let key = (target.clone(), user_id.to_string());

        let change = VoteChange {
            before: state.votes.get(&key).copied(),
            after: next_state(state.votes.get(&key).copied(), requested),
        };

        match change.after {
            Some(polarity) => state.votes.insert(key, polarity),
            None => state.votes.remove(&key),
        };

        let (up, down) = change.count_deltas();
        if let Some(counts) = state.counts.get_mut(target) {
            counts.0 += up;
            counts.1 += down;
        }

        Ok(change)
    }
}

/// A row of a [`MemoryFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryItem {
    /// Create an item.
    #[must_use]
    pub fn new(id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            created_at,
        }
    }

    fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, self.id.as_str())
    }
}

/// An in-memory list scanned in `(created_at DESC, id DESC)` order.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    items: Mutex<Vec<MemoryItem>>,
}

impl MemoryFeed {
    /// Create a feed from items in any order.
    #[must_use]
    pub fn new(items: Vec<MemoryItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// Add an item.
    pub fn insert(&self, item: MemoryItem) {
        lock(&self.items).push(item);
    }
}

#[async_trait]
impl ScanSource for MemoryFeed {
    type Item = MemoryItem;
    type Key = (DateTime<Utc>, String);

    async fn seek_key(&self, cursor: &str) -> AppResult<Option<Self::Key>> {
        Ok(lock(&self.items)
            .iter()
            .find(|item| item.id == cursor)
            .map(|item| (item.created_at, item.id.clone())))
    }

    async fn scan(&self, after: Option<&Self::Key>, take: u64) -> AppResult<Vec<MemoryItem>> {
        let mut rows: Vec<MemoryItem> = lock(&self.items)
            .iter()
            .filter(|item| {
                after.is_none_or(|(created_at, id)| {
                    item.sort_key() < (*created_at, id.as_str())
                })
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        rows.truncate(usize::try_from(take).unwrap_or(usize::MAX));
        Ok(rows)
    }

    fn cursor_of(item: &MemoryItem) -> String {
        item.id.clone()
    }
}
