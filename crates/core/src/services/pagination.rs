//! Cursor pagination engine.
//!
//! Lists are ordered by `(created_at DESC, id DESC)`. A page is read by
//! resolving the cursor (the id of the last row the client saw) to its seek
//! key and scanning `limit + 1` rows strictly after it. The extra row only
//! signals that another page exists; it is never returned.

use agora_common::{AppError, AppResult};
use agora_db::{
    SeekKey,
    entities::{comment, post},
    repositories::{CommentFilter, CommentRepository, PostFilter, PostRepository},
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

/// Page size and cursor as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    /// Empty, non-numeric and zero limits fall back to the default.
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse::<u64>().ok()))
}

impl PageParams {
    /// Apply a default limit and clamp to `max_limit`.
    #[must_use]
    pub fn resolve(self, default_limit: u64, max_limit: u64) -> PageRequest {
        PageRequest::new(self.limit, self.cursor, default_limit, max_limit)
    }
}

/// A requested page: size and optional continuation cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub cursor: Option<String>,
}

impl PageRequest {
    /// Build a request, falling back to `default_limit` for a missing or zero
    /// limit and clamping to `[1, max_limit]`. An empty cursor counts as no
    /// cursor.
    #[must_use]
    pub fn new(
        limit: Option<u64>,
        cursor: Option<String>,
        default_limit: u64,
        max_limit: u64,
    ) -> Self {
        Self {
            limit: limit
                .filter(|&l| l > 0)
                .unwrap_or(default_limit)
                .clamp(1, max_limit.max(1)),
            cursor: cursor.filter(|c| !c.is_empty()),
        }
    }

    /// First page of `limit` items.
    #[must_use]
    pub const fn first(limit: u64) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Id of the last returned item when more items follow.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page from up to `limit + 1` scanned rows.
    pub fn from_overfetch(mut rows: Vec<T>, limit: u64, cursor_of: impl Fn(&T) -> String) -> Self {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        if rows.len() > limit {
            rows.truncate(limit);
            let next_cursor = rows.last().map(cursor_of);
            Self {
                items: rows,
                next_cursor,
            }
        } else {
            Self {
                items: rows,
                next_cursor: None,
            }
        }
    }

    /// Transform every item, keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// A collection that can be scanned in `(created_at DESC, id DESC)` order.
#[async_trait]
pub trait ScanSource: Send + Sync {
    /// Row type produced by the scan.
    type Item: Send;
    /// Position type a cursor resolves to.
    type Key: Send + Sync;

    /// Resolve a cursor to a position, `None` when it names no row of this kind.
    async fn seek_key(&self, cursor: &str) -> AppResult<Option<Self::Key>>;

    /// Read up to `take` rows strictly after `after` (from the head when `None`).
    async fn scan(&self, after: Option<&Self::Key>, take: u64) -> AppResult<Vec<Self::Item>>;

    /// The cursor identifying `item`.
    fn cursor_of(item: &Self::Item) -> String;
}

/// Read one page from `source`.
pub async fn paginate<S>(source: &S, request: &PageRequest) -> AppResult<Page<S::Item>>
where
    S: ScanSource + ?Sized,
{
    let key = match request.cursor.as_deref() {
        Some(cursor) => Some(
            source
                .seek_key(cursor)
                .await?
                .ok_or_else(|| AppError::Validation("Invalid cursor".to_string()))?,
        ),
        None => None,
    };

    let rows = source
        .scan(key.as_ref(), request.limit.saturating_add(1))
        .await?;

    Ok(Page::from_overfetch(rows, request.limit, S::cursor_of))
}

/// Posts matching a [`PostFilter`].
pub struct PostScan<'a> {
    repo: &'a PostRepository,
    filter: PostFilter,
}

impl<'a> PostScan<'a> {
    #[must_use]
    pub const fn new(repo: &'a PostRepository, filter: PostFilter) -> Self {
        Self { repo, filter }
    }
}

#[async_trait]
impl ScanSource for PostScan<'_> {
    type Item = post::Model;
    type Key = SeekKey;

    async fn seek_key(&self, cursor: &str) -> AppResult<Option<SeekKey>> {
        self.repo.seek_key(cursor).await
    }

    async fn scan(&self, after: Option<&SeekKey>, take: u64) -> AppResult<Vec<post::Model>> {
        self.repo.scan(&self.filter, after, take).await
    }

    fn cursor_of(item: &post::Model) -> String {
        item.id.clone()
    }
}

/// Comments matching a [`CommentFilter`].
pub struct CommentScan<'a> {
    repo: &'a CommentRepository,
    filter: CommentFilter,
}

impl<'a> CommentScan<'a> {
    #[must_use]
    pub const fn new(repo: &'a CommentRepository, filter: CommentFilter) -> Self {
        Self { repo, filter }
    }
}

#[async_trait]
impl ScanSource for CommentScan<'_> {
    type Item = comment::Model;
    type Key = SeekKey;

    async fn seek_key(&self, cursor: &str) -> AppResult<Option<SeekKey>> {
        self.repo.seek_key(cursor).await
    }

    async fn scan(&self, after: Option<&SeekKey>, take: u64) -> AppResult<Vec<comment::Model>> {
        self.repo.scan(&self.filter, after, take).await
    }

    fn cursor_of(item: &comment::Model) -> String {
        item.id.clone()
    }
}
