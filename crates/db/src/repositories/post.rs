//! Post repository.

use std::sync::Arc;

use crate::{
    entities::{Bookmark, Post, Subscription, bookmark, post, subscription},
    seek::SeekKey,
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, sea_query::Expr,
};

/// Which posts a feed scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post.
    All,
    /// Posts of one community.
    Community(String),
    /// Posts of the communities a user is subscribed to.
    Subscribed(String),
    /// Posts written by a user.
    Author(String),
    /// Posts a user has bookmarked.
    BookmarkedBy(String),
}

impl PostFilter {
    fn condition(&self) -> Condition {
        match self {
            Self::All => Condition::all(),
            Self::Community(community_id) => {
                Condition::all().add(post::Column::CommunityId.eq(community_id.as_str()))
            }
            Self::Subscribed(user_id) => {
                let communities = Subscription::find()
                    .select_only()
                    .column(subscription::Column::CommunityId)
                    .filter(subscription::Column::UserId.eq(user_id.as_str()))
                    .into_query();
                Condition::all().add(post::Column::CommunityId.in_subquery(communities))
            }
            Self::Author(user_id) => {
                Condition::all().add(post::Column::UserId.eq(user_id.as_str()))
            }
            Self::BookmarkedBy(user_id) => {
                let posts = Bookmark::find()
                    .select_only()
                    .column(bookmark::Column::PostId)
                    .filter(bookmark::Column::UserId.eq(user_id.as_str()))
                    .into_query();
                Condition::all().add(post::Column::Id.in_subquery(posts))
            }
        }
    }
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Resolve a post id to its position in feed order.
    pub async fn seek_key(&self, id: &str) -> AppResult<Option<SeekKey>> {
        Post::find_by_id(id)
            .select_only()
            .column(post::Column::CreatedAt)
            .column(post::Column::Id)
            .into_model::<SeekKey>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read up to `take` posts matching `filter`, newest first, strictly
    /// after `after` when given.
    pub async fn scan(
        &self,
        filter: &PostFilter,
        after: Option<&SeekKey>,
        take: u64,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find().filter(filter.condition());

        if let Some(key) = after {
            query = query.filter(key.after(post::Column::CreatedAt, post::Column::Id));
        }

        query
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .limit(take)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum of `upvotes - downvotes` over every post by a user.
    pub async fn credit_of(&self, user_id: &str) -> AppResult<i64> {
        #[derive(FromQueryResult)]
        struct CreditResult {
            credit: i64,
        }

        let result = Post::find()
            .filter(post::Column::UserId.eq(user_id))
            .select_only()
            .column_as(
                Expr::cust("CAST(COALESCE(SUM(upvotes_count - downvotes_count), 0) AS BIGINT)"),
                "credit",
            )
            .into_model::<CreditResult>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.map_or(0, |r| r.credit))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn create_test_post(id: &str, community_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            community_id: community_id.to_string(),
            user_id: "user1".to_string(),
            title: "A post title long enough".to_string(),
            content: None,
            is_nsfw: false,
            is_spoiler: false,
            youtube_video_id: None,
            upvotes_count: 0,
            downvotes_count: 0,
            comments_count: 0,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_by_id("missing").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_scan_orders_and_seeks() {
        let first = create_test_post("p2", "c1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[first]])
                .into_connection(),
        );

        let repo = PostRepository::new(db.clone());
        let key = SeekKey::new(
            (Utc::now() - Duration::minutes(1)).into(),
            "p3".to_string(),
        );
        let result = repo
            .scan(&PostFilter::Community("c1".to_string()), Some(&key), 3)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = format!("{log:?}");
        assert!(sql.contains(r#"ORDER BY \"post\".\"created_at\" DESC, \"post\".\"id\" DESC"#));
        assert!(sql.contains("LIMIT"));
    }

    #[test]
    fn test_subscribed_filter_uses_subquery() {
        let sql = Post::find()
            .filter(PostFilter::Subscribed("user1".to_string()).condition())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""post"."community_id" IN (SELECT "subscription"."community_id""#));
    }

    #[test]
    fn test_bookmark_filter_uses_subquery() {
        let sql = Post::find()
            .filter(PostFilter::BookmarkedBy("user1".to_string()).condition())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""post"."id" IN (SELECT "bookmark"."post_id""#));
    }

    #[tokio::test]
    async fn test_credit_of() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[BTreeMap::from([(
                    "credit".to_string(),
                    Value::BigInt(Some(7)),
                )])]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let credit = repo.credit_of("user1").await.unwrap();

        assert_eq!(credit, 7);
    }
}
