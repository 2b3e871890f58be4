//! Bookmark repository.

use std::{collections::HashSet, sync::Arc};

use crate::entities::{Bookmark, bookmark};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QuerySelect, Set,
    TransactionTrait, sea_query::OnConflict,
};

/// Bookmark repository for database operations.
#[derive(Clone)]
pub struct BookmarkRepository {
    db: Arc<DatabaseConnection>,
}

impl BookmarkRepository {
    /// Create a new bookmark repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Bookmark a post, or remove the bookmark when it already exists.
    ///
    /// Returns whether the post is bookmarked afterwards.
    pub async fn toggle(&self, user_id: &str, post_id: &str, new_id: String) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = bookmark::ActiveModel {
            id: Set(new_id),
            user_id: Set(user_id.to_string()),
            post_id: Set(post_id.to_string()),
            ..Default::default()
        };

        let inserted = Bookmark::insert(model)
            .on_conflict(
                OnConflict::columns([bookmark::Column::UserId, bookmark::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if inserted == 0 {
            Bookmark::delete_many()
                .filter(bookmark::Column::UserId.eq(user_id))
                .filter(bookmark::Column::PostId.eq(post_id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// The subset of `post_ids` a user has bookmarked.
    pub async fn bookmarked_among(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        #[derive(FromQueryResult)]
        struct Bookmarked {
            post_id: String,
        }

        let rows = Bookmark::find()
            .select_only()
            .column(bookmark::Column::PostId)
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::PostId.is_in(post_ids.to_vec()))
            .into_model::<Bookmarked>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    const fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_toggle_adds_missing_bookmark() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .into_connection(),
        );

        let repo = BookmarkRepository::new(db);
        let bookmarked = repo.toggle("user1", "post1", "b1".to_string()).await.unwrap();

        assert!(bookmarked);
    }

    #[tokio::test]
    async fn test_toggle_removes_existing_bookmark() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(1)])
                .into_connection(),
        );

        let repo = BookmarkRepository::new(db);
        let bookmarked = repo.toggle("user1", "post1", "b2".to_string()).await.unwrap();

        assert!(!bookmarked);
    }

    #[tokio::test]
    async fn test_bookmarked_among_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = BookmarkRepository::new(db);
        let result = repo.bookmarked_among("user1", &[]).await.unwrap();

        assert!(result.is_empty());
    }
}
