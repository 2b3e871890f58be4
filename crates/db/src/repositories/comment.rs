//! Comment repository.

use std::sync::Arc;

use crate::{
    entities::{Comment, Post, comment, post},
    seek::SeekKey,
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};

/// Which comments a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentFilter {
    /// Comments on a post that are not replies.
    TopLevel(String),
    /// Direct replies to a comment.
    Replies(String),
}

impl CommentFilter {
    fn condition(&self) -> Condition {
        match self {
            Self::TopLevel(post_id) => Condition::all()
                .add(comment::Column::PostId.eq(post_id.as_str()))
                .add(comment::Column::ParentId.is_null()),
            Self::Replies(parent_id) => {
                Condition::all().add(comment::Column::ParentId.eq(parent_id.as_str()))
            }
        }
    }
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found!".to_string()))
    }

    /// Insert a comment and bump the counters it affects.
    ///
    /// The post's `comments_count` always grows; for a reply the parent's
    /// `replies_count` grows too. All writes share one transaction.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Post::update_many()
            .col_expr(
                post::Column::CommentsCount,
                Expr::col(post::Column::CommentsCount).add(1),
            )
            .filter(post::Column::Id.eq(created.post_id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(parent_id) = &created.parent_id {
            Comment::update_many()
                .col_expr(
                    comment::Column::RepliesCount,
                    Expr::col(comment::Column::RepliesCount).add(1),
                )
                .filter(comment::Column::Id.eq(parent_id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Resolve a comment id to its position in list order.
    pub async fn seek_key(&self, id: &str) -> AppResult<Option<SeekKey>> {
        Comment::find_by_id(id)
            .select_only()
            .column(comment::Column::CreatedAt)
            .column(comment::Column::Id)
            .into_model::<SeekKey>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read up to `take` comments matching `filter`, newest first, strictly
    /// after `after` when given.
    pub async fn scan(
        &self,
        filter: &CommentFilter,
        after: Option<&SeekKey>,
        take: u64,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find().filter(filter.condition());

        if let Some(key) = after {
            query = query.filter(key.after(comment::Column::CreatedAt, comment::Column::Id));
        }

        query
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .limit(take)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum of `upvotes - downvotes` over every comment by a user.
    pub async fn credit_of(&self, user_id: &str) -> AppResult<i64> {
        #[derive(FromQueryResult)]
        struct CreditResult {
            credit: i64,
        }

        let result = Comment::find()
            .filter(comment::Column::UserId.eq(user_id))
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
