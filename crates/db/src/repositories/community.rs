//! Community repository, including subscription membership.

use std::sync::Arc;

use crate::entities::{Community, Subscription, community, subscription};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

/// Outcome of a subscription toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionToggle {
    /// The user was not subscribed and now is.
    Subscribed,
    /// The user was subscribed and no longer is.
    Unsubscribed,
    /// The user moderates the community; nothing changed.
    ModeratorRetained,
}

/// Community repository for database operations.
#[derive(Clone)]
pub struct CommunityRepository {
    db: Arc<DatabaseConnection>,
}

impl CommunityRepository {
    /// Create a new community repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a community by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<community::Model>> {
        Community::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find communities by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<community::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Community::find()
            .filter(community::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a community by its name, compared case-insensitively.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<community::Model>> {
        Community::find()
            .filter(community::Column::NormalizedName.eq(name.trim().to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a community by name, returning an error if not found.
    pub async fn get_by_name(&self, name: &str) -> AppResult<community::Model> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found!".to_string()))
    }

    /// Insert a community together with its creator's moderator subscription.
    ///
    /// Losing a race on the canonical name surfaces as `Conflict`.
    pub async fn create_with_moderator(
        &self,
        community: community::ActiveModel,
        moderator: subscription::ActiveModel,
    ) -> AppResult<community::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = community.insert(&txn).await.map_err(map_insert_error)?;
        moderator
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Find a user's subscription to a community.
    pub async fn find_subscription(
        &self,
        user_id: &str,
        community_id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::CommunityId.eq(community_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Subscribe or unsubscribe a user in one transaction.
    ///
    /// The existing row is locked before it is removed; a moderator row is
    /// never removed. `subscribers_count` changes in the same transaction.
    pub async fn toggle_subscription(
        &self,
        user_id: &str,
        community_id: &str,
        new_id: String,
    ) -> AppResult<SubscriptionToggle> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let existing = Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::CommunityId.eq(community_id))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let outcome = match existing {
            Some(row) if row.is_moderator => return Ok(SubscriptionToggle::ModeratorRetained),
            Some(row) => {
                Subscription::delete_by_id(row.id)
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Community::update_many()
                    .col_expr(
                        community::Column::SubscribersCount,
                        Expr::cust("GREATEST(subscribers_count - 1, 0)"),
                    )
                    .filter(community::Column::Id.eq(community_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                SubscriptionToggle::Unsubscribed
            }
            None => {
                let model = subscription::ActiveModel {
                    id: Set(new_id),
                    user_id: Set(user_id.to_string()),
                    community_id: Set(community_id.to_string()),
                    is_moderator: Set(false),
                    ..Default::default()
                };

                let inserted = Subscription::insert(model)
                    .on_conflict(
                        OnConflict::columns([
                            subscription::Column::UserId,
                            subscription::Column::CommunityId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                if inserted > 0 {
                    Community::update_many()
                        .col_expr(
                            community::Column::SubscribersCount,
                            Expr::col(community::Column::SubscribersCount).add(1),
                        )
                        .filter(community::Column::Id.eq(community_id))
                        .exec(&txn)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;
                }

                SubscriptionToggle::Subscribed
            }
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(outcome)
    }

    /// Communities a user is subscribed to, ordered by canonical name.
    pub async fn find_subscribed(&self, user_id: &str) -> AppResult<Vec<community::Model>> {
        let subscribed = Subscription::find()
            .select_only()
            .column(subscription::Column::CommunityId)
            .filter(subscription::Column::UserId.eq(user_id))
            .into_query();

        Community::find()
            .filter(community::Column::Id.in_subquery(subscribed))
            .order_by_asc(community::Column::NormalizedName)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn map_insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Community name is already taken!".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}
