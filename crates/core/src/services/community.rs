//! Community service.

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{community, subscription},
    repositories::{CommunityRepository, SubscriptionToggle},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for creating a community.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunityInput {
    pub name: String,

    #[validate(length(max = 2048))]
    pub description: Option<String>,
}

/// A community together with the caller's membership.
#[derive(Debug, Clone)]
pub struct CommunityDetails {
    pub community: community::Model,
    pub is_subscribed: bool,
    pub is_moderator: bool,
}

/// Community service for business logic.
#[derive(Clone)]
pub struct CommunityService {
    community_repo: CommunityRepository,
    id_gen: IdGenerator,
}

impl CommunityService {
    /// Create a new community service.
    #[must_use]
    pub const fn new(community_repo: CommunityRepository) -> Self {
        Self {
            community_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a community moderated by its creator.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreateCommunityInput,
    ) -> AppResult<community::Model> {
        input.validate()?;

        let name = input.name.trim().to_string();
        validate_community_name(&name)?;
        let normalized_name = name.to_lowercase();

        if self.community_repo.find_by_name(&normalized_name).await?.is_some() {
            return Err(AppError::Conflict(
                "Community with the same name already exists, please choose another name."
                    .to_string(),
            ));
        }

        let community_id = self.id_gen.generate();
        let now = Utc::now();

        let community = community::ActiveModel {
            id: Set(community_id.clone()),
            name: Set(name),
            normalized_name: Set(normalized_name),
            description: Set(input.description),
            subscribers_count: Set(1),
            created_at: Set(now.into()),
        };
        let moderator = subscription::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            community_id: Set(community_id),
            is_moderator: Set(true),
            created_at: Set(now.into()),
        };

        let created = self
            .community_repo
            .create_with_moderator(community, moderator)
            .await?;

        tracing::info!(community_id = %created.id, user_id = %user_id, "Community created");
        Ok(created)
    }

    /// Look up a community and the viewer's membership in it.
    pub async fn details(&self, name: &str, viewer_id: &str) -> AppResult<CommunityDetails> {
        let community = self.community_repo.get_by_name(name).await?;
        let membership = self
            .community_repo
            .find_subscription(viewer_id, &community.id)
            .await?;

        Ok(CommunityDetails {
            is_subscribed: membership.is_some(),
            is_moderator: membership.is_some_and(|m| m.is_moderator),
            community,
        })
    }

    /// Subscribe to or unsubscribe from a community.
    ///
    /// Returns whether the user is subscribed afterwards. Moderators cannot
    /// unsubscribe.
    pub async fn toggle_subscription(&self, name: &str, user_id: &str) -> AppResult<bool> {
        let community = self.community_repo.get_by_name(name).await?;

        let outcome = self
            .community_repo
            .toggle_subscription(user_id, &community.id, self.id_gen.generate())
            .await?;

        tracing::debug!(community_id = %community.id, user_id = %user_id, ?outcome, "Subscription toggled");

        match outcome {
            SubscriptionToggle::Subscribed => Ok(true),
            SubscriptionToggle::Unsubscribed => Ok(false),
            SubscriptionToggle::ModeratorRetained => Err(AppError::Forbidden(
                "Moderators cannot unsubscribe from their community!".to_string(),
            )),
        }
    }

    /// Communities the user is subscribed to.
    pub async fn subscribed(&self, user_id: &str) -> AppResult<Vec<community::Model>> {
        self.community_repo.find_subscribed(user_id).await
    }
}

/// Community names are 4-16 characters of `[A-Za-z0-9_]`.
fn validate_community_name(name: &str) -> AppResult<()> {
    let len = name.chars().count();
    if !(4..=16).contains(&len) {
        return Err(AppError::Validation(
            "Community name must be 4-16 characters".to_string(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::Validation(
            "Community names can only contain letters, numbers and underscores".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_community() -> community::Model {
        community::Model {
            id: "c1".to_string(),
            name: "RustLang".to_string(),
            normalized_name: "rustlang".to_string(),
            description: None,
            subscribers_count: 1,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_subscription(is_moderator: bool) -> subscription::Model {
        subscription::Model {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            community_id: "c1".to_string(),
            is_moderator,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> CommunityService {
        CommunityService::new(CommunityRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_validate_community_name() {
        assert!(validate_community_name("rust").is_ok());
        assert!(validate_community_name("Rust_Lang_2025").is_ok());
        assert!(validate_community_name("abc").is_err());
        assert!(validate_community_name("a_very_long_community").is_err());
        assert!(validate_community_name("rust-lang").is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_taken_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_community()]]);

        let result = service(db)
            .create(
                "u1",
                CreateCommunityInput {
                    name: "RUSTLANG".to_string(),
                    description: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_subscribes_creator_as_moderator() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<community::Model>::new()])
            .append_query_results([[create_test_community()]])
            .append_query_results([[create_test_subscription(true)]]);

        let created = service(db)
            .create(
                "u1",
                CreateCommunityInput {
                    name: "  RustLang ".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(created.normalized_name, "rustlang");
        assert_eq!(created.subscribers_count, 1);
    }

    #[tokio::test]
    async fn test_moderator_cannot_unsubscribe() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_community()]])
            .append_query_results([[create_test_subscription(true)]]);

        let result = service(db).toggle_subscription("rustlang", "u1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_member_toggles_off_then_on() {
        let exec = || MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_community()]])
            .append_query_results([[create_test_subscription(false)]])
            .append_query_results([[create_test_community()]])
            .append_query_results([Vec::<subscription::Model>::new()])
            .append_exec_results([exec(), exec(), exec(), exec()]);
        let service = service(db);

        assert!(!service.toggle_subscription("rustlang", "u1").await.unwrap());
        assert!(service.toggle_subscription("rustlang", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_details_reports_membership() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_community()]])
            .append_query_results([[create_test_subscription(true)]]);

        let details = service(db).details("RustLang", "u1").await.unwrap();

        assert!(details.is_subscribed);
        assert!(details.is_moderator);
    }
}
