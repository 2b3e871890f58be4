//! Comment service.

use agora_common::{AppError, AppResult, IdGenerator, config::PaginationConfig};
use agora_db::{
    entities::{comment, vote::Polarity},
    repositories::{CommentFilter, CommentRepository, CommunityRepository, PostRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::{
    pagination::{CommentScan, Page, PageParams, paginate},
    post::post_in_community,
    projection::{CommentDetails, Projector},
    vote::{VoteEngine, VoteTarget},
};

/// Input for a comment or reply.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 10000, message = "Comment must be 1-10000 characters"))]
    pub content: String,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    community_repo: CommunityRepository,
    votes: VoteEngine,
    projector: Projector,
    pagination: PaginationConfig,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        community_repo: CommunityRepository,
        votes: VoteEngine,
        projector: Projector,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            community_repo,
            votes,
            projector,
            pagination,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a post.
    pub async fn create(
        &self,
        community_name: &str,
        post_id: &str,
        user_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentDetails> {
        input.validate()?;

        let (_, post) =
            post_in_community(&self.community_repo, &self.post_repo, community_name, post_id)
                .await?;

        self.insert(post.id, None, user_id, input.content).await
    }

    /// Reply to a comment on a post.
    pub async fn reply(
        &self,
        community_name: &str,
        post_id: &str,
        parent_id: &str,
        user_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentDetails> {
        input.validate()?;

        let (_, post) =
            post_in_community(&self.community_repo, &self.post_repo, community_name, post_id)
                .await?;
        let parent = self.comment_repo.get_by_id(parent_id).await?;

        if parent.post_id != post.id {
            return Err(AppError::Validation(
                "Parent comment belongs to another post".to_string(),
            ));
        }

        self.insert(post.id, Some(parent.id), user_id, input.content)
            .await
    }

    async fn insert(
        &self,
        post_id: String,
        parent_id: Option<String>,
        user_id: &str,
        content: String,
    ) -> AppResult<CommentDetails> {
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id),
            user_id: Set(user_id.to_string()),
            parent_id: Set(parent_id),
            content: Set(content),
            upvotes_count: Set(0),
            downvotes_count: Set(0),
            replies_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let created = self.comment_repo.create(model).await?;
        tracing::info!(
            comment_id = %created.id,
            post_id = %created.post_id,
            parent_id = ?created.parent_id,
            user_id = %user_id,
            "Comment created"
        );

        self.projector.comment(created, user_id).await
    }

    /// Page through the top-level comments of a post.
    pub async fn top_level(
        &self,
        community_name: &str,
        post_id: &str,
        params: PageParams,
        viewer_id: &str,
    ) -> AppResult<Page<CommentDetails>> {
        let (_, post) =
            post_in_community(&self.community_repo, &self.post_repo, community_name, post_id)
                .await?;

        let page = paginate(
            &CommentScan::new(&self.comment_repo, CommentFilter::TopLevel(post.id)),
            &params.resolve(self.pagination.feed_limit, self.pagination.max_limit),
        )
        .await?;

        self.projector.comment_page(page, viewer_id).await
    }

    /// Page through the direct replies of a comment.
    pub async fn replies(
        &self,
        comment_id: &str,
        params: PageParams,
        viewer_id: &str,
    ) -> AppResult<Page<CommentDetails>> {
        let parent = self.comment_repo.get_by_id(comment_id).await?;

        let page = paginate(
            &CommentScan::new(&self.comment_repo, CommentFilter::Replies(parent.id)),
            &params.resolve(self.pagination.reply_limit, self.pagination.max_limit),
        )
        .await?;

        self.projector.comment_page(page, viewer_id).await
    }

    /// Vote on a comment and return its refreshed view.
    pub async fn vote(
        &self,
        comment_id: &str,
        user_id: &str,
        polarity: Polarity,
    ) -> AppResult<CommentDetails> {
        let tally = self
            .votes
            .apply_vote(&VoteTarget::comment(comment_id), user_id, polarity)
            .await?;

        let comment = self.comment_repo.get_by_id(comment_id).await?;
        Ok(self.projector.comment(comment, user_id).await?.with_tally(tally))
    }
}
