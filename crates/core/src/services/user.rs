//! User profiles and user-scoped post lists.

use agora_common::{AppError, AppResult, config::PaginationConfig};
use agora_db::{
    entities::user,
    repositories::{CommentRepository, PostFilter, PostRepository, UserRepository},
};

use super::{
    pagination::{Page, PageParams, PostScan, paginate},
    projection::{PostDetails, Projector},
};

/// A user with their accumulated credit.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user: user::Model,
    pub post_credit: i64,
    pub comment_credit: i64,
    /// Whether the viewer is looking at their own profile.
    pub is_self: bool,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    projector: Projector,
    pagination: PaginationConfig,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        projector: Projector,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            comment_repo,
            projector,
            pagination,
        }
    }

    async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found!".to_string()))
    }

    /// Profile of `username` as seen by `viewer_id`.
    pub async fn profile(&self, username: &str, viewer_id: &str) -> AppResult<Profile> {
        let user = self.get_by_username(username).await?;
        let post_credit = self.post_repo.credit_of(&user.id).await?;
        let comment_credit = self.comment_repo.credit_of(&user.id).await?;

        Ok(Profile {
            is_self: user.id == viewer_id,
            user,
            post_credit,
            comment_credit,
        })
    }

    async fn list(
        &self,
        filter: PostFilter,
        params: PageParams,
        viewer_id: &str,
    ) -> AppResult<Page<PostDetails>> {
        let page = paginate(
            &PostScan::new(&self.post_repo, filter),
            &params.resolve(self.pagination.user_list_limit, self.pagination.max_limit),
        )
        .await?;
        self.projector.post_page(page, viewer_id).await
    }

    /// Posts written by `username`.
    pub async fn submitted_posts(
        &self,
        username: &str,
        params: PageParams,
        viewer_id: &str,
    ) -> AppResult<Page<PostDetails>> {
        let user = self.get_by_username(username).await?;
        self.list(PostFilter::Author(user.id), params, viewer_id)
            .await
    }

    /// Posts bookmarked by `username`. Only the owner may list them.
    pub async fn bookmarks(
        &self,
        username: &str,
        params: PageParams,
        viewer_id: &str,
    ) -> AppResult<Page<PostDetails>> {
        let user = self.get_by_username(username).await?;
        if user.id != viewer_id {
            return Err(AppError::Forbidden(
                "User's bookmarks are private!".to_string(),
            ));
        }

        self.list(PostFilter::BookmarkedBy(user.id), params, viewer_id)
            .await
    }
}
