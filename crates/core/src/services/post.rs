//! Post service.

use agora_common::{AppError, AppResult, IdGenerator, config::PaginationConfig};
use agora_db::{
    entities::{community, post, vote::Polarity},
    repositories::{
        BookmarkRepository, CommentFilter, CommentRepository, CommunityRepository, PostRepository,
    },
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use url::Url;
use validator::Validate;

use super::{
    pagination::{CommentScan, Page, PageRequest, paginate},
    projection::{CommentDetails, PostDetails, Projector},
    vote::{VoteEngine, VoteTarget},
};

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(min = 12, max = 150, message = "Title must be 12-150 characters"))]
    pub title: String,

    #[validate(length(max = 40000))]
    pub content: Option<String>,

    #[serde(default, rename = "isNSFW")]
    pub is_nsfw: bool,

    #[serde(default)]
    pub is_spoiler: bool,

    pub youtube_url: Option<String>,
}

/// A post with the first page of its top-level comments.
#[derive(Debug, Clone)]
pub struct PostThread {
    pub post: PostDetails,
    pub comments: Page<CommentDetails>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    community_repo: CommunityRepository,
    comment_repo: CommentRepository,
    bookmark_repo: BookmarkRepository,
    votes: VoteEngine,
    projector: Projector,
    pagination: PaginationConfig,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        community_repo: CommunityRepository,
        comment_repo: CommentRepository,
        bookmark_repo: BookmarkRepository,
        votes: VoteEngine,
        projector: Projector,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            post_repo,
            community_repo,
            comment_repo,
            bookmark_repo,
            votes,
            projector,
            pagination,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a post in a community.
    pub async fn create(
        &self,
        community_name: &str,
        user_id: &str,
        input: CreatePostInput,
    ) -> AppResult<PostDetails> {
        input.validate()?;

        let community = self.community_repo.get_by_name(community_name).await?;
        let youtube_video_id = input
            .youtube_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(extract_youtube_id)
            .transpose()?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            community_id: Set(community.id.clone()),
            user_id: Set(user_id.to_string()),
            title: Set(input.title),
            content: Set(input.content.filter(|c| !c.is_empty())),
            is_nsfw: Set(input.is_nsfw),
            is_spoiler: Set(input.is_spoiler),
            youtube_video_id: Set(youtube_video_id),
            upvotes_count: Set(0),
            downvotes_count: Set(0),
            comments_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let created = self.post_repo.create(model).await?;
        tracing::info!(post_id = %created.id, community_id = %community.id, user_id = %user_id, "Post created");

        self.projector.post(created, user_id).await
    }

    /// Find a post, requiring it to belong to the named community.
    pub async fn find_in_community(
        &self,
        community_name: &str,
        post_id: &str,
    ) -> AppResult<(community::Model, post::Model)> {
        post_in_community(&self.community_repo, &self.post_repo, community_name, post_id).await
    }

    /// Read a post together with its first page of top-level comments.
    pub async fn get(
        &self,
        community_name: &str,
        post_id: &str,
        viewer_id: &str,
    ) -> AppResult<PostThread> {
        let (_, post) = self.find_in_community(community_name, post_id).await?;

        let comments = paginate(
            &CommentScan::new(&self.comment_repo, CommentFilter::TopLevel(post.id.clone())),
            &PageRequest::first(self.pagination.feed_limit),
        )
        .await?;

        Ok(PostThread {
            post: self.projector.post(post, viewer_id).await?,
            comments: self.projector.comment_page(comments, viewer_id).await?,
        })
    }

    /// Vote on a post and return its refreshed view.
    pub async fn vote(
        &self,
        community_name: &str,
        post_id: &str,
        user_id: &str,
        polarity: Polarity,
    ) -> AppResult<PostDetails> {
        let (_, post) = self.find_in_community(community_name, post_id).await?;

        let tally = self
            .votes
            .apply_vote(&VoteTarget::post(post.id.as_str()), user_id, polarity)
            .await?;

        Ok(self.projector.post(post, user_id).await?.with_tally(tally))
    }

    /// Bookmark a post or remove the bookmark. Returns the new state.
    pub async fn toggle_bookmark(
        &self,
        community_name: &str,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<bool> {
        let (_, post) = self.find_in_community(community_name, post_id).await?;

        let bookmarked = self
            .bookmark_repo
            .toggle(user_id, &post.id, self.id_gen.generate())
            .await?;

        tracing::debug!(post_id = %post.id, user_id = %user_id, bookmarked, "Bookmark toggled");
        Ok(bookmarked)
    }
}

/// Look up a post by id, requiring it to belong to the named community.
pub(crate) async fn post_in_community(
    community_repo: &CommunityRepository,
    post_repo: &PostRepository,
    community_name: &str,
    post_id: &str,
) -> AppResult<(community::Model, post::Model)> {
    let community = community_repo.get_by_name(community_name).await?;
    let post = post_repo
        .find_by_id(post_id)
        .await?
        .filter(|p| p.community_id == community.id)
        .ok_or_else(|| AppError::NotFound("Post not found!".to_string()))?;

    Ok((community, post))
}

/// Extract the video id from a `youtube.com/watch?v=` or `youtu.be/` link.
pub fn extract_youtube_id(link: &str) -> AppResult<String> {
    let invalid = || AppError::Validation("Invalid YouTube URL".to_string());

    let url = Url::parse(link.trim()).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?;

    let id = if host == "youtu.be" {
        url.path_segments()
            .and_then(|mut segments| segments.next())
            .map(ToString::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        url.query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else {
        None
    };

    id.filter(|id| !id.is_empty()).ok_or_else(invalid)
}
