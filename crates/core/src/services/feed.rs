//! Post feeds.

use agora_common::{AppResult, config::PaginationConfig};
use agora_db::repositories::{CommunityRepository, PostFilter, PostRepository};

use super::{
    pagination::{Page, PageParams, PostScan, paginate},
    projection::{PostDetails, Projector},
};

/// Feed service for community, personal and global post lists.
#[derive(Clone)]
pub struct FeedService {
    post_repo: PostRepository,
    community_repo: CommunityRepository,
    projector: Projector,
    pagination: PaginationConfig,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        community_repo: CommunityRepository,
        projector: Projector,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            post_repo,
            community_repo,
            projector,
            pagination,
        }
    }

    async fn page(
        &self,
        filter: PostFilter,
        params: PageParams,
        viewer_id: &str,
    ) -> AppResult<Page<PostDetails>> {
        let page = paginate(
            &PostScan::new(&self.post_repo, filter),
            &params.resolve(self.pagination.feed_limit, self.pagination.max_limit),
        )
        .await?;
        self.projector.post_page(page, viewer_id).await
    }

    /// Posts of one community.
    pub async fn community(
        &self,
        name: &str,
        params: PageParams,
        viewer_id: &str,
    ) -> AppResult<Page<PostDetails>> {
        let community = self.community_repo.get_by_name(name).await?;
        self.page(PostFilter::Community(community.id), params, viewer_id)
            .await
    }

    /// Posts of the communities the viewer subscribes to.
    pub async fn home(&self, params: PageParams, viewer_id: &str) -> AppResult<Page<PostDetails>> {
        self.page(
            PostFilter::Subscribed(viewer_id.to_string()),
            params,
            viewer_id,
        )
        .await
    }

    /// Every post.
    pub async fn all(&self, params: PageParams, viewer_id: &str) -> AppResult<Page<PostDetails>> {
        self.page(PostFilter::All, params, viewer_id).await
    }
}
