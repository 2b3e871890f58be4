//! Enrichment of posts and comments with related names and caller flags.
//!
//! Each call loads authors, communities, votes and bookmarks for a whole
//! batch of rows with one query per relation.

use std::collections::{HashMap, HashSet};

use agora_common::{AppError, AppResult};
use agora_db::{
    entities::{
        comment, post,
        vote::{Polarity, VoteSubject},
    },
    repositories::{BookmarkRepository, CommunityRepository, UserRepository, VoteRepository},
};

use super::{pagination::Page, vote::VoteTally};

/// Public identity of an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
}

/// A post with its community name, author and the viewer's flags.
#[derive(Debug, Clone)]
pub struct PostDetails {
    pub post: post::Model,
    pub community_name: String,
    pub author: AuthorSummary,
    pub my_vote: Option<Polarity>,
    pub bookmarked: bool,
}

impl PostDetails {
    /// Replace the vote counts and the viewer's vote with a fresh tally.
    #[must_use]
    pub fn with_tally(mut self, tally: VoteTally) -> Self {
        self.post.upvotes_count = tally.upvotes;
        self.post.downvotes_count = tally.downvotes;
        self.my_vote = tally.polarity();
        self
    }
}

/// A comment with its author and the viewer's vote.
#[derive(Debug, Clone)]
pub struct CommentDetails {
    pub comment: comment::Model,
    pub author: AuthorSummary,
    pub my_vote: Option<Polarity>,
}

impl CommentDetails {
    /// Replace the vote counts and the viewer's vote with a fresh tally.
    #[must_use]
    pub fn with_tally(mut self, tally: VoteTally) -> Self {
        self.comment.upvotes_count = tally.upvotes;
        self.comment.downvotes_count = tally.downvotes;
        self.my_vote = tally.polarity();
        self
    }
}

/// Builds [`PostDetails`] and [`CommentDetails`] for a viewer.
#[derive(Clone)]
pub struct Projector {
    user_repo: UserRepository,
    community_repo: CommunityRepository,
    vote_repo: VoteRepository,
    bookmark_repo: BookmarkRepository,
}

impl Projector {
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        community_repo: CommunityRepository,
        vote_repo: VoteRepository,
        bookmark_repo: BookmarkRepository,
    ) -> Self {
        Self {
            user_repo,
            community_repo,
            vote_repo,
            bookmark_repo,
        }
    }

    async fn authors(&self, user_ids: Vec<String>) -> AppResult<HashMap<String, String>> {
        let unique: Vec<String> = user_ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
        Ok(self
            .user_repo
            .find_by_ids(&unique)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect())
    }

    /// Users are never deleted, so a missing author is a broken reference.
    fn author(names: &HashMap<String, String>, user_id: &str) -> AppResult<AuthorSummary> {
        let username = names
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("Author {user_id} missing")))?;

        Ok(AuthorSummary {
            id: user_id.to_string(),
            username,
        })
    }

    /// Enrich a batch of posts, preserving order.
    pub async fn posts(
        &self,
        posts: Vec<post::Model>,
        viewer_id: &str,
    ) -> AppResult<Vec<PostDetails>> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let community_ids: Vec<String> = posts
            .iter()
            .map(|p| p.community_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors = self.authors(posts.iter().map(|p| p.user_id.clone()).collect()).await?;
        let communities: HashMap<String, String> = self
            .community_repo
            .find_by_ids(&community_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.normalized_name))
            .collect();
        let votes = self
            .vote_repo
            .find_polarities(viewer_id, VoteSubject::Post, &post_ids)
            .await?;
        let bookmarks = self
            .bookmark_repo
            .bookmarked_among(viewer_id, &post_ids)
            .await?;

        posts
            .into_iter()
            .map(|post| {
                Ok(PostDetails {
                    community_name: communities
                        .get(&post.community_id)
                        .cloned()
                        .unwrap_or_default(),
                    author: Self::author(&authors, &post.user_id)?,
                    my_vote: votes.get(&post.id).copied(),
                    bookmarked: bookmarks.contains(&post.id),
                    post,
                })
            })
            .collect()
    }

    /// Enrich a single post.
    pub async fn post(&self, post: post::Model, viewer_id: &str) -> AppResult<PostDetails> {
        let id = post.id.clone();
        self.posts(vec![post], viewer_id)
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Lost post {id} in projection")))
    }

    /// Enrich a page of posts.
    pub async fn post_page(
        &self,
        page: Page<post::Model>,
        viewer_id: &str,
    ) -> AppResult<Page<PostDetails>> {
        Ok(Page {
            items: self.posts(page.items, viewer_id).await?,
            next_cursor: page.next_cursor,
        })
    }

    /// Enrich a batch of comments, preserving order.
    pub async fn comments(
        &self,
        comments: Vec<comment::Model>,
        viewer_id: &str,
    ) -> AppResult<Vec<CommentDetails>> {
        if comments.is_empty() {
            return Ok(vec![]);
        }

        let comment_ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
        let authors = self
            .authors(comments.iter().map(|c| c.user_id.clone()).collect())
            .await?;
        let votes = self
            .vote_repo
            .find_polarities(viewer_id, VoteSubject::Comment, &comment_ids)
            .await?;

        comments
            .into_iter()
            .map(|comment| {
                Ok(CommentDetails {
                    author: Self::author(&authors, &comment.user_id)?,
                    my_vote: votes.get(&comment.id).copied(),
                    comment,
                })
            })
            .collect()
    }

    /// Enrich a single comment.
    pub async fn comment(
        &self,
        comment: comment::Model,
        viewer_id: &str,
    ) -> AppResult<CommentDetails> {
        let id = comment.id.clone();
        self.comments(vec![comment], viewer_id)
            .await?
            .pop()
            .ok_or_else(|| {
                AppError::Internal(format!("Lost comment {id} in projection"))
            })
    }

    /// Enrich a page of comments.
    pub async fn comment_page(
        &self,
        page: Page<comment::Model>,
        viewer_id: &str,
    ) -> AppResult<Page<CommentDetails>> {
        Ok(Page {
            items: self.comments(page.items, viewer_id).await?,
            next_cursor: page.next_cursor,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::entities::{bookmark, community, user, vote};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_post(id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            community_id: "c1".to_string(),
            user_id: "u1".to_string(),
            title: "Projection test post".to_string(),
            content: None,
            is_nsfw: false,
            is_spoiler: false,
            youtube_video_id: None,
            upvotes_count: 1,
            downvotes_count: 0,
            comments_count: 0,
            created_at: Utc::now().into(),
        }
    }

    fn projector(db: DatabaseConnection) -> Projector {
        let db = Arc::new(db);
        Projector::new(
            UserRepository::new(db.clone()),
            CommunityRepository::new(db.clone()),
            VoteRepository::new(db.clone()),
            BookmarkRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_posts_attach_flags_in_order() {
        let author = user::Model {
            id: "u1".to_string(),
            username: "Alice_01".to_string(),
            username_lower: "alice_01".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now().into(),
        };
        let community = community::Model {
            id: "c1".to_string(),
            name: "Rust".to_string(),
            normalized_name: "rust".to_string(),
            description: None,
            subscribers_count: 1,
            created_at: Utc::now().into(),
        };
        let my_vote = vote::Model {
            id: "v1".to_string(),
            user_id: "viewer".to_string(),
            subject: VoteSubject::Post,
            subject_id: "p2".to_string(),
            polarity: Polarity::Up,
            created_at: Utc::now().into(),
        };
        let bookmarked = bookmark::Model {
            id: "b1".to_string(),
            user_id: "viewer".to_string(),
            post_id: "p1".to_string(),
            created_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[author]])
            .append_query_results([[community]])
            .append_query_results([[my_vote]])
            .append_query_results([[bookmarked]])
            .into_connection();

        let details = projector(db)
            .posts(vec![test_post("p1"), test_post("p2")], "viewer")
            .await
            .unwrap();

        assert_eq!(details[0].post.id, "p1");
        assert!(details[0].bookmarked);
        assert_eq!(details[0].my_vote, None);
        assert_eq!(details[1].my_vote, Some(Polarity::Up));
        assert!(!details[1].bookmarked);
        assert_eq!(details[1].community_name, "rust");
        assert_eq!(details[1].author.username, "Alice_01");
    }

    #[tokio::test]
    async fn test_missing_author_is_an_internal_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<vote::Model>::new()])
            .into_connection();
        let orphan = comment::Model {
            id: "cm1".to_string(),
            post_id: "p1".to_string(),
            user_id: "ghost".to_string(),
            parent_id: None,
            content: "Who wrote this?".to_string(),
            upvotes_count: 0,
            downvotes_count: 0,
            replies_count: 0,
            created_at: Utc::now().into(),
        };

        let result = projector(db).comments(vec![orphan], "viewer").await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_with_tally_overrides_counts_and_vote() {
        let details = PostDetails {
            post: test_post("p1"),
            community_name: "rust".to_string(),
            author: AuthorSummary {
                id: "u1".to_string(),
                username: "Alice_01".to_string(),
            },
            my_vote: Some(Polarity::Up),
            bookmarked: false,
        }
        .with_tally(VoteTally {
            upvotes: 0,
            downvotes: 3,
            has_upvoted: false,
            has_downvoted: true,
        });

        assert_eq!(details.post.upvotes_count, 0);
        assert_eq!(details.post.downvotes_count, 3);
        assert_eq!(details.my_vote, Some(Polarity::Down));
    }

    #[tokio::test]
    async fn test_empty_batch_runs_no_queries() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let details = projector(db).comments(vec![], "viewer").await.unwrap();

        assert!(details.is_empty());
    }
}
