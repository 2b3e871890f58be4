//! JSON views of core results.

#![allow(missing_docs)]

use agora_core::{AuthorSummary, CommentDetails, CommunityDetails, PostDetails, Profile};
use agora_db::entities::{community, vote::Polarity};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AuthorView {
    pub id: String,
    pub username: String,
}

impl From<AuthorSummary> for AuthorView {
    fn from(author: AuthorSummary) -> Self {
        Self {
            id: author.id,
            username: author.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostCounts {
    pub upvotes: i64,
    pub downvotes: i64,
    pub comments: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub youtube_video_id: Option<String>,
    pub community_normalized_name: String,
    pub author: AuthorView,
    #[serde(rename = "isNSFW")]
    pub is_nsfw: bool,
    pub is_spoiler: bool,
    pub created_at: DateTimeWithTimeZone,
    pub counts: PostCounts,
    pub has_upvoted: bool,
    pub has_downvoted: bool,
    pub is_bookmarked: bool,
}

impl From<PostDetails> for PostView {
    fn from(details: PostDetails) -> Self {
        let post = details.post;
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            youtube_video_id: post.youtube_video_id,
            community_normalized_name: details.community_name,
            author: details.author.into(),
            is_nsfw: post.is_nsfw,
            is_spoiler: post.is_spoiler,
            created_at: post.created_at,
            counts: PostCounts {
                upvotes: post.upvotes_count,
                downvotes: post.downvotes_count,
                comments: post.comments_count,
            },
            has_upvoted: details.my_vote == Some(Polarity::Up),
            has_downvoted: details.my_vote == Some(Polarity::Down),
            is_bookmarked: details.bookmarked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentCounts {
    pub upvotes: i64,
    pub downvotes: i64,
    pub replies: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub author: AuthorView,
    pub content: String,
    pub created_at: DateTimeWithTimeZone,
    pub counts: CommentCounts,
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

impl From<CommentDetails> for CommentView {
    fn from(details: CommentDetails) -> Self {
        let comment = details.comment;
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_comment_id: comment.parent_id,
            author: details.author.into(),
            content: comment.content,
            created_at: comment.created_at,
            counts: CommentCounts {
                upvotes: comment.upvotes_count,
                downvotes: comment.downvotes_count,
                replies: comment.replies_count,
            },
            has_upvoted: details.my_vote == Some(Polarity::Up),
            has_downvoted: details.my_vote == Some(Polarity::Down),
        }
    }
}

/// Post together with the first page of its top-level comments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostThreadView {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityView {
    pub id: String,
    pub name: String,
    pub normalized_name: String,
    pub description: Option<String>,
    pub subscribers_count: i64,
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_subscribed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_moderator: Option<bool>,
}

impl From<community::Model> for CommunityView {
    fn from(community: community::Model) -> Self {
        Self {
            id: community.id,
            name: community.name,
            normalized_name: community.normalized_name,
            description: community.description,
            subscribers_count: community.subscribers_count,
            created_at: community.created_at,
            is_subscribed: None,
            is_moderator: None,
        }
    }
}

impl From<CommunityDetails> for CommunityView {
    fn from(details: CommunityDetails) -> Self {
        Self {
            is_subscribed: Some(details.is_subscribed),
            is_moderator: Some(details.is_moderator),
            ..Self::from(details.community)
        }
    }
}

/// Entry of the subscribed communities list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityName {
    pub name: String,
    pub normalized_name: String,
}

impl From<community::Model> for CommunityName {
    fn from(community: community::Model) -> Self {
        Self {
            name: community.name,
            normalized_name: community.normalized_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub total_post_credit: i64,
    pub total_comment_credit: i64,
    pub created_at: DateTimeWithTimeZone,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.user.id,
            username: profile.user.username,
            email: profile.is_self.then_some(profile.user.email),
            total_post_credit: profile.post_credit,
            total_comment_credit: profile.comment_credit,
            created_at: profile.user.created_at,
        }
    }
}
