//! Repositories wrapping sea-orm queries for each aggregate.

mod bookmark;
mod comment;
mod community;
mod post;
mod user;
mod vote;

pub use bookmark::BookmarkRepository;
pub use comment::{CommentFilter, CommentRepository};
pub use community::{CommunityRepository, SubscriptionToggle};
pub use post::{PostFilter, PostRepository};
pub use user::UserRepository;
pub use vote::{VoteChange, VoteRepository};
