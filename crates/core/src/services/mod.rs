//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod community;
pub mod feed;
pub mod pagination;
pub mod post;
pub mod projection;
pub mod session;
pub mod user;
pub mod vote;

pub use comment::{CommentService, CreateCommentInput};
pub use community::{CommunityDetails, CommunityService, CreateCommunityInput};
pub use feed::FeedService;
pub use pagination::{
    CommentScan, Page, PageParams, PageRequest, PostScan, ScanSource, paginate,
};
pub use post::{CreatePostInput, PostService, PostThread, extract_youtube_id};
pub use projection::{AuthorSummary, CommentDetails, PostDetails, Projector};
pub use session::{Identity, LoginInput, RegisterInput, Session, SessionService};
pub use user::{Profile, UserService};
pub use vote::{SqlVoteStore, VoteEngine, VoteStore, VoteTally, VoteTarget, next_state};
