//! Database entities.

pub mod bookmark;
pub mod comment;
pub mod community;
pub mod post;
pub mod subscription;
pub mod user;
pub mod vote;

pub use bookmark::Entity as Bookmark;
pub use comment::Entity as Comment;
pub use community::Entity as Community;
pub use post::Entity as Post;
pub use subscription::Entity as Subscription;
pub use user::Entity as User;
pub use vote::Entity as Vote;
