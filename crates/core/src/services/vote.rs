//! Vote toggle engine.
//!
//! A user holds at most one vote per post or comment. Casting the polarity
//! they already hold retracts it; casting the other polarity replaces it in
//! one step. Storage goes through [`VoteStore`], which must read and write
//! the user's vote atomically.

use std::sync::Arc;

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::vote::{Polarity, VoteSubject},
    repositories::{VoteChange, VoteRepository},
};
use async_trait::async_trait;

/// The post or comment a vote is cast on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoteTarget {
    pub subject: VoteSubject,
    pub id: String,
}

impl VoteTarget {
    /// Target a post.
    #[must_use]
    pub fn post(id: impl Into<String>) -> Self {
        Self {
            subject: VoteSubject::Post,
            id: id.into(),
        }
    }

    /// Target a comment.
    #[must_use]
    pub fn comment(id: impl Into<String>) -> Self {
        Self {
            subject: VoteSubject::Comment,
            id: id.into(),
        }
    }
}

/// Aggregate counts and the caller's flags after a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

impl VoteTally {
    /// The caller's vote after the toggle.
    #[must_use]
    pub const fn polarity(&self) -> Option<Polarity> {
        if self.has_upvoted {
            Some(Polarity::Up)
        } else if self.has_downvoted {
            Some(Polarity::Down)
        } else {
            None
        }
    }
}

/// Next vote state when a user casts `requested` while holding `current`.
#[must_use]
pub fn next_state(current: Option<Polarity>, requested: Polarity) -> Option<Polarity> {
    if current == Some(requested) {
        None
    } else {
        Some(requested)
    }
}

/// Persistence for votes.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// `(upvotes, downvotes)` of the target, or `None` if it does not exist.
    async fn counts(&self, target: &VoteTarget) -> AppResult<Option<(i64, i64)>>;

    /// Atomically move the user's vote to `next_state(current, requested)`.
    async fn toggle(
        &self,
        target: &VoteTarget,
        user_id: &str,
        requested: Polarity,
    ) -> AppResult<VoteChange>;
}

/// [`VoteStore`] backed by the vote table.
#[derive(Clone)]
pub struct SqlVoteStore {
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl SqlVoteStore {
    /// Create a new SQL vote store.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository) -> Self {
        Self {
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl VoteStore for SqlVoteStore {
    async fn counts(&self, target: &VoteTarget) -> AppResult<Option<(i64, i64)>> {
        self.vote_repo
            .subject_counts(target.subject, &target.id)
            .await
    }

    async fn toggle(
        &self,
        target: &VoteTarget,
        user_id: &str,
        requested: Polarity,
    ) -> AppResult<VoteChange> {
        self.vote_repo
            .toggle(
                user_id,
                target.subject,
                &target.id,
                self.id_gen.generate(),
                move |current| next_state(current, requested),
            )
            .await
    }
}

/// Applies vote toggles and reports the resulting tally.
#[derive(Clone)]
pub struct VoteEngine {
    store: Arc<dyn VoteStore>,
}

impl VoteEngine {
    /// Create a vote engine over a store.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }

    /// Cast `polarity` on `target` for `user_id`.
    pub async fn apply_vote(
        &self,
        target: &VoteTarget,
        user_id: &str,
        polarity: Polarity,
    ) -> AppResult<VoteTally> {
        let not_found = || match target.subject {
            VoteSubject::Post => AppError::NotFound("Post not found!".to_string()),
            VoteSubject::Comment => AppError::NotFound("Comment not found!".to_string()),
        };

        if self.store.counts(target).await?.is_none() {
            return Err(not_found());
        }

        let change = self.store.toggle(target, user_id, polarity).await?;
        let (upvotes, downvotes) = self.store.counts(target).await?.ok_or_else(not_found)?;

        tracing::debug!(
            user_id = %user_id,
            target_id = %target.id,
            before = ?change.before,
            after = ?change.after,
            "Vote applied"
        );

        Ok(VoteTally {
            upvotes,
            downvotes,
            has_upvoted: change.after == Some(Polarity::Up),
            has_downvoted: change.after == Some(Polarity::Down),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::InMemoryVoteStore;

    fn engine_with_post(id: &str) -> (VoteEngine, Arc<InMemoryVoteStore>) {
        let store = Arc::new(InMemoryVoteStore::new());
        store.add_target(&VoteTarget::post(id));
        (VoteEngine::new(store.clone()), store)
    }

    fn assert_exclusive(tally: &VoteTally) {
        assert!(!(tally.has_upvoted && tally.has_downvoted));
    }

    #[test]
    fn test_next_state_transitions() {
        assert_eq!(next_state(None, Polarity::Up), Some(Polarity::Up));
        assert_eq!(next_state(Some(Polarity::Up), Polarity::Up), None);
        assert_eq!(next_state(Some(Polarity::Down), Polarity::Up), Some(Polarity::Up));
        assert_eq!(next_state(Some(Polarity::Up), Polarity::Down), Some(Polarity::Down));
        assert_eq!(next_state(Some(Polarity::Down), Polarity::Down), None);
    }

    #[tokio::test]
    async fn test_up_down_down_scenario() {
        let (engine, _) = engine_with_post("p1");
        let target = VoteTarget::post("p1");

        let tally = engine.apply_vote(&target, "u1", Polarity::Up).await.unwrap();
        assert_eq!((tally.upvotes, tally.downvotes), (1, 0));
        assert!(tally.has_upvoted);

        let tally = engine.apply_vote(&target, "u1", Polarity::Down).await.unwrap();
        assert_eq!((tally.upvotes, tally.downvotes), (0, 1));
        assert!(tally.has_downvoted && !tally.has_upvoted);

        let tally = engine.apply_vote(&target, "u1", Polarity::Down).await.unwrap();
        assert_eq!((tally.upvotes, tally.downvotes), (0, 0));
        assert!(!tally.has_upvoted && !tally.has_downvoted);
    }

    #[tokio::test]
    async fn test_same_polarity_twice_restores_state() {
        let (engine, _) = engine_with_post("p1");
        let target = VoteTarget::post("p1");
        engine.apply_vote(&target, "u2", Polarity::Down).await.unwrap();

        for polarity in [Polarity::Up, Polarity::Down] {
            let before = engine.apply_vote(&target, "u1", polarity).await.unwrap();
            let after = engine.apply_vote(&target, "u1", polarity).await.unwrap();
            assert_eq!((after.upvotes, after.downvotes), (0, 1));
            assert!(!after.has_upvoted && !after.has_downvoted);
            assert_exclusive(&before);
        }
    }

    #[tokio::test]
    async fn test_switch_from_downvote_in_one_call() {
        let (engine, _) = engine_with_post("p1");
        let target = VoteTarget::post("p1");

        engine.apply_vote(&target, "u1", Polarity::Down).await.unwrap();
        let tally = engine.apply_vote(&target, "u1", Polarity::Up).await.unwrap();

        assert!(tally.has_upvoted);
        assert!(!tally.has_downvoted);
        assert_eq!((tally.upvotes, tally.downvotes), (1, 0));
    }

    #[tokio::test]
    async fn test_exclusivity_over_arbitrary_sequence() {
        let (engine, store) = engine_with_post("p1");
        let target = VoteTarget::post("p1");
        let users = ["u1", "u2", "u3"];
        let sequence = [
            Polarity::Up,
            Polarity::Up,
            Polarity::Down,
            Polarity::Up,
            Polarity::Down,
            Polarity::Down,
            Polarity::Up,
        ];

        for (step, polarity) in sequence.iter().enumerate() {
            let user = users[step % users.len()];
            let tally = engine.apply_vote(&target, user, *polarity).await.unwrap();
            assert_exclusive(&tally);

            let (up_rows, down_rows) = store.polarity_rows(&target);
            assert_eq!(tally.upvotes, up_rows);
            assert_eq!(tally.downvotes, down_rows);
        }
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let (engine, _) = engine_with_post("p1");

        let result = engine
            .apply_vote(&VoteTarget::comment("c404"), "u1", Polarity::Up)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
