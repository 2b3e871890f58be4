//! Vote repository.

use std::{collections::HashMap, sync::Arc};

use crate::entities::{
    Comment, Post, Vote, comment, post,
    vote::{self, Polarity, VoteSubject},
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

/// A user's vote on one subject before and after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    /// Polarity before the write.
    pub before: Option<Polarity>,
    /// Polarity after the write.
    pub after: Option<Polarity>,
}

impl VoteChange {
    /// Change in `(upvotes_count, downvotes_count)` implied by this transition.
    #[must_use]
    pub const fn count_deltas(&self) -> (i64, i64) {
        let mut up = 0;
        let mut down = 0;
        match self.before {
            Some(Polarity::Up) => up -= 1,
            Some(Polarity::Down) => down -= 1,
            None => {}
        }
        match self.after {
            Some(Polarity::Up) => up += 1,
            Some(Polarity::Down) => down += 1,
            None => {}
        }
        (up, down)
    }
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Load a user's votes for a batch of subjects, keyed by subject id.
    pub async fn find_polarities(
        &self,
        user_id: &str,
        subject: VoteSubject,
        subject_ids: &[String],
    ) -> AppResult<HashMap<String, Polarity>> {
        if subject_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::Subject.eq(subject))
            .filter(vote::Column::SubjectId.is_in(subject_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|v| (v.subject_id, v.polarity)).collect())
    }

    /// Current `(upvotes_count, downvotes_count)` of a subject, or `None`
    /// when the subject does not exist.
    pub async fn subject_counts(
        &self,
        subject: VoteSubject,
        subject_id: &str,
    ) -> AppResult<Option<(i64, i64)>> {
        #[derive(FromQueryResult)]
        struct Counts {
            upvotes_count: i64,
            downvotes_count: i64,
        }

        let counts = match subject {
            VoteSubject::Post => {
                Post::find_by_id(subject_id)
                    .select_only()
                    .column(post::Column::UpvotesCount)
                    .column(post::Column::DownvotesCount)
                    .into_model::<Counts>()
                    .one(self.db.as_ref())
                    .await
            }
            VoteSubject::Comment => {
                Comment::find_by_id(subject_id)
                    .select_only()
                    .column(comment::Column::UpvotesCount)
                    .column(comment::Column::DownvotesCount)
                    .into_model::<Counts>()
                    .one(self.db.as_ref())
                    .await
            }
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(counts.map(|c| (c.upvotes_count, c.downvotes_count)))
    }

    /// Move a user's vote on a subject to the state chosen by `decide`.
    ///
    /// `decide` receives the current polarity and returns the next one. The
    /// read and the write happen in one transaction: a fresh vote is
    /// inserted with `ON CONFLICT DO NOTHING`; when a row already exists it
    /// is locked with `FOR UPDATE` and then flipped or deleted. The subject's
    /// denormalized counters are adjusted in the same transaction.
    pub async fn toggle<F>(
        &self,
        user_id: &str,
        subject: VoteSubject,
        subject_id: &str,
        new_id: String,
        decide: F,
    ) -> AppResult<VoteChange>
    where
        F: Fn(Option<Polarity>) -> Option<Polarity> + Send,
    {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(polarity) = decide(None) {
            let model = vote::ActiveModel {
                id: Set(new_id),
                user_id: Set(user_id.to_string()),
                subject: Set(subject),
                subject_id: Set(subject_id.to_string()),
                polarity: Set(polarity),
                ..Default::default()
            };

            let inserted = Vote::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        vote::Column::UserId,
                        vote::Column::Subject,
                        vote::Column::SubjectId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            if inserted > 0 {
                let change = VoteChange {
                    before: None,
                    after: Some(polarity),
                };
                adjust_counts(&txn, subject, subject_id, change.count_deltas())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                txn.commit()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                return Ok(change);
            }
        }

        let existing = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::Subject.eq(subject))
            .filter(vote::Column::SubjectId.eq(subject_id))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(row) = existing else {
            // The conflicting row was removed by a transaction that committed
            // between our insert and the locking read.
            return Err(AppError::Conflict(
                "Vote changed concurrently, please retry".to_string(),
            ));
        };

        let change = VoteChange {
            before: Some(row.polarity),
            after: decide(Some(row.polarity)),
        };

        match change.after {
            Some(polarity) if polarity == row.polarity => {}
            Some(polarity) => {
                Vote::update_many()
                    .col_expr(vote::Column::Polarity, Expr::value(polarity.value()))
                    .filter(vote::Column::Id.eq(row.id))
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            None => {
                Vote::delete_by_id(row.id)
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }

        adjust_counts(&txn, subject, subject_id, change.count_deltas())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            user_id = %user_id,
            subject_id = %subject_id,
            before = ?change.before,
            after = ?change.after,
            "Vote updated"
        );

        Ok(change)
    }
}

async fn adjust_counts<C: ConnectionTrait>(
    conn: &C,
    subject: VoteSubject,
    subject_id: &str,
    (up, down): (i64, i64),
) -> Result<(), DbErr> {
    if up == 0 && down == 0 {
        return Ok(());
    }

    match subject {
        VoteSubject::Post => {
            Post::update_many()
                .col_expr(
                    post::Column::UpvotesCount,
                    Expr::col(post::Column::UpvotesCount).add(up),
                )
                .col_expr(
                    post::Column::DownvotesCount,
                    Expr::col(post::Column::DownvotesCount).add(down),
                )
                .filter(post::Column::Id.eq(subject_id))
                .exec(conn)
                .await?;
        }
        VoteSubject::Comment => {
            Comment::update_many()
                .col_expr(
                    comment::Column::UpvotesCount,
                    Expr::col(comment::Column::UpvotesCount).add(up),
                )
                .col_expr(
                    comment::Column::DownvotesCount,
                    Expr::col(comment::Column::DownvotesCount).add(down),
                )
                .filter(comment::Column::Id.eq(subject_id))
                .exec(conn)
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_vote(polarity: Polarity) -> vote::Model {
        vote::Model {
            id: "vote1".to_string(),
            user_id: "user1".to_string(),
            subject: VoteSubject::Post,
            subject_id: "post1".to_string(),
            polarity,
            created_at: Utc::now().into(),
        }
    }

    const fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn toggle_to(requested: Polarity) -> impl Fn(Option<Polarity>) -> Option<Polarity> + Send {
        move |current| {
            if current == Some(requested) {
                None
            } else {
                Some(requested)
            }
        }
    }

    #[test]
    fn test_count_deltas() {
        let switch = VoteChange {
            before: Some(Polarity::Down),
            after: Some(Polarity::Up),
        };
        assert_eq!(switch.count_deltas(), (1, -1));

        let retract = VoteChange {
            before: Some(Polarity::Up),
            after: None,
        };
        assert_eq!(retract.count_deltas(), (-1, 0));

        let noop = VoteChange {
            before: None,
            after: None,
        };
        assert_eq!(noop.count_deltas(), (0, 0));
    }

    #[tokio::test]
    async fn test_toggle_inserts_fresh_vote() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1)])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let change = repo
            .toggle(
                "user1",
                VoteSubject::Post,
                "post1",
                "vote1".to_string(),
                toggle_to(Polarity::Up),
            )
            .await
            .unwrap();

        assert_eq!(change.before, None);
        assert_eq!(change.after, Some(Polarity::Up));
    }

    #[tokio::test]
    async fn test_toggle_switches_existing_vote() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_vote(Polarity::Down)]])
                .append_exec_results([exec(0), exec(1), exec(1)])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let change = repo
            .toggle(
                "user1",
                VoteSubject::Post,
                "post1",
                "vote2".to_string(),
                toggle_to(Polarity::Up),
            )
            .await
            .unwrap();

        assert_eq!(change.before, Some(Polarity::Down));
        assert_eq!(change.after, Some(Polarity::Up));
    }

    #[tokio::test]
    async fn test_toggle_retracts_same_vote() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_vote(Polarity::Up)]])
                .append_exec_results([exec(0), exec(1), exec(1)])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let change = repo
            .toggle(
                "user1",
                VoteSubject::Post,
                "post1",
                "vote2".to_string(),
                toggle_to(Polarity::Up),
            )
            .await
            .unwrap();

        assert_eq!(change.before, Some(Polarity::Up));
        assert_eq!(change.after, None);
    }

    #[tokio::test]
    async fn test_find_polarities_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = VoteRepository::new(db);
        let result = repo
            .find_polarities("user1", VoteSubject::Comment, &[])
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_polarities_keys_by_subject() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_vote(Polarity::Down)]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo
            .find_polarities("user1", VoteSubject::Post, &["post1".to_string()])
            .await
            .unwrap();

        assert_eq!(result.get("post1"), Some(&Polarity::Down));
    }
}
