//! Keyset ("seek") pagination helpers.
//!
//! Every paginated list is ordered by `(created_at DESC, id DESC)`. A cursor
//! is the id of the last row a client has seen; it resolves to a [`SeekKey`]
//! and the next page is read strictly after that key.

use sea_orm::{ColumnTrait, Condition, FromQueryResult, prelude::DateTimeWithTimeZone};

/// Position of a row in `(created_at, id)` descending order.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct SeekKey {
    /// Creation time of the anchor row.
    pub created_at: DateTimeWithTimeZone,
    /// Id of the anchor row.
    pub id: String,
}

impl SeekKey {
    /// Create a seek key.
    #[must_use]
    pub const fn new(created_at: DateTimeWithTimeZone, id: String) -> Self {
        Self { created_at, id }
    }

    /// Condition matching rows that come strictly after this key:
    /// `created_at < c OR (created_at = c AND id < id_c)`.
    #[must_use]
    pub fn after<C: ColumnTrait>(&self, created_at: C, id: C) -> Condition {
        Condition::any()
            .add(created_at.lt(self.created_at))
            .add(
                Condition::all()
                    .add(created_at.eq(self.created_at))
                    .add(id.lt(self.id.as_str())),
            )
    }
}
