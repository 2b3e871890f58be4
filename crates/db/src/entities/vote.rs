//! Vote entity.
//!
//! One row per (user, subject) holds the polarity of the user's current
//! vote. A post's "upvotes" are its rows with [`Polarity::Up`], its
//! "downvotes" those with [`Polarity::Down`]; the unique index on
//! `(user_id, subject, subject_id)` makes voting both ways impossible.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sign of a vote.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
pub enum Polarity {
    #[sea_orm(num_value = 1)]
    Up,
    #[sea_orm(num_value = -1)]
    Down,
}

impl Polarity {
    /// Parse a `voteValue` of 1 or -1.
    #[must_use]
    pub const fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }

    /// Numeric value of the polarity (+1 / -1).
    #[must_use]
    pub const fn value(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// Kind of entity a vote is cast on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum VoteSubject {
    #[sea_orm(string_value = "post")]
    Post,
    #[sea_orm(string_value = "comment")]
    Comment,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    pub subject: VoteSubject,

    /// Post or comment ID, depending on `subject`
    #[sea_orm(indexed)]
    pub subject_id: String,

    pub polarity: Polarity,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_from_value() {
        assert_eq!(Polarity::from_value(1), Some(Polarity::Up));
        assert_eq!(Polarity::from_value(-1), Some(Polarity::Down));
        assert_eq!(Polarity::from_value(0), None);
        assert_eq!(Polarity::from_value(2), None);
        assert_eq!(Polarity::Down.value(), -1);
    }
}
