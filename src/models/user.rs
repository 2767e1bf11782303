//! User entity model
//!
//! Users are the people who record and edit validations. Only the SHA-256
//! digest of their bearer token is persisted.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// User entity representing a validator or administrator
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user (primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Login name, unique across the system
    #[sea_orm(unique)]
    pub username: String,

    /// Staff users may use the administrative endpoints
    pub is_staff: bool,

    /// Hex-encoded SHA-256 digest of the user's bearer token
    #[sea_orm(unique)]
    pub api_token_hash: String,

    /// Timestamp when the user was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
