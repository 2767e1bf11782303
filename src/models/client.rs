//! Client entity model
//!
//! A client is a company whose backups are being tracked. It owns servers and
//! routines.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Client entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Registered legal name
    pub legal_name: String,

    /// Name the client is known by, used for display and ordering
    pub trade_name: String,

    /// Tax registration number (unique)
    #[sea_orm(unique)]
    pub tax_id: String,

    pub technical_contact: String,

    pub contact_email: String,

    /// Inactive clients are hidden from the dashboard
    pub active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::server::Entity")]
    Server,
    #[sea_orm(has_many = "super::backup_routine::Entity")]
    BackupRoutine,
}

impl Related<super::server::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Server.def()
    }
}

impl Related<super::backup_routine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupRoutine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
