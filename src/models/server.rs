//! Server entity model
//!
//! A host owned by exactly one client.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Server entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "servers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning client
    pub client_id: i32,

    pub hostname: String,

    /// IPv4 or IPv6 address in textual form
    pub ip_address: String,

    /// Operating system label, e.g. "Windows Server 2019"
    pub operating_system: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
    #[sea_orm(has_many = "super::routine_server::Entity")]
    RoutineServer,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::backup_routine::Entity> for Entity {
    fn to() -> RelationDef {
        super::routine_server::Relation::BackupRoutine.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::routine_server::Relation::Server.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
