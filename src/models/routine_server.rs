//! Junction entity linking routines to the servers they back up.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "routine_servers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub routine_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub server_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::backup_routine::Entity",
        from = "Column::RoutineId",
        to = "super::backup_routine::Column::Id",
        on_delete = "Cascade"
    )]
    BackupRoutine,
    #[sea_orm(
        belongs_to = "super::server::Entity",
        from = "Column::ServerId",
        to = "super::server::Column::Id",
        on_delete = "Cascade"
    )]
    Server,
}

impl Related<super::backup_routine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupRoutine.def()
    }
}

impl Related<super::server::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Server.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
