//! Backup tool entity model
//!
//! A label for the software that performs a backup, e.g. "Veeam".

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "backup_tools")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::backup_routine::Entity")]
    BackupRoutine,
}

impl Related<super::backup_routine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupRoutine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
