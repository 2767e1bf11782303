//! Backup routine entity model
//!
//! A routine describes a scheduled backup for a client: which tool runs it,
//! which servers it covers, how often and at what time. The schedule is
//! informational; nothing in the service executes it.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How often a routine is expected to run
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[sea_orm(string_value = "daily")]
    Daily,
    #[sea_orm(string_value = "weekly")]
    Weekly,
    #[sea_orm(string_value = "monthly")]
    Monthly,
}

impl Frequency {
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Daily => "Diário",
            Frequency::Weekly => "Semanal",
            Frequency::Monthly => "Mensal",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "diario" => Ok(Self::Daily),
            "weekly" | "semanal" => Ok(Self::Weekly),
            "monthly" | "mensal" => Ok(Self::Monthly),
            other => Err(format!("invalid frequency '{other}'")),
        }
    }
}

/// Backup routine entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "backup_routines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning client; always equal to the client of the routine's servers
    pub client_id: Option<i32>,

    /// Tool performing the backup
    pub tool_id: i32,

    /// What is being backed up
    pub description: String,

    pub frequency: Frequency,

    /// Time of day the backup is expected to run
    pub execution_time: NaiveTime,

    /// Retention period in days
    pub retention_days: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "SetNull"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::backup_tool::Entity",
        from = "Column::ToolId",
        to = "super::backup_tool::Column::Id",
        on_delete = "Restrict"
    )]
    BackupTool,
    #[sea_orm(has_many = "super::backup_validation::Entity")]
    BackupValidation,
    #[sea_orm(has_many = "super::routine_server::Entity")]
    RoutineServer,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::backup_tool::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupTool.def()
    }
}

impl Related<super::backup_validation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupValidation.def()
    }
}

impl Related<super::server::Entity> for Entity {
    fn to() -> RelationDef {
        super::routine_server::Relation::Server.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::routine_server::Relation::BackupRoutine.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Label used in dropdowns: "<tool> - <description>"
    pub fn label(&self, tool_name: &str) -> String {
        format!("{} - {}", tool_name, self.description)
    }
}
