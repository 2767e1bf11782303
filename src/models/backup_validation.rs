//! Backup validation entity model
//!
//! A validation is a manual record of the observed outcome of a routine's
//! backup, with the evidence file that supports it.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Observed outcome of a backup
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "error")]
    Error,
}

impl ValidationStatus {
    pub const ALL: [ValidationStatus; 3] = [
        ValidationStatus::Success,
        ValidationStatus::Warning,
        ValidationStatus::Error,
    ];

    /// Human-readable label used by views and reports
    pub fn label(&self) -> &'static str {
        match self {
            ValidationStatus::Success => "Sucesso",
            ValidationStatus::Warning => "Alerta",
            ValidationStatus::Error => "Erro",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Success => "success",
            ValidationStatus::Warning => "warning",
            ValidationStatus::Error => "error",
        }
    }

    /// Rank used by the status ordering; most severe first
    pub fn severity_rank(&self) -> i32 {
        match self {
            ValidationStatus::Error => 0,
            ValidationStatus::Warning => 1,
            ValidationStatus::Success => 2,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "sucesso" => Ok(Self::Success),
            "warning" | "alerta" => Ok(Self::Warning),
            "error" | "erro" => Ok(Self::Error),
            other => Err(format!("invalid status '{other}'")),
        }
    }
}

/// Backup validation entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "backup_validations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub routine_id: i32,

    /// User who recorded the validation
    pub user_id: i32,

    /// Administrator who last edited the validation, if any
    pub edited_by_id: Option<i32>,

    pub status: ValidationStatus,

    #[sea_orm(column_type = "Text")]
    pub notes: String,

    /// Stored evidence path relative to the media root (`evidencias/<uuid>.<ext>`)
    pub evidence_path: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
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
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::EditedById",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    EditedBy,
}

impl Related<super::backup_routine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupRoutine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
