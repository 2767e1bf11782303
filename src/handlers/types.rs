//! # Common API Types
//!
//! Response DTOs shared by the view, lookup and admin handlers. Timestamps
//! are returned in RFC 3339 together with a display string rendered in the
//! configured offset.

use chrono::FixedOffset;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::filters::{PageWindow, SortKey, ValidationFilter};
use crate::models::{Frequency, ValidationStatus, backup_tool, client, server};
use crate::reports::TIMESTAMP_FORMAT;
use crate::repositories::backup_routine::RoutineSummary;
use crate::repositories::validation::AuditInfo;
use crate::repositories::ValidationRecord;

pub(crate) fn display_time(value: &DateTimeWithTimeZone, offset: &FixedOffset) -> String {
    value.with_timezone(offset).format(TIMESTAMP_FORMAT).to_string()
}

/// A selectable value with its label
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn statuses() -> Vec<Choice> {
        ValidationStatus::ALL
            .iter()
            .map(|s| Choice {
                value: s.as_str().to_string(),
                label: s.label().to_string(),
            })
            .collect()
    }

    pub fn sort_keys() -> Vec<Choice> {
        SortKey::ALL
            .iter()
            .map(|k| Choice {
                value: k.as_str().to_string(),
                label: k.label().to_string(),
            })
            .collect()
    }

    pub fn frequencies() -> Vec<Choice> {
        [Frequency::Daily, Frequency::Weekly, Frequency::Monthly]
            .iter()
            .map(|f| Choice {
                value: f.as_str().to_string(),
                label: f.label().to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientDto {
    pub id: i32,
    pub legal_name: String,
    pub trade_name: String,
    pub tax_id: String,
    pub technical_contact: String,
    pub contact_email: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<client::Model> for ClientDto {
    fn from(model: client::Model) -> Self {
        Self {
            id: model.id,
            legal_name: model.legal_name,
            trade_name: model.trade_name,
            tax_id: model.tax_id,
            technical_contact: model.technical_contact,
            contact_email: model.contact_email,
            active: model.active,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Minimal client reference
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientRef {
    pub id: i32,
    pub trade_name: String,
}

impl From<&client::Model> for ClientRef {
    fn from(model: &client::Model) -> Self {
        Self {
            id: model.id,
            trade_name: model.trade_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServerDto {
    pub id: i32,
    pub client_id: i32,
    pub hostname: String,
    pub ip_address: String,
    pub operating_system: String,
    pub description: String,
}

impl From<server::Model> for ServerDto {
    fn from(model: server::Model) -> Self {
        Self {
            id: model.id,
            client_id: model.client_id,
            hostname: model.hostname,
            ip_address: model.ip_address,
            operating_system: model.operating_system,
            description: model.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolDto {
    pub id: i32,
    pub name: String,
}

impl From<backup_tool::Model> for ToolDto {
    fn from(model: backup_tool::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoutineDto {
    pub id: i32,
    pub client_id: Option<i32>,
    pub client_name: Option<String>,
    pub tool_id: i32,
    pub tool_name: String,
    /// "<tool> - <description>"
    pub label: String,
    pub description: String,
    pub frequency: Frequency,
    pub frequency_label: String,
    /// `HH:MM`
    pub execution_time: String,
    pub retention_days: i32,
    pub server_count: u64,
}

impl From<RoutineSummary> for RoutineDto {
    fn from(summary: RoutineSummary) -> Self {
        let label = summary.label();
        let routine = summary.routine;
        Self {
            id: routine.id,
            client_id: routine.client_id,
            client_name: summary.client_name,
            tool_id: routine.tool_id,
            tool_name: summary.tool_name,
            label,
            description: routine.description,
            frequency: routine.frequency,
            frequency_label: routine.frequency.label().to_string(),
            execution_time: routine.execution_time.format("%H:%M").to_string(),
            retention_days: routine.retention_days,
            server_count: summary.server_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditDto {
    pub edited: bool,
    pub editor: Option<String>,
    pub edited_at: Option<String>,
}

impl AuditDto {
    fn from_info(info: AuditInfo, offset: &FixedOffset) -> Self {
        Self {
            edited: info.edited,
            editor: info.editor,
            edited_at: info.edited_at.map(|at| display_time(&at, offset)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoutineRef {
    pub id: i32,
    pub label: String,
    pub description: String,
}

/// A validation with its display relations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationDto {
    pub id: i32,
    pub status: ValidationStatus,
    pub status_label: String,
    pub notes: String,
    /// Stored path relative to the media root
    pub evidence_path: String,
    pub created_at: String,
    /// `dd/mm/YYYY HH:MM` in the display offset
    pub created_at_display: String,
    pub routine: RoutineRef,
    pub tool_name: String,
    pub client: Option<ClientRef>,
    pub server_hostname: Option<String>,
    pub validator: Option<String>,
    pub audit: AuditDto,
}

impl ValidationDto {
    pub fn from_record(record: ValidationRecord, offset: &FixedOffset) -> Self {
        let audit = AuditDto::from_info(record.audit(), offset);
        let routine = RoutineRef {
            id: record.routine.id,
            label: record.routine_label(),
            description: record.routine.description.clone(),
        };
        let client = record.client.as_ref().map(ClientRef::from);
        let server_hostname = record.server_hostname().map(str::to_string);
        let validator = record.validator_name().map(str::to_string);
        let validation = record.validation;

        Self {
            id: validation.id,
            status: validation.status,
            status_label: validation.status.label().to_string(),
            notes: validation.notes,
            evidence_path: validation.evidence_path,
            created_at: validation.created_at.to_rfc3339(),
            created_at_display: display_time(&validation.created_at, offset),
            routine,
            tool_name: record.tool_name,
            client,
            server_hostname,
            validator,
            audit,
        }
    }

    pub fn from_records(records: Vec<ValidationRecord>, offset: &FixedOffset) -> Vec<Self> {
        records
            .into_iter()
            .map(|record| Self::from_record(record, offset))
            .collect()
    }
}

/// Paginated validation listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidationPage {
    pub items: Vec<ValidationDto>,
    pub page: PageWindow,
    pub filter: ValidationFilter,
}
