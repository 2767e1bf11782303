//! Dashboard aggregation: one panel per active client plus the latest
//! validations system-wide.

use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::RepositoryError;
use crate::filters::ValidationQuery;
use crate::models::{ValidationStatus, client};
use crate::repositories::{ClientRepository, ValidationRecord, ValidationRepository};

/// Validations shown per client panel.
pub const CLIENT_RECENT_LIMIT: u64 = 5;

/// Validations shown in the global "latest" list.
pub const GLOBAL_RECENT_LIMIT: u64 = 10;

/// Status of a client's most recent validation, or `pending` when it has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Success,
    Warning,
    Error,
    Pending,
}

impl From<ValidationStatus> for ClientStatus {
    fn from(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Success => ClientStatus::Success,
            ValidationStatus::Warning => ClientStatus::Warning,
            ValidationStatus::Error => ClientStatus::Error,
        }
    }
}

impl ClientStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ClientStatus::Success => ValidationStatus::Success.label(),
            ClientStatus::Warning => ValidationStatus::Warning.label(),
            ClientStatus::Error => ValidationStatus::Error.label(),
            ClientStatus::Pending => "Pendente",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientPanel {
    pub client: client::Model,
    pub latest_status: ClientStatus,
    /// Most recent validations, newest first
    pub recent: Vec<ValidationRecord>,
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub clients: Vec<ClientPanel>,
    pub latest_validations: Vec<ValidationRecord>,
}

/// Build the dashboard. Read-only.
pub async fn build_dashboard(db: &DatabaseConnection) -> Result<DashboardView, RepositoryError> {
    let validations = ValidationRepository::new(db);
    let clients = ClientRepository::new(db).list_active().await?;

    let mut panels = Vec::with_capacity(clients.len());
    for client in clients {
        let recent = ValidationQuery::recent()
            .for_client(client.id)
            .limit(db, CLIENT_RECENT_LIMIT)
            .await
            .map_err(RepositoryError::database_error)?;
        let recent = validations.resolve(recent).await?;

        let latest_status = recent
            .first()
            .map(|record| ClientStatus::from(record.validation.status))
            .unwrap_or(ClientStatus::Pending);

        panels.push(ClientPanel {
            client,
            latest_status,
            recent,
        });
    }

    let latest = ValidationQuery::recent()
        .limit(db, GLOBAL_RECENT_LIMIT)
        .await
        .map_err(RepositoryError::database_error)?;
    let latest_validations = validations.resolve(latest).await?;

    tracing::debug!(
        clients = panels.len(),
        latest = latest_validations.len(),
        "Built dashboard"
    );

    Ok(DashboardView {
        clients: panels,
        latest_validations,
    })
}
