//! # Dashboard Handler

use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::dashboard::{ClientStatus, build_dashboard};
use crate::error::ApiError;
use crate::handlers::types::{ClientRef, ValidationDto};
use crate::server::AppState;

/// One client panel on the dashboard
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientPanelDto {
    pub client: ClientRef,
    /// Status of the most recent validation, or `pending`
    pub latest_status: ClientStatus,
    pub latest_status_label: String,
    /// Up to five most recent validations, newest first
    pub recent: Vec<ValidationDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub clients: Vec<ClientPanelDto>,
    /// Ten most recent validations system-wide
    pub latest_validations: Vec<ValidationDto>,
}

/// Active clients with their latest status and recent validations
#[utoipa::path(
    get,
    path = "/dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard aggregate", body = DashboardResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "views"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let offset = state.config.display_offset();
    let view = build_dashboard(&state.db).await?;

    let clients = view
        .clients
        .into_iter()
        .map(|panel| ClientPanelDto {
            client: ClientRef::from(&panel.client),
            latest_status: panel.latest_status,
            latest_status_label: panel.latest_status.label().to_string(),
            recent: ValidationDto::from_records(panel.recent, &offset),
        })
        .collect();

    Ok(Json(DashboardResponse {
        clients,
        latest_validations: ValidationDto::from_records(view.latest_validations, &offset),
    }))
}
