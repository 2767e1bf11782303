//! Backup routine administration.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, field_error};
use crate::handlers::admin::optional_id;
use crate::handlers::types::{RoutineDto, ServerDto};
use crate::models::Frequency;
use crate::repositories::BackupRoutineRepository;
use crate::repositories::backup_routine::{RoutineInput, RoutineListFilter};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoutineListParams {
    pub client_id: Option<String>,
    pub tool_id: Option<String>,
    /// `daily`, `weekly` or `monthly`
    pub frequency: Option<String>,
    /// Matches description, tool name or client trade name
    pub search: Option<String>,
}

/// Writable routine fields
#[derive(Debug, Deserialize, ToSchema)]
pub struct RoutineRequest {
    /// Inferred from the servers when omitted
    pub client_id: Option<i32>,
    pub tool_id: i32,
    #[schema(example = "Banco ERP")]
    pub description: String,
    #[schema(example = "daily")]
    pub frequency: String,
    /// `HH:MM` or `HH:MM:SS`
    #[schema(example = "23:30")]
    pub execution_time: String,
    #[schema(example = 30)]
    pub retention_days: i32,
    #[serde(default)]
    pub server_ids: Vec<i32>,
}

fn parse_execution_time(raw: &str) -> Result<NaiveTime, ApiError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| field_error("execution_time", "Use HH:MM or HH:MM:SS"))
}

impl TryFrom<RoutineRequest> for RoutineInput {
    type Error = ApiError;

    fn try_from(req: RoutineRequest) -> Result<Self, Self::Error> {
        let frequency =
            Frequency::from_str(&req.frequency).map_err(|msg| field_error("frequency", &msg))?;
        let execution_time = parse_execution_time(&req.execution_time)?;

        Ok(Self {
            client_id: req.client_id,
            tool_id: req.tool_id,
            description: req.description,
            frequency,
            execution_time,
            retention_days: req.retention_days,
            server_ids: req.server_ids,
        })
    }
}

/// A routine with its servers
#[derive(Debug, Serialize, ToSchema)]
pub struct RoutineDetailDto {
    #[serde(flatten)]
    pub routine: RoutineDto,
    pub servers: Vec<ServerDto>,
}

#[utoipa::path(
    get,
    path = "/admin/routines",
    security(("bearer_auth" = [])),
    params(RoutineListParams),
    responses(
        (status = 200, description = "Routines with server counts", body = Vec<RoutineDto>),
        (status = 400, description = "Malformed filter value", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_routines(
    State(state): State<AppState>,
    Query(params): Query<RoutineListParams>,
) -> Result<Json<Vec<RoutineDto>>, ApiError> {
    let frequency = match params.frequency.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => None,
        Some(raw) => Some(Frequency::from_str(raw).map_err(|msg| field_error("frequency", &msg))?),
    };

    let filter = RoutineListFilter {
        client_id: optional_id("client_id", params.client_id.as_deref())?,
        tool_id: optional_id("tool_id", params.tool_id.as_deref())?,
        frequency,
        search: params.search,
    };

    let routines = BackupRoutineRepository::new(&state.db).list(&filter).await?;
    Ok(Json(routines.into_iter().map(RoutineDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/admin/routines/{routine_id}",
    security(("bearer_auth" = [])),
    params(("routine_id" = i32, Path, description = "Routine ID")),
    responses(
        (status = 200, description = "Routine with its servers", body = RoutineDetailDto),
        (status = 404, description = "Routine not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn get_routine(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<RoutineDetailDto>, ApiError> {
    let Path(routine_id) = path?;
    respond_with_detail(&BackupRoutineRepository::new(&state.db), routine_id).await
}

async fn respond_with_detail(
    repo: &BackupRoutineRepository<'_>,
    routine_id: i32,
) -> Result<Json<RoutineDetailDto>, ApiError> {
    let detail = repo.detail(routine_id).await?;
    Ok(Json(RoutineDetailDto {
        routine: detail.summary.into(),
        servers: detail.servers.into_iter().map(ServerDto::from).collect(),
    }))
}

/// Create a routine; its client is inferred from the servers when omitted
#[utoipa::path(
    post,
    path = "/admin/routines",
    security(("bearer_auth" = [])),
    request_body = RoutineRequest,
    responses(
        (status = 201, description = "Routine created", body = RoutineDetailDto),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_routine(
    State(state): State<AppState>,
    payload: Result<Json<RoutineRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoutineDetailDto>), ApiError> {
    let Json(request) = payload?;
    let input = RoutineInput::try_from(request)?;

    let repo = BackupRoutineRepository::new(&state.db);
    let routine = repo.create(input).await?;
    Ok((StatusCode::CREATED, respond_with_detail(&repo, routine.id).await?))
}

#[utoipa::path(
    put,
    path = "/admin/routines/{routine_id}",
    security(("bearer_auth" = [])),
    params(("routine_id" = i32, Path, description = "Routine ID")),
    request_body = RoutineRequest,
    responses(
        (status = 200, description = "Routine updated", body = RoutineDetailDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Routine not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_routine(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<RoutineRequest>, JsonRejection>,
) -> Result<Json<RoutineDetailDto>, ApiError> {
    let Path(routine_id) = path?;
    let Json(request) = payload?;
    let input = RoutineInput::try_from(request)?;

    let repo = BackupRoutineRepository::new(&state.db);
    repo.update(routine_id, input).await?;
    respond_with_detail(&repo, routine_id).await
}

/// Delete a routine together with its validations
#[utoipa::path(
    delete,
    path = "/admin/routines/{routine_id}",
    security(("bearer_auth" = [])),
    params(("routine_id" = i32, Path, description = "Routine ID")),
    responses(
        (status = 204, description = "Routine deleted"),
        (status = 404, description = "Routine not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_routine(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(routine_id) = path?;
    BackupRoutineRepository::new(&state.db)
        .delete(routine_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_time_accepts_minutes_and_seconds() {
        assert_eq!(
            parse_execution_time("23:30").unwrap(),
            NaiveTime::from_hms_opt(23, 30, 0).unwrap()
        );
        assert_eq!(
            parse_execution_time("01:02:03").unwrap(),
            NaiveTime::from_hms_opt(1, 2, 3).unwrap()
        );
        assert!(parse_execution_time("25:00").is_err());
        assert!(parse_execution_time("noon").is_err());
    }
}
