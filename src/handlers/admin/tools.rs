//! Backup tool administration.

use axum::{
    extract::{Path, Query, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::handlers::types::ToolDto;
use crate::repositories::BackupToolRepository;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ToolListParams {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ToolRequest {
    #[schema(example = "Veeam")]
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/admin/tools",
    security(("bearer_auth" = [])),
    params(ToolListParams),
    responses(
        (status = 200, description = "Tools ordered by name", body = Vec<ToolDto>),
        (status = 403, description = "Staff access required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_tools(
    State(state): State<AppState>,
    Query(params): Query<ToolListParams>,
) -> Result<Json<Vec<ToolDto>>, ApiError> {
    let tools = BackupToolRepository::new(&state.db)
        .list(params.search.as_deref())
        .await?;
    Ok(Json(tools.into_iter().map(ToolDto::from).collect()))
}

#[utoipa::path(
    post,
    path = "/admin/tools",
    security(("bearer_auth" = [])),
    request_body = ToolRequest,
    responses(
        (status = 201, description = "Tool created", body = ToolDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Tool name already exists", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_tool(
    State(state): State<AppState>,
    payload: Result<Json<ToolRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ToolDto>), ApiError> {
    let Json(request) = payload?;
    let tool = BackupToolRepository::new(&state.db)
        .create(&request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(tool.into())))
}

/// Delete a tool; refused while any routine uses it
#[utoipa::path(
    delete,
    path = "/admin/tools/{tool_id}",
    security(("bearer_auth" = [])),
    params(("tool_id" = i32, Path, description = "Tool ID")),
    responses(
        (status = 204, description = "Tool deleted"),
        (status = 404, description = "Tool not found", body = ApiError),
        (status = 409, description = "Tool is used by a routine", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_tool(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(tool_id) = path?;
    BackupToolRepository::new(&state.db).delete(tool_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
