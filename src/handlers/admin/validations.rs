//! Validation administration: searchable listing with audit info, edits that
//! stamp the acting admin, and deletion together with the evidence file.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::CurrentUser;
use crate::error::{ApiError, field_error};
use crate::filters::{PageWindow, ValidationFilter, ValidationFilterParams};
use crate::handlers::admin::optional_id;
use crate::handlers::history::PageParams;
use crate::handlers::types::{ValidationDto, ValidationPage};
use crate::models::ValidationStatus;
use crate::repositories::ValidationRepository;
use crate::repositories::validation::{AdminValidationFilter, ValidationUpdate};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminValidationParams {
    /// Matches routine description, validator username or client trade name
    pub search: Option<String>,
    pub tool_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidationUpdateRequest {
    /// `success`, `warning` or `error`
    #[schema(example = "warning")]
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

#[utoipa::path(
    get,
    path = "/admin/validations",
    security(("bearer_auth" = [])),
    params(ValidationFilterParams, AdminValidationParams, PageParams),
    responses(
        (status = 200, description = "One page of validations with audit info", body = ValidationPage),
        (status = 400, description = "Malformed filter value", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_validations(
    State(state): State<AppState>,
    Query(params): Query<ValidationFilterParams>,
    Query(admin): Query<AdminValidationParams>,
    Query(page): Query<PageParams>,
) -> Result<Json<ValidationPage>, ApiError> {
    let criteria = AdminValidationFilter {
        filter: ValidationFilter::try_from(&params)?,
        tool_id: optional_id("tool_id", admin.tool_id.as_deref())?,
        search: admin.search,
    };
    let offset = state.config.display_offset();
    let repo = ValidationRepository::new(&state.db);
    let query = repo.admin_query(&criteria, &offset);

    let total = query.count(&state.db).await?;
    let window = PageWindow::resolve(page.page.as_deref(), total, state.config.history_page_size);
    let rows = query
        .page(&state.db, window.number, window.page_size)
        .await?;
    let records = repo.resolve(rows).await?;

    Ok(Json(ValidationPage {
        items: ValidationDto::from_records(records, &offset),
        page: window,
        filter: criteria.filter,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/validations/{validation_id}",
    security(("bearer_auth" = [])),
    params(("validation_id" = i32, Path, description = "Validation ID")),
    responses(
        (status = 200, description = "Validation with audit info", body = ValidationDto),
        (status = 404, description = "Validation not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn get_validation(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<ValidationDto>, ApiError> {
    let Path(validation_id) = path?;
    let record = ValidationRepository::new(&state.db)
        .record(validation_id)
        .await?;
    Ok(Json(ValidationDto::from_record(
        record,
        &state.config.display_offset(),
    )))
}

/// Edit status and notes; the acting admin is recorded as editor
#[utoipa::path(
    put,
    path = "/admin/validations/{validation_id}",
    security(("bearer_auth" = [])),
    params(("validation_id" = i32, Path, description = "Validation ID")),
    request_body = ValidationUpdateRequest,
    responses(
        (status = 200, description = "Validation updated", body = ValidationDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Validation not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_validation(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<ValidationUpdateRequest>, JsonRejection>,
) -> Result<Json<ValidationDto>, ApiError> {
    let Path(validation_id) = path?;
    let Json(request) = payload?;
    let status =
        ValidationStatus::from_str(&request.status).map_err(|msg| field_error("status", &msg))?;

    let repo = ValidationRepository::new(&state.db);
    repo.update(
        validation_id,
        ValidationUpdate {
            status,
            notes: request.notes,
        },
        user.id,
    )
    .await?;

    let record = repo.record(validation_id).await?;
    Ok(Json(ValidationDto::from_record(
        record,
        &state.config.display_offset(),
    )))
}

#[utoipa::path(
    delete,
    path = "/admin/validations/{validation_id}",
    security(("bearer_auth" = [])),
    params(("validation_id" = i32, Path, description = "Validation ID")),
    responses(
        (status = 204, description = "Validation and evidence deleted"),
        (status = 404, description = "Validation not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_validation(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(validation_id) = path?;
    let evidence_path = ValidationRepository::new(&state.db)
        .delete(validation_id)
        .await?;

    if let Err(err) = state.evidence.remove(&evidence_path).await {
        tracing::warn!(path = %evidence_path, error = %err, "Failed to remove evidence file");
    }

    tracing::info!(validation_id, admin = %user.username, "Validation deleted");
    Ok(StatusCode::NO_CONTENT)
}
