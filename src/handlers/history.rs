//! # History Handler
//!
//! Paginated audit listing of every validation, driven by the shared filters.

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::filters::{PageWindow, ValidationFilter, ValidationFilterParams};
use crate::handlers::types::{ValidationDto, ValidationPage};
use crate::repositories::ValidationRepository;
use crate::server::AppState;

/// Page selector
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number; invalid values clamp to the nearest valid page
    pub page: Option<String>,
}

/// Paginated validation history
#[utoipa::path(
    get,
    path = "/history",
    security(("bearer_auth" = [])),
    params(ValidationFilterParams, PageParams),
    responses(
        (status = 200, description = "One page of validations", body = ValidationPage),
        (status = 400, description = "Malformed filter value", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "views"
)]
pub async fn history(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<ValidationFilterParams>,
    Query(page): Query<PageParams>,
) -> Result<Json<ValidationPage>, ApiError> {
    let filter = ValidationFilter::try_from(&params)?;
    let offset = state.config.display_offset();
    let query = filter.query(&offset);

    let total = query.count(&state.db).await?;
    let window = PageWindow::resolve(page.page.as_deref(), total, state.config.history_page_size);

    let rows = query
        .page(&state.db, window.number, window.page_size)
        .await?;
    let records = ValidationRepository::new(&state.db).resolve(rows).await?;

    Ok(Json(ValidationPage {
        items: ValidationDto::from_records(records, &offset),
        page: window,
        filter,
    }))
}
