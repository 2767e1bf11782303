//! # Report Handlers
//!
//! The filtered report listing and its XLSX and PDF downloads. All three
//! endpoints accept the same filter parameters and produce the same rows in
//! the same order.

use axum::{
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::{ApiError, internal_error};
use crate::filters::{ValidationFilter, ValidationFilterParams};
use crate::handlers::types::{Choice, ClientRef, ValidationDto};
use crate::repositories::client::ClientListFilter;
use crate::repositories::{ClientRepository, ValidationRepository};
use crate::reports::{
    self, EXCEL_CONTENT_TYPE, PDF_CONTENT_TYPE, ReportError, ReportMeta, describe_filter,
    export_filename,
};
use crate::server::AppState;

/// Filtered listing with the choices needed to build the filter form
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub items: Vec<ValidationDto>,
    pub total: usize,
    pub filter: ValidationFilter,
    pub clients: Vec<ClientRef>,
    pub statuses: Vec<Choice>,
    pub sort_keys: Vec<Choice>,
}

/// Filtered validation list for reporting
#[utoipa::path(
    get,
    path = "/reports",
    security(("bearer_auth" = [])),
    params(ValidationFilterParams),
    responses(
        (status = 200, description = "Every validation matching the filter", body = ReportResponse),
        (status = 400, description = "Malformed filter value", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn report(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<ValidationFilterParams>,
) -> Result<Json<ReportResponse>, ApiError> {
    let filter = ValidationFilter::try_from(&params)?;
    let offset = state.config.display_offset();

    let rows = filter.query(&offset).all(&state.db).await?;
    let records = ValidationRepository::new(&state.db).resolve(rows).await?;
    let items = ValidationDto::from_records(records, &offset);

    let clients = ClientRepository::new(&state.db)
        .list(&ClientListFilter::default())
        .await?
        .iter()
        .map(ClientRef::from)
        .collect();

    Ok(Json(ReportResponse {
        total: items.len(),
        items,
        filter,
        clients,
        statuses: Choice::statuses(),
        sort_keys: Choice::sort_keys(),
    }))
}

/// Download the filtered report as an XLSX workbook
#[utoipa::path(
    get,
    path = "/reports/excel",
    security(("bearer_auth" = [])),
    params(ValidationFilterParams),
    responses(
        (status = 200, description = "XLSX attachment", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Malformed filter value", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Rendering failed", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn export_excel(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ValidationFilterParams>,
) -> Result<Response, ApiError> {
    let filter = ValidationFilter::try_from(&params)?;
    let offset = state.config.display_offset();

    let bytes = async {
        let rows = reports::collect_rows(&state.db, &filter, &offset).await?;
        reports::excel::render(&rows)
    }
    .await
    .map_err(|err| export_failed("excel", err))?;

    let filename = export_filename(Utc::now().with_timezone(&offset).date_naive(), "xlsx");
    tracing::info!(user_id = user.id, filename = %filename, size = bytes.len(), "Excel report generated");
    counter!("backup_reports_exported_total", "format" => "excel").increment(1);

    Ok(attachment(bytes, EXCEL_CONTENT_TYPE, &filename))
}

/// Download the filtered report as a PDF document
#[utoipa::path(
    get,
    path = "/reports/pdf",
    security(("bearer_auth" = [])),
    params(ValidationFilterParams),
    responses(
        (status = 200, description = "PDF attachment", content_type = "application/pdf"),
        (status = 400, description = "Malformed filter value", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Rendering failed", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn export_pdf(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ValidationFilterParams>,
) -> Result<Response, ApiError> {
    let filter = ValidationFilter::try_from(&params)?;
    let offset = state.config.display_offset();
    let now = Utc::now().with_timezone(&offset);

    let bytes = async {
        let client_name = match filter.client_id {
            Some(id) => ClientRepository::new(&state.db)
                .get(id)
                .await?
                .map(|c| c.trade_name),
            None => None,
        };
        let meta = ReportMeta::new(now, describe_filter(&filter, client_name.as_deref()));
        let rows = reports::collect_rows(&state.db, &filter, &offset).await?;
        reports::pdf::render(&rows, &meta)
    }
    .await
    .map_err(|err| export_failed("pdf", err))?;

    let filename = export_filename(now.date_naive(), "pdf");
    tracing::info!(user_id = user.id, filename = %filename, size = bytes.len(), "PDF report generated");
    counter!("backup_reports_exported_total", "format" => "pdf").increment(1);

    Ok(attachment(bytes, PDF_CONTENT_TYPE, &filename))
}

fn export_failed(format: &'static str, err: ReportError) -> ApiError {
    counter!("backup_report_failures_total", "format" => format).increment(1);
    internal_error("Report generation failed", err)
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
