//! # Validation Submission Handlers
//!
//! Recording a validation is scoped to a client: the form lists the client's
//! routines and the submission must pick one of them. The evidence file is
//! validated in memory and only written to disk once every field is valid.

use std::str::FromStr;

use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError, rejection::PathRejection},
    http::StatusCode,
    response::Json,
};
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::{ApiError, RepositoryError, internal_error, validation_error};
use crate::evidence::{ALLOWED_EXTENSIONS, MAX_EVIDENCE_BYTES, validate_evidence};
use crate::handlers::types::{Choice, ClientRef, ValidationDto};
use crate::models::ValidationStatus;
use crate::repositories::validation::NewValidation;
use crate::repositories::{BackupRoutineRepository, ClientRepository, ValidationRepository};
use crate::server::AppState;

/// Selectable routine in the submission form
#[derive(Debug, Serialize, ToSchema)]
pub struct RoutineChoice {
    pub id: i32,
    /// "<tool> - <description>"
    pub label: String,
}

/// Everything needed to render the submission form for one client
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationFormContext {
    pub client: ClientRef,
    pub routines: Vec<RoutineChoice>,
    pub statuses: Vec<Choice>,
    /// Accepted evidence extensions
    pub allowed_extensions: Vec<String>,
    pub max_evidence_bytes: usize,
}

/// Multipart body of a validation submission (documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ValidationSubmission {
    pub routine_id: i32,
    /// `success`, `warning` or `error`
    pub status: String,
    pub notes: Option<String>,
    #[schema(value_type = String, format = Binary)]
    pub evidence: Vec<u8>,
}

/// Form context for recording a validation
#[utoipa::path(
    get,
    path = "/clients/{client_id}/validations/new",
    security(("bearer_auth" = [])),
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Form context", body = ValidationFormContext),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "validations"
)]
pub async fn new_validation_form(
    State(state): State<AppState>,
    _user: CurrentUser,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<ValidationFormContext>, ApiError> {
    let Path(client_id) = path?;
    let client = ClientRepository::new(&state.db).require(client_id).await?;
    let routines = BackupRoutineRepository::new(&state.db)
        .for_client(client_id)
        .await?
        .into_iter()
        .map(|summary| RoutineChoice {
            id: summary.routine.id,
            label: summary.label(),
        })
        .collect();

    Ok(Json(ValidationFormContext {
        client: ClientRef::from(&client),
        routines,
        statuses: Choice::statuses(),
        allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        max_evidence_bytes: MAX_EVIDENCE_BYTES,
    }))
}

#[derive(Debug, Default)]
struct SubmissionForm {
    routine_id: Option<String>,
    status: Option<String>,
    notes: Option<String>,
    evidence: Option<(String, Vec<u8>)>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            "Request body too large",
        );
    }
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "INVALID_MULTIPART",
        "Malformed multipart body",
    )
    .with_details(serde_json::json!({ "reason": err.body_text() }))
}

async fn read_form(mut multipart: Multipart) -> Result<SubmissionForm, ApiError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("routine_id") => form.routine_id = Some(field.text().await.map_err(multipart_error)?),
            Some("status") => form.status = Some(field.text().await.map_err(multipart_error)?),
            Some("notes") => form.notes = Some(field.text().await.map_err(multipart_error)?),
            Some("evidence") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.evidence = Some((filename, bytes.to_vec()));
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Record a validation for one of the client's routines
#[utoipa::path(
    post,
    path = "/clients/{client_id}/validations",
    security(("bearer_auth" = [])),
    params(("client_id" = i32, Path, description = "Client ID")),
    request_body(content = ValidationSubmission, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Validation recorded", body = ValidationDto),
        (status = 400, description = "Invalid field or rejected evidence", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError),
        (status = 413, description = "Request body too large", body = ApiError)
    ),
    tag = "validations"
)]
pub async fn submit_validation(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<i32>, PathRejection>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ValidationDto>), ApiError> {
    let Path(client_id) = path?;
    ClientRepository::new(&state.db).require(client_id).await?;
    let form = read_form(multipart).await?;

    let mut errors = Map::new();
    let mut reject = |field: &str, message: String| {
        errors.entry(field.to_string()).or_insert(Value::String(message));
    };

    let routine_id = match present(form.routine_id.as_ref()) {
        None => {
            reject("routine_id", "This field is required".to_string());
            None
        }
        Some(raw) => match raw.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => {
                reject("routine_id", format!("Invalid routine id '{raw}'"));
                None
            }
        },
    };

    let status = match present(form.status.as_ref()) {
        None => {
            reject("status", "This field is required".to_string());
            None
        }
        Some(raw) => match ValidationStatus::from_str(raw) {
            Ok(status) => Some(status),
            Err(message) => {
                reject("status", message);
                None
            }
        },
    };

    let accepted = match &form.evidence {
        None => {
            reject("evidence", "This field is required".to_string());
            None
        }
        Some((filename, bytes)) => match validate_evidence(filename, bytes) {
            Ok(accepted) => Some(accepted),
            Err(err) => {
                tracing::warn!(
                    user_id = user.id,
                    filename = %filename,
                    size = bytes.len(),
                    reason = %err,
                    "Rejected evidence upload"
                );
                counter!("backup_evidence_rejected_total").increment(1);
                reject("evidence", err.to_string());
                None
            }
        },
    };

    if let Some(id) = routine_id {
        match BackupRoutineRepository::new(&state.db)
            .require_for_client(client_id, id)
            .await
        {
            Ok(_) => {}
            Err(RepositoryError::InvalidField { field, message }) => reject(field, message),
            Err(other) => return Err(other.into()),
        }
    }

    let (Some(routine_id), Some(status), Some(accepted), Some((_, bytes))) =
        (routine_id, status, accepted, form.evidence.as_ref())
    else {
        return Err(validation_error("Invalid submission", Value::Object(errors)));
    };
    if !errors.is_empty() {
        return Err(validation_error("Invalid submission", Value::Object(errors)));
    }

    let evidence_path = state
        .evidence
        .save(&accepted, bytes)
        .await
        .map_err(|err| internal_error("Failed to store evidence file", err))?;

    let repo = ValidationRepository::new(&state.db);
    let created = repo
        .create(NewValidation {
            routine_id,
            user_id: user.id,
            status,
            notes: form.notes.unwrap_or_default(),
            evidence_path: evidence_path.clone(),
        })
        .await;

    let validation = match created {
        Ok(validation) => validation,
        Err(err) => {
            if let Err(io_err) = state.evidence.remove(&evidence_path).await {
                tracing::error!(path = %evidence_path, error = %io_err, "Failed to remove orphaned evidence");
            }
            return Err(err.into());
        }
    };

    counter!("backup_validations_submitted_total", "status" => status.as_str()).increment(1);

    let record = repo.record(validation.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ValidationDto::from_record(record, &state.config.display_offset())),
    ))
}
