//! # Lookup Endpoints
//!
//! Small JSON lists used to populate dependent form selects.

use axum::{
    extract::{Path, Query, State, rejection::PathRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::CurrentUser;
use crate::error::{ApiError, field_error};
use crate::handlers::validations::RoutineChoice;
use crate::repositories::{BackupRoutineRepository, ClientRepository};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ServersByClientParams {
    /// Client ID; absent or empty yields an empty list
    pub cliente_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServerOption {
    pub id: i32,
    pub hostname: String,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServersByClientResponse {
    pub servers: Vec<ServerOption>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientRoutinesResponse {
    pub routines: Vec<RoutineChoice>,
}

/// Servers owned by a client
#[utoipa::path(
    get,
    path = "/api/servers-by-client",
    security(("bearer_auth" = [])),
    params(ServersByClientParams),
    responses(
        (status = 200, description = "Servers of the client", body = ServersByClientResponse),
        (status = 400, description = "Malformed client id", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn servers_by_client(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<ServersByClientParams>,
) -> Result<Json<ServersByClientResponse>, ApiError> {
    let Some(raw) = params
        .cliente_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return Ok(Json(ServersByClientResponse { servers: Vec::new() }));
    };

    let client_id: i32 = raw
        .parse()
        .map_err(|_| field_error("cliente_id", "Invalid client id"))?;

    let servers = ClientRepository::new(&state.db)
        .servers(client_id)
        .await?
        .into_iter()
        .map(|s| ServerOption {
            id: s.id,
            hostname: s.hostname,
            description: s.description,
        })
        .collect();

    Ok(Json(ServersByClientResponse { servers }))
}

/// Routines that validations can be recorded against for a client
#[utoipa::path(
    get,
    path = "/api/client-routines/{client_id}",
    security(("bearer_auth" = [])),
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Routines of the client", body = ClientRoutinesResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn client_routines(
    State(state): State<AppState>,
    _user: CurrentUser,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<ClientRoutinesResponse>, ApiError> {
    let Path(client_id) = path?;
    ClientRepository::new(&state.db).require(client_id).await?;

    let routines = BackupRoutineRepository::new(&state.db)
        .for_client(client_id)
        .await?
        .into_iter()
        .map(|summary| RoutineChoice {
            id: summary.routine.id,
            label: summary.label(),
        })
        .collect();

    Ok(Json(ClientRoutinesResponse { routines }))
}
