//! Client and server administration.

use axum::{
    extract::{Path, Query, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::CurrentUser;
use crate::error::{ApiError, field_error};
use crate::handlers::types::{ClientDto, ServerDto};
use crate::repositories::ClientRepository;
use crate::repositories::client::{ClientInput, ClientListFilter, ServerInput};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientListParams {
    /// Matches trade name, legal name or tax id
    pub search: Option<String>,
    /// `true` or `false`
    pub active: Option<String>,
}

/// Writable client fields
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClientRequest {
    #[schema(example = "Acme Indústria e Comércio Ltda")]
    pub legal_name: String,
    #[schema(example = "Acme")]
    pub trade_name: String,
    #[schema(example = "12.345.678/0001-90")]
    pub tax_id: String,
    pub technical_contact: String,
    pub contact_email: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl From<ClientRequest> for ClientInput {
    fn from(req: ClientRequest) -> Self {
        Self {
            legal_name: req.legal_name,
            trade_name: req.trade_name,
            tax_id: req.tax_id,
            technical_contact: req.technical_contact,
            contact_email: req.contact_email,
            active: req.active,
        }
    }
}

/// Writable server fields
#[derive(Debug, Deserialize, ToSchema)]
pub struct ServerRequest {
    #[schema(example = "srv-db01")]
    pub hostname: String,
    #[schema(example = "10.0.0.12")]
    pub ip_address: String,
    #[schema(example = "Debian 12")]
    pub operating_system: String,
    #[serde(default)]
    pub description: String,
}

impl From<ServerRequest> for ServerInput {
    fn from(req: ServerRequest) -> Self {
        Self {
            hostname: req.hostname,
            ip_address: req.ip_address,
            operating_system: req.operating_system,
            description: req.description,
        }
    }
}

/// A client with its servers inline
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: ClientDto,
    pub servers: Vec<ServerDto>,
}

fn parse_active(raw: Option<&str>) -> Result<Option<bool>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(field_error("active", "Use true or false")),
        },
    }
}

#[utoipa::path(
    get,
    path = "/admin/clients",
    security(("bearer_auth" = [])),
    params(ClientListParams),
    responses(
        (status = 200, description = "Clients ordered by trade name", body = Vec<ClientDto>),
        (status = 403, description = "Staff access required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<ClientListParams>,
) -> Result<Json<Vec<ClientDto>>, ApiError> {
    let filter = ClientListFilter {
        search: params.search,
        active: parse_active(params.active.as_deref())?,
    };

    let clients = ClientRepository::new(&state.db).list(&filter).await?;
    Ok(Json(clients.into_iter().map(ClientDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/admin/clients/{client_id}",
    security(("bearer_auth" = [])),
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client with its servers", body = ClientDetail),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn get_client(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<ClientDetail>, ApiError> {
    let Path(client_id) = path?;
    let repo = ClientRepository::new(&state.db);
    let client = repo.require(client_id).await?;
    let servers = repo.servers(client_id).await?;

    Ok(Json(ClientDetail {
        client: client.into(),
        servers: servers.into_iter().map(ServerDto::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/admin/clients",
    security(("bearer_auth" = [])),
    request_body = ClientRequest,
    responses(
        (status = 201, description = "Client created", body = ClientDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Tax id already registered", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_client(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClientDto>), ApiError> {
    let Json(request) = payload?;
    let client = ClientRepository::new(&state.db).create(request.into()).await?;

    tracing::info!(client_id = client.id, admin = %user.username, "Client created");
    Ok((StatusCode::CREATED, Json(client.into())))
}

#[utoipa::path(
    put,
    path = "/admin/clients/{client_id}",
    security(("bearer_auth" = [])),
    params(("client_id" = i32, Path, description = "Client ID")),
    request_body = ClientRequest,
    responses(
        (status = 200, description = "Client updated", body = ClientDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError),
        (status = 409, description = "Tax id already registered", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_client(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Result<Json<ClientDto>, ApiError> {
    let Path(client_id) = path?;
    let Json(request) = payload?;
    let client = ClientRepository::new(&state.db)
        .update(client_id, request.into())
        .await?;
    Ok(Json(client.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/clients/{client_id}",
    security(("bearer_auth" = [])),
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(client_id) = path?;
    ClientRepository::new(&state.db).delete(client_id).await?;
    tracing::info!(client_id, admin = %user.username, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/clients/{client_id}/servers",
    security(("bearer_auth" = [])),
    params(("client_id" = i32, Path, description = "Client ID")),
    request_body = ServerRequest,
    responses(
        (status = 201, description = "Server created", body = ServerDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_server(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<ServerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ServerDto>), ApiError> {
    let Path(client_id) = path?;
    let Json(request) = payload?;
    let server = ClientRepository::new(&state.db)
        .add_server(client_id, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(server.into())))
}

#[utoipa::path(
    put,
    path = "/admin/servers/{server_id}",
    security(("bearer_auth" = [])),
    params(("server_id" = i32, Path, description = "Server ID")),
    request_body = ServerRequest,
    responses(
        (status = 200, description = "Server updated", body = ServerDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Server not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_server(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<ServerRequest>, JsonRejection>,
) -> Result<Json<ServerDto>, ApiError> {
    let Path(server_id) = path?;
    let Json(request) = payload?;
    let server = ClientRepository::new(&state.db)
        .update_server(server_id, request.into())
        .await?;
    Ok(Json(server.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/servers/{server_id}",
    security(("bearer_auth" = [])),
    params(("server_id" = i32, Path, description = "Server ID")),
    responses(
        (status = 204, description = "Server deleted"),
        (status = 404, description = "Server not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_server(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(server_id) = path?;
    ClientRepository::new(&state.db).delete_server(server_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
