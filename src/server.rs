//! # Server Configuration
//!
//! Router assembly, shared state and the OpenAPI document for the Backup
//! Audit service.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{auth_middleware, require_staff};
use crate::config::AppConfig;
use crate::evidence::EvidenceStore;
use crate::handlers;
use crate::telemetry::{self, REQUEST_ID_HEADER};

/// Upper bound for any request body. Evidence itself is capped lower so
/// oversized files still reach the validator and get a field error.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub evidence: EvidenceStore,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let evidence = EvidenceStore::new(config.media_root.clone());
        Self {
            config: Arc::new(config),
            db,
            evidence,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            REQUEST_ID_HEADER.clone(),
        ])
        .expose_headers([header::CONTENT_DISPOSITION, REQUEST_ID_HEADER.clone()])
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let admin = handlers::admin::router().route_layer(middleware::from_fn(require_staff));

    let protected = Router::new()
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/history", get(handlers::history::history))
        .route("/reports", get(handlers::reports::report))
        .route("/reports/excel", get(handlers::reports::export_excel))
        .route("/reports/pdf", get(handlers::reports::export_pdf))
        .route(
            "/clients/{client_id}/validations/new",
            get(handlers::validations::new_validation_form),
        )
        .route(
            "/clients/{client_id}/validations",
            post(handlers::validations::submit_validation),
        )
        .route(
            "/api/servers-by-client",
            get(handlers::lookups::servers_by_client),
        )
        .route(
            "/api/client-routines/{client_id}",
            get(handlers::lookups::client_routines),
        )
        .nest("/admin", admin)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config.bind_addr().context("invalid server address")?;

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("creating media root {}", config.media_root.display()))?;

    tracing::info!(
        %addr,
        profile = %config.profile,
        media_root = %config.media_root.display(),
        "Starting Backup Audit API"
    );

    let app = create_app(AppState::new(config, db));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::dashboard::dashboard,
        crate::handlers::history::history,
        crate::handlers::reports::report,
        crate::handlers::reports::export_excel,
        crate::handlers::reports::export_pdf,
        crate::handlers::validations::new_validation_form,
        crate::handlers::validations::submit_validation,
        crate::handlers::lookups::servers_by_client,
        crate::handlers::lookups::client_routines,
        crate::handlers::admin::clients::list_clients,
        crate::handlers::admin::clients::get_client,
        crate::handlers::admin::clients::create_client,
        crate::handlers::admin::clients::update_client,
        crate::handlers::admin::clients::delete_client,
        crate::handlers::admin::clients::create_server,
        crate::handlers::admin::clients::update_server,
        crate::handlers::admin::clients::delete_server,
        crate::handlers::admin::tools::list_tools,
        crate::handlers::admin::tools::create_tool,
        crate::handlers::admin::tools::delete_tool,
        crate::handlers::admin::routines::list_routines,
        crate::handlers::admin::routines::get_routine,
        crate::handlers::admin::routines::create_routine,
        crate::handlers::admin::routines::update_routine,
        crate::handlers::admin::routines::delete_routine,
        crate::handlers::admin::validations::list_validations,
        crate::handlers::admin::validations::get_validation,
        crate::handlers::admin::validations::update_validation,
        crate::handlers::admin::validations::delete_validation,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::ValidationStatus,
            crate::models::Frequency,
            crate::error::ApiError,
            crate::filters::SortKey,
            crate::filters::ValidationFilter,
            crate::filters::PageWindow,
            crate::dashboard::ClientStatus,
            crate::handlers::HealthResponse,
            crate::handlers::types::Choice,
            crate::handlers::types::ClientDto,
            crate::handlers::types::ClientRef,
            crate::handlers::types::ServerDto,
            crate::handlers::types::ToolDto,
            crate::handlers::types::RoutineDto,
            crate::handlers::types::RoutineRef,
            crate::handlers::types::AuditDto,
            crate::handlers::types::ValidationDto,
            crate::handlers::types::ValidationPage,
            crate::handlers::dashboard::ClientPanelDto,
            crate::handlers::dashboard::DashboardResponse,
            crate::handlers::reports::ReportResponse,
            crate::handlers::validations::RoutineChoice,
            crate::handlers::validations::ValidationFormContext,
            crate::handlers::validations::ValidationSubmission,
            crate::handlers::lookups::ServerOption,
            crate::handlers::lookups::ServersByClientResponse,
            crate::handlers::lookups::ClientRoutinesResponse,
            crate::handlers::admin::clients::ClientRequest,
            crate::handlers::admin::clients::ServerRequest,
            crate::handlers::admin::clients::ClientDetail,
            crate::handlers::admin::tools::ToolRequest,
            crate::handlers::admin::routines::RoutineRequest,
            crate::handlers::admin::routines::RoutineDetailDto,
            crate::handlers::admin::validations::ValidationUpdateRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "views", description = "Dashboard and history"),
        (name = "reports", description = "Filtered reports and exports"),
        (name = "validations", description = "Recording backup validations"),
        (name = "lookups", description = "Dependent select data"),
        (name = "admin", description = "Staff-only administration"),
    ),
    info(
        title = "Backup Audit API",
        description = "Tracks manual validations of client backup routines",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
