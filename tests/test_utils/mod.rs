//! Test utilities for database and HTTP testing.
//!
//! Provides an in-memory SQLite database with all migrations applied,
//! fixture builders for the audit entities, and a router wired to a
//! temporary media root.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use backup_audit::{
    config::AppConfig,
    models::{
        Frequency, ValidationStatus, backup_routine, backup_tool, backup_validation, client,
        server, user,
    },
    repositories::{
        BackupRoutineRepository, BackupToolRepository, ClientRepository, UserRepository,
        backup_routine::RoutineInput,
        client::{ClientInput, ServerInput},
    },
    server::{AppState, create_app},
};
use chrono::{DateTime, NaiveTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

static TAX_ID_SEQ: AtomicU32 = AtomicU32::new(1);

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    // Each in-memory connection is its own database; keep exactly one alive.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Creates a user, returning it with its plaintext token.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    is_staff: bool,
) -> Result<(user::Model, String)> {
    Ok(UserRepository::new(db).create_user(username, is_staff).await?)
}

pub async fn create_client(
    db: &DatabaseConnection,
    trade_name: &str,
    active: bool,
) -> Result<client::Model> {
    let seq = TAX_ID_SEQ.fetch_add(1, Ordering::SeqCst);
    let client = ClientRepository::new(db)
        .create(ClientInput {
            legal_name: format!("{trade_name} Ltda"),
            trade_name: trade_name.to_string(),
            tax_id: format!("00.000.000/{seq:04}-00"),
            technical_contact: "Operador".to_string(),
            contact_email: "ti@example.com".to_string(),
            active,
        })
        .await?;
    Ok(client)
}

pub async fn create_server(
    db: &DatabaseConnection,
    client_id: i32,
    hostname: &str,
) -> Result<server::Model> {
    Ok(ClientRepository::new(db)
        .add_server(
            client_id,
            ServerInput {
                hostname: hostname.to_string(),
                ip_address: "10.0.0.10".to_string(),
                operating_system: "Debian 12".to_string(),
                description: format!("{hostname} description"),
            },
        )
        .await?)
}

pub async fn create_tool(db: &DatabaseConnection, name: &str) -> Result<backup_tool::Model> {
    Ok(BackupToolRepository::new(db).create(name).await?)
}

pub fn routine_input(
    client_id: Option<i32>,
    tool_id: i32,
    description: &str,
    server_ids: Vec<i32>,
) -> RoutineInput {
    RoutineInput {
        client_id,
        tool_id,
        description: description.to_string(),
        frequency: Frequency::Daily,
        execution_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
        retention_days: 30,
        server_ids,
    }
}

pub async fn create_routine(
    db: &DatabaseConnection,
    client_id: Option<i32>,
    tool_id: i32,
    description: &str,
    server_ids: Vec<i32>,
) -> Result<backup_routine::Model> {
    Ok(BackupRoutineRepository::new(db)
        .create(routine_input(client_id, tool_id, description, server_ids))
        .await?)
}

/// Inserts a validation with an explicit creation time.
pub async fn insert_validation(
    db: &DatabaseConnection,
    routine_id: i32,
    user_id: i32,
    status: ValidationStatus,
    created_at: DateTime<Utc>,
) -> Result<backup_validation::Model> {
    let model = backup_validation::ActiveModel {
        routine_id: Set(routine_id),
        user_id: Set(user_id),
        edited_by_id: Set(None),
        status: Set(status),
        notes: Set(String::new()),
        evidence_path: Set("evidencias/fixture.txt".to_string()),
        created_at: Set(created_at.into()),
        updated_at: Set(created_at.into()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// A fully wired router over a fresh database and a temporary media root.
pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub media: TempDir,
    pub staff: user::Model,
    pub staff_token: String,
    pub operator: user::Model,
    pub operator_token: String,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(mut config: AppConfig) -> Result<Self> {
        let db = setup_test_db().await?;
        let media = TempDir::new()?;
        config.media_root = media.path().to_path_buf();

        let (staff, staff_token) = create_user(&db, "admin", true).await?;
        let (operator, operator_token) = create_user(&db, "operador", false).await?;

        let router = create_app(AppState::new(config, db.clone()));

        Ok(Self {
            router,
            db,
            media,
            staff,
            staff_token,
            operator,
            operator_token,
        })
    }

    /// Sends a request and returns the status, headers and raw body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        (status, headers, bytes.to_vec())
    }

    /// Sends a request and parses the body as JSON (`Value::Null` when empty).
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("JSON body")
        };
        (status, value)
    }

    pub fn get(&self, uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("valid request")
    }

    pub fn json(&self, method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    pub fn delete(&self, uri: &str, token: &str) -> Request<Body> {
        Request::delete(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("valid request")
    }

    /// Files currently stored under the evidence directory.
    pub fn stored_evidence(&self) -> Vec<std::path::PathBuf> {
        let dir = self.media.path().join("evidencias");
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub const MULTIPART_BOUNDARY: &str = "backup-audit-test-boundary";

/// Builds a multipart/form-data body from text fields and an optional file.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

/// A minimal PNG: signature plus an IHDR chunk header.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R']);
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}
