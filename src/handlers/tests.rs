//! # Tests for Handlers
//!
//! Unit tests that call handlers directly, without the router.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;

use crate::config::AppConfig;
use crate::evidence::EvidenceStore;
use crate::handlers::{healthz, root};
use crate::models::ServiceInfo;
use crate::server::AppState;

fn state_with(db: DatabaseConnection) -> AppState {
    AppState {
        config: Arc::new(AppConfig::default()),
        db,
        evidence: EvidenceStore::new(std::env::temp_dir()),
    }
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "backup-audit");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_handler_returns_valid_json() {
    let Json(service_info) = root().await;

    let json_value: Value =
        serde_json::to_value(&service_info).expect("Failed to serialize ServiceInfo");

    assert_eq!(json_value["service"], "backup-audit");
    assert!(json_value.get("version").is_some());
}

#[test]
fn test_service_info_default() {
    let service_info = ServiceInfo::default();
    assert_eq!(service_info.service, "backup-audit");
}

#[tokio::test]
async fn test_healthz_reports_ok_for_live_database() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let Json(health) = healthz(State(state_with(db))).await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.database, "ok");
}
