//! Integration tests for the dashboard aggregate.

use anyhow::Result;
use backup_audit::dashboard::{ClientStatus, build_dashboard};
use backup_audit::models::ValidationStatus;
use chrono::{Duration, TimeZone, Utc};

#[path = "test_utils/mod.rs"]
mod test_utils;

#[tokio::test]
async fn clients_without_validations_are_pending() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    test_utils::create_client(&db, "Sem Rotinas", true).await?;

    let view = build_dashboard(&db).await?;

    assert_eq!(view.clients.len(), 1);
    assert_eq!(view.clients[0].latest_status, ClientStatus::Pending);
    assert_eq!(view.clients[0].latest_status.label(), "Pendente");
    assert!(view.clients[0].recent.is_empty());
    assert!(view.latest_validations.is_empty());
    Ok(())
}

#[tokio::test]
async fn panels_cover_active_clients_in_name_order() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    test_utils::create_client(&db, "zeta", true).await?;
    test_utils::create_client(&db, "Alpha", true).await?;
    test_utils::create_client(&db, "Inativo", false).await?;
    test_utils::create_client(&db, "beta", true).await?;

    let view = build_dashboard(&db).await?;
    let names: Vec<&str> = view
        .clients
        .iter()
        .map(|p| p.client.trade_name.as_str())
        .collect();

    assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    Ok(())
}

#[tokio::test]
async fn recent_lists_are_capped_and_newest_first() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let (user, _) = test_utils::create_user(&db, "operador", false).await?;
    let tool = test_utils::create_tool(&db, "Veeam").await?;
    let busy = test_utils::create_client(&db, "Busy", true).await?;
    let quiet = test_utils::create_client(&db, "Quiet", true).await?;
    let busy_routine = test_utils::create_routine(&db, Some(busy.id), tool.id, "Banco", vec![]).await?;
    let quiet_routine = test_utils::create_routine(&db, Some(quiet.id), tool.id, "Arquivos", vec![]).await?;

    let base = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let mut busy_ids = Vec::new();
    for i in 0..11 {
        let status = if i == 10 {
            ValidationStatus::Error
        } else {
            ValidationStatus::Success
        };
        let v = test_utils::insert_validation(&db, busy_routine.id, user.id, status, base + Duration::hours(i)).await?;
        busy_ids.push(v.id);
    }
    // Older than every busy validation.
    test_utils::insert_validation(
        &db,
        quiet_routine.id,
        user.id,
        ValidationStatus::Warning,
        base - Duration::days(1),
    )
    .await?;

    let view = build_dashboard(&db).await?;

    let busy_panel = &view.clients[0];
    assert_eq!(busy_panel.client.id, busy.id);
    assert_eq!(busy_panel.latest_status, ClientStatus::Error);
    let recent: Vec<i32> = busy_panel.recent.iter().map(|r| r.validation.id).collect();
    let expected: Vec<i32> = busy_ids.iter().rev().take(5).copied().collect();
    assert_eq!(recent, expected);
    assert!(busy_panel.recent.iter().all(|r| r.tool_name == "Veeam"));

    let quiet_panel = &view.clients[1];
    assert_eq!(quiet_panel.latest_status, ClientStatus::Warning);
    assert_eq!(quiet_panel.recent.len(), 1);

    let global: Vec<i32> = view.latest_validations.iter().map(|r| r.validation.id).collect();
    let expected_global: Vec<i32> = busy_ids.iter().rev().take(10).copied().collect();
    assert_eq!(global, expected_global);
    Ok(())
}
