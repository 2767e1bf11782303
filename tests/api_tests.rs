//! HTTP-level tests for the operator-facing endpoints.

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use std::io::{Cursor, Read};

use backup_audit::config::AppConfig;
use backup_audit::filters::{ValidationFilter, ValidationFilterParams};
use backup_audit::models::ValidationStatus;
use backup_audit::reports::{self, MISSING};
use chrono::{Duration, TimeZone, Utc};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{TestApp, multipart_body, multipart_request, png_bytes};

struct Scenario {
    app: TestApp,
    client_id: i32,
    other_client_id: i32,
    routine_id: i32,
    other_routine_id: i32,
}

async fn scenario() -> Result<Scenario> {
    let app = TestApp::new().await?;
    let tool = test_utils::create_tool(&app.db, "Veeam").await?;
    let client = test_utils::create_client(&app.db, "Acme", true).await?;
    let other = test_utils::create_client(&app.db, "Globex", true).await?;
    let server = test_utils::create_server(&app.db, client.id, "srv-db01").await?;
    let routine =
        test_utils::create_routine(&app.db, Some(client.id), tool.id, "Banco ERP", vec![server.id]).await?;
    let other_routine =
        test_utils::create_routine(&app.db, Some(other.id), tool.id, "Arquivos", vec![]).await?;

    Ok(Scenario {
        app,
        client_id: client.id,
        other_client_id: other.id,
        routine_id: routine.id,
        other_routine_id: other_routine.id,
    })
}

#[tokio::test]
async fn public_routes_do_not_need_a_token() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app
        .send_json(Request::get("/").body(Body::empty())?)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "backup-audit");

    let (status, body) = app
        .send_json(Request::get("/healthz").body(Body::empty())?)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app
        .send_json(Request::get("/dashboard").body(Body::empty())?)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.send_json(app.get("/dashboard", "not-a-real-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send_json(app.get("/dashboard", &app.operator_token)).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn request_id_is_echoed() -> Result<()> {
    let app = TestApp::new().await?;
    let request = Request::get("/")
        .header("x-request-id", "corr-test-1")
        .body(Body::empty())?;

    let (_, headers, _) = app.send(request).await;
    assert_eq!(headers.get("x-request-id").unwrap(), "corr-test-1");
    Ok(())
}

#[tokio::test]
async fn form_context_lists_only_the_clients_routines() -> Result<()> {
    let s = scenario().await?;
    let uri = format!("/clients/{}/validations/new", s.client_id);

    let (status, body) = s.app.send_json(s.app.get(&uri, &s.app.operator_token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client"]["trade_name"], "Acme");
    let routines = body["routines"].as_array().unwrap();
    assert_eq!(routines.len(), 1);
    assert_eq!(routines[0]["id"], s.routine_id);
    assert_eq!(routines[0]["label"], "Veeam - Banco ERP");
    assert_eq!(body["statuses"].as_array().unwrap().len(), 3);

    let (status, body) = s
        .app
        .send_json(s.app.get("/clients/9999/validations/new", &s.app.operator_token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn submission_stores_evidence_and_returns_resolved_validation() -> Result<()> {
    let s = scenario().await?;
    let routine_id = s.routine_id.to_string();
    let body = multipart_body(
        &[
            ("routine_id", routine_id.as_str()),
            ("status", "success"),
            ("notes", "Restore testado"),
        ],
        Some(("evidence", "Print.PNG", png_bytes().as_slice())),
    );
    let uri = format!("/clients/{}/validations", s.client_id);

    let (status, json) = s
        .app
        .send_json(multipart_request(&uri, &s.app.operator_token, body))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["status"], "success");
    assert_eq!(json["status_label"], "Sucesso");
    assert_eq!(json["notes"], "Restore testado");
    assert_eq!(json["client"]["trade_name"], "Acme");
    assert_eq!(json["server_hostname"], "srv-db01");
    assert_eq!(json["tool_name"], "Veeam");
    assert_eq!(json["validator"], "operador");
    assert_eq!(json["audit"]["edited"], false);

    let evidence_path = json["evidence_path"].as_str().unwrap();
    assert!(evidence_path.starts_with("evidencias/"));
    assert!(evidence_path.ends_with(".png"));

    let stored = s.app.stored_evidence();
    assert_eq!(stored.len(), 1);
    assert_eq!(std::fs::read(&stored[0])?, png_bytes());
    Ok(())
}

#[tokio::test]
async fn rejected_evidence_leaves_nothing_on_disk() -> Result<()> {
    let s = scenario().await?;
    let routine_id = s.routine_id.to_string();
    let uri = format!("/clients/{}/validations", s.client_id);

    let mut elf = vec![0x7F, b'E', b'L', b'F', 0x02, 0x01, 0x01, 0x00];
    elf.resize(256, 0);
    let mut oversized = png_bytes();
    oversized.resize(10 * 1024 * 1024, 0);

    let cases: [(&str, Vec<u8>, &str); 3] = [
        ("foto.png", elf, "not allowed"),
        ("foto.png", oversized, "5 MB"),
        ("script.sh", b"#!/bin/sh\necho hi\n".to_vec(), "extension"),
    ];

    for (filename, bytes, expected) in cases {
        let body = multipart_body(
            &[("routine_id", routine_id.as_str()), ("status", "error")],
            Some(("evidence", filename, bytes.as_slice())),
        );
        let (status, json) = s
            .app
            .send_json(multipart_request(&uri, &s.app.operator_token, body))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{filename}: {json}");
        assert_eq!(json["code"], "VALIDATION_FAILED");
        let message = json["details"]["evidence"].as_str().unwrap();
        assert!(message.contains(expected), "{message}");
    }

    assert!(s.app.stored_evidence().is_empty());
    Ok(())
}

#[tokio::test]
async fn submission_field_errors() -> Result<()> {
    let s = scenario().await?;
    let uri = format!("/clients/{}/validations", s.client_id);

    let (status, json) = s
        .app
        .send_json(multipart_request(&uri, &s.app.operator_token, multipart_body(&[], None)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["routine_id", "status", "evidence"] {
        assert!(json["details"][field].is_string(), "missing error for {field}");
    }

    let foreign = s.other_routine_id.to_string();
    let body = multipart_body(
        &[("routine_id", foreign.as_str()), ("status", "warning")],
        Some(("evidence", "log.txt", &b"backup ok\n"[..])),
    );
    let (status, json) = s
        .app
        .send_json(multipart_request(&uri, &s.app.operator_token, body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["details"]["routine_id"].is_string());
    assert!(json["details"].get("evidence").is_none());

    assert!(s.app.stored_evidence().is_empty());
    Ok(())
}

#[tokio::test]
async fn submission_to_unknown_client_is_not_found() -> Result<()> {
    let s = scenario().await?;
    let routine_id = s.routine_id.to_string();
    let body = multipart_body(
        &[("routine_id", routine_id.as_str()), ("status", "success")],
        Some(("evidence", "log.txt", &b"ok\n"[..])),
    );

    let (status, _) = s
        .app
        .send_json(multipart_request("/clients/4242/validations", &s.app.operator_token, body))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn history_paginates_and_clamps_pages() -> Result<()> {
    let config = AppConfig {
        history_page_size: 2,
        ..AppConfig::default()
    };
    let app = TestApp::with_config(config).await?;
    let tool = test_utils::create_tool(&app.db, "Veeam").await?;
    let client = test_utils::create_client(&app.db, "Acme", true).await?;
    let routine = test_utils::create_routine(&app.db, Some(client.id), tool.id, "Banco", vec![]).await?;

    let base = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
    for i in 0..5 {
        test_utils::insert_validation(
            &app.db,
            routine.id,
            app.operator.id,
            ValidationStatus::Success,
            base + Duration::minutes(i),
        )
        .await?;
    }

    let (status, json) = app.send_json(app.get("/history", &app.operator_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["page"]["number"], 1);
    assert_eq!(json["page"]["num_pages"], 3);
    assert_eq!(json["page"]["total"], 5);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);

    let (_, json) = app.send_json(app.get("/history?page=99", &app.operator_token)).await;
    assert_eq!(json["page"]["number"], 3);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
    assert_eq!(json["page"]["has_next"], false);

    let (_, json) = app.send_json(app.get("/history?page=abc", &app.operator_token)).await;
    assert_eq!(json["page"]["number"], 1);

    let (_, json) = app
        .send_json(app.get("/history?page=99999999999999999999", &app.operator_token))
        .await;
    assert_eq!(json["page"]["number"], 3);

    let (_, json) = app
        .send_json(app.get("/history?status=error&cliente=", &app.operator_token))
        .await;
    assert_eq!(json["page"]["total"], 0);
    assert_eq!(json["page"]["number"], 1);
    Ok(())
}

#[tokio::test]
async fn malformed_filters_are_field_errors() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, json) = app
        .send_json(app.get("/history?data_inicio=2025-13-01", &app.operator_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_FAILED");
    assert!(json["details"]["data_inicio"].is_string());

    let (status, json) = app
        .send_json(app.get("/reports?cliente=abc", &app.operator_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["details"]["cliente"].is_string());
    Ok(())
}

#[tokio::test]
async fn lookups_return_client_scoped_lists() -> Result<()> {
    let s = scenario().await?;

    let (status, json) = s
        .app
        .send_json(s.app.get("/api/servers-by-client", &s.app.operator_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "servers": [] }));

    let uri = format!("/api/servers-by-client?cliente_id={}", s.client_id);
    let (_, json) = s.app.send_json(s.app.get(&uri, &s.app.operator_token)).await;
    let servers = json["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["hostname"], "srv-db01");
    assert_eq!(servers[0]["description"], "srv-db01 description");

    let uri = format!("/api/servers-by-client?cliente_id={}", s.other_client_id);
    let (_, json) = s.app.send_json(s.app.get(&uri, &s.app.operator_token)).await;
    assert_eq!(json["servers"].as_array().unwrap().len(), 0);

    let uri = format!("/api/client-routines/{}", s.client_id);
    let (_, json) = s.app.send_json(s.app.get(&uri, &s.app.operator_token)).await;
    assert_eq!(
        json,
        serde_json::json!({ "routines": [{ "id": s.routine_id, "label": "Veeam - Banco ERP" }] })
    );
    Ok(())
}

#[tokio::test]
async fn dashboard_returns_panels() -> Result<()> {
    let s = scenario().await?;
    test_utils::insert_validation(
        &s.app.db,
        s.routine_id,
        s.app.operator.id,
        ValidationStatus::Warning,
        Utc::now(),
    )
    .await?;

    let (status, json) = s.app.send_json(s.app.get("/dashboard", &s.app.operator_token)).await;
    assert_eq!(status, StatusCode::OK);

    let clients = json["clients"].as_array().unwrap();
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0]["client"]["trade_name"], "Acme");
    assert_eq!(clients[0]["latest_status"], "warning");
    assert_eq!(clients[1]["latest_status"], "pending");
    assert_eq!(json["latest_validations"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn report_panel_and_exports_share_the_filter() -> Result<()> {
    let s = scenario().await?;
    let at = |h| Utc.with_ymd_and_hms(2025, 4, 2, h, 0, 0).unwrap();
    for (hour, status) in [
        (10, ValidationStatus::Success),
        (11, ValidationStatus::Error),
        (12, ValidationStatus::Error),
    ] {
        test_utils::insert_validation(&s.app.db, s.routine_id, s.app.operator.id, status, at(hour))
            .await?;
    }

    let (status, json) = s
        .app
        .send_json(s.app.get("/reports?status=error", &s.app.operator_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert!(json["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|item| item["status"] == "error"));
    assert_eq!(json["clients"].as_array().unwrap().len(), 2);
    assert_eq!(json["sort_keys"].as_array().unwrap().len(), 5);

    let (status, headers, body) = s
        .app
        .send(s.app.get("/reports/excel?status=error", &s.app.operator_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = headers.get(header::CONTENT_DISPOSITION).unwrap().to_str()?;
    assert!(disposition.starts_with("attachment; filename=\"relatorio_backups_"));
    assert!(disposition.ends_with(".xlsx\""));
    assert!(body.starts_with(b"PK"));

    let (status, headers, body) = s
        .app
        .send(s.app.get("/reports/pdf?status=error&ordenacao=antigo", &s.app.operator_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
    let disposition = headers.get(header::CONTENT_DISPOSITION).unwrap().to_str()?;
    assert!(disposition.ends_with(".pdf\""));
    assert!(body.starts_with(b"%PDF"));
    Ok(())
}

/// Concatenated sheet and shared-string XML of an `.xlsx` buffer.
fn workbook_xml(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if name == "xl/sharedStrings.xml" || name.starts_with("xl/worksheets/") {
            entry.read_to_string(&mut xml)?;
        }
    }
    Ok(xml)
}

#[tokio::test]
async fn exports_carry_the_report_rows() -> Result<()> {
    let s = scenario().await?;
    let at = |h| Utc.with_ymd_and_hms(2025, 4, 2, h, 15, 0).unwrap();
    test_utils::insert_validation(&s.app.db, s.routine_id, s.app.operator.id, ValidationStatus::Warning, at(9))
        .await?;
    test_utils::insert_validation(&s.app.db, s.other_routine_id, s.app.staff.id, ValidationStatus::Error, at(14))
        .await?;
    test_utils::insert_validation(&s.app.db, s.routine_id, s.app.staff.id, ValidationStatus::Error, at(16))
        .await?;
    test_utils::insert_validation(&s.app.db, s.routine_id, s.app.operator.id, ValidationStatus::Success, at(18))
        .await?;

    let query = "status=error&ordenacao=cliente_az";
    let (_, panel) = s
        .app
        .send_json(s.app.get(&format!("/reports?{query}"), &s.app.operator_token))
        .await;
    let items = panel["items"].as_array().unwrap();

    let filter = ValidationFilter::try_from(&ValidationFilterParams {
        status: Some("error".to_string()),
        ordenacao: Some("cliente_az".to_string()),
        ..Default::default()
    })?;
    let offset = AppConfig::default().display_offset();
    let rows = reports::collect_rows(&s.app.db, &filter, &offset).await?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows.len(), items.len());
    for (row, item) in rows.iter().zip(items) {
        let text = |v: &serde_json::Value| v.as_str().unwrap_or(MISSING).to_string();
        let expected = [
            text(&item["created_at_display"]),
            text(&item["client"]["trade_name"]),
            text(&item["server_hostname"]),
            text(&item["tool_name"]),
            text(&item["routine"]["description"]),
            text(&item["status_label"]),
            text(&item["validator"]),
        ];
        assert_eq!(row.cells, expected);
    }
    // Acme sorts before Globex; the Globex routine has no server.
    assert_eq!(rows[0].cells[1], "Acme");
    assert_eq!(rows[0].cells[2], "srv-db01");
    assert_eq!(rows[1].cells[1], "Globex");
    assert_eq!(rows[1].cells[2], MISSING);
    assert_eq!(rows[0].cells[0], "02/04/2025 13:15");

    let (status, _, body) = s
        .app
        .send(s.app.get(&format!("/reports/excel?{query}"), &s.app.operator_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let xml = workbook_xml(&body)?;
    for row in &rows {
        for cell in &row.cells {
            assert!(xml.contains(&format!(">{cell}<")), "missing cell {cell:?} in workbook");
        }
    }
    assert!(!xml.contains(">Sucesso<"));
    assert!(!xml.contains(">Alerta<"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, json) = app
        .send_json(Request::get("/openapi.json").body(Body::empty())?)
        .await;

    assert_eq!(status, StatusCode::OK);
    let paths = json["paths"].as_object().unwrap();
    assert!(paths.contains_key("/clients/{client_id}/validations"));
    assert!(paths.contains_key("/admin/validations/{validation_id}"));
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
    Ok(())
}

#[tokio::test]
async fn non_numeric_ids_get_problem_json() -> Result<()> {
    let app = TestApp::new().await?;

    for uri in [
        "/api/client-routines/abc",
        "/clients/abc/validations/new",
        "/admin/validations/12x",
    ] {
        let (status, headers, body) = app.send(app.get(uri, &app.staff_token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(headers[header::CONTENT_TYPE], "application/problem+json", "{uri}");

        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["code"], "VALIDATION_FAILED", "{uri}");
    }
    Ok(())
}
