use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::compensation::router::{self, CalculateBody};
use crate::workflows::compensation::service::MetricOverrides;
use crate::workflows::compensation::{compensation_router, Money};

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serializable")))
        .expect("request builds")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

const SESSION_ROOT: &str = "/api/v1/tenants/licensee-denver/camps/camp-soccer-june/compensation";

#[tokio::test]
async fn calculate_handler_returns_envelope_with_breakdown() {
    let (service, _) = attached_service(65);
    let response = router::calculate_handler(
        State(Arc::new(service)),
        Path((tenant().0, camp().0)),
        Ok(axum::Json(CalculateBody {
            staff_profile_id: staff(),
            overrides: MetricOverrides {
                budget_preapproved_total: Some(Money::from_units(5000)),
                budget_actual_total: Some(Money::from_units(4200)),
                csat_avg_score: Some(score(47)),
                guest_speaker_count: Some(4),
            },
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], Value::Null);
    assert_eq!(payload["data"]["total_compensation"], json!(890.0));
    assert_eq!(
        payload["data"]["breakdown"]["budget_efficiency"]["savings"],
        json!(800.0)
    );
    assert_eq!(payload["data"]["session"]["is_finalized"], json!(true));
}

#[tokio::test]
async fn calculate_route_accepts_camel_case_body_and_rejects_repeat() {
    let (service, _) = attached_service(40);
    let app = compensation_router(Arc::new(service));
    let body = json!({
        "staffProfileId": "staff-rivera",
        "budgetPreapprovedTotal": 5000,
        "budgetActualTotal": 4200,
        "csatAvgScore": 4.2,
        "guestSpeakerCount": 4
    });

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{SESSION_ROOT}/calculate"),
            body.clone(),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["total_compensation"], json!(760.0));

    let response = app
        .oneshot(json_request("POST", &format!("{SESSION_ROOT}/calculate"), body))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"], Value::Null);
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("already finalized"));
}

#[tokio::test]
async fn attach_route_returns_not_found_for_unknown_plan() {
    let (service, _) = build_service(10);
    let app = compensation_router(Arc::new(service));

    let response = app
        .oneshot(json_request(
            "POST",
            SESSION_ROOT,
            json!({ "staff_profile_id": "staff-rivera", "plan_code": "MISSING" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("MISSING"));
}

#[tokio::test]
async fn metrics_patch_and_session_detail_round_trip() {
    let (service, _) = attached_service(10);
    let app = compensation_router(Arc::new(service));
    let detail_uri = format!("{SESSION_ROOT}/staff/staff-rivera");

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &detail_uri,
            json!({ "budget_preapproved_total": 2500, "budget_actual_total": 2000.25 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(&detail_uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["data"]["metrics"]["budget_savings_amount"],
        json!(499.75)
    );
    assert_eq!(payload["data"]["is_finalized"], json!(false));
}

#[tokio::test]
async fn snapshot_routes_capture_and_list() {
    let (service, _) = attached_service(10);
    let app = compensation_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!(
                "/api/v1/tenants/licensee-denver/camp-days/{}/compensation/snapshots",
                day(2)
            ),
            json!({
                "staff_profile_id": "staff-rivera",
                "guest_speaker_count": 2,
                "notes": "fire dept visit"
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(&format!("{SESSION_ROOT}/staff/staff-rivera/snapshots")))
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    let snapshots = payload["data"].as_array().expect("array of snapshots");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0]["guest_speaker_count"], json!(2));
    assert_eq!(snapshots[0]["day_date"], json!("2026-06-09"));
}

#[tokio::test]
async fn plan_routes_validate_and_list() {
    let (service, _) = build_service(0);
    let app = compensation_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/hq/compensation/plans",
            json!({
                "plan_code": "ASSISTANT_2026",
                "name": "Assistant coach",
                "pre_camp_stipend": 100,
                "on_site_stipend": 150,
                "budget_efficiency": { "rate": 2.5 }
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(get_request("/api/v1/hq/compensation/plans"))
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    let plans = payload["data"].as_array().expect("plans listed");
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0]["plan_code"], json!(PLAN));
    assert_eq!(plans[0]["parameters"]["on_site_stipend"], json!(300.0));
}

#[tokio::test]
async fn overview_routes_report_finalized_totals() {
    let (service, _) = attached_service(65);
    service
        .calculate(
            session_ref(),
            MetricOverrides {
                budget_preapproved_total: Some(Money::from_units(5000)),
                budget_actual_total: Some(Money::from_units(4200)),
                csat_avg_score: Some(score(47)),
                guest_speaker_count: Some(4),
            },
        )
        .expect("calculates");
    let app = compensation_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/v1/tenants/licensee-denver/compensation/overview",
        ))
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["total_compensation"], json!(890.0));

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/v1/tenants/licensee-denver/compensation/summary?year=2026",
        ))
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["finalized"]["session_count"], json!(1));
    assert_eq!(payload["data"]["season"]["start"], json!("2026-04-01"));

    let response = app
        .oneshot(get_request("/api/v1/hq/compensation/export.csv"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let csv = String::from_utf8(bytes.to_vec()).expect("utf8");
    let mut lines = csv.lines();
    assert!(lines.next().unwrap_or_default().starts_with("tenant_id,"));
    assert!(lines
        .next()
        .unwrap_or_default()
        .contains("licensee-denver,camp-soccer-june,staff-rivera,HEAD_COACH_2026,500.00"));
}

#[tokio::test]
async fn repository_failures_map_to_internal_error() {
    let service = Arc::new(unavailable_service());
    let response = router::session_handler(
        State(service),
        Path((tenant().0, camp().0, staff().0)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"], Value::Null);
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("unavailable"));
}

#[tokio::test]
async fn malformed_bodies_are_reported_in_the_envelope() {
    let (service, _) = attached_service(65);
    let app = compensation_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{SESSION_ROOT}/calculate"),
            json!({ "staff_profile_id": "staff-rivera", "guest_speaker_count": -1 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"], Value::Null);
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("expected u32"));

    let truncated = Request::builder()
        .method("PATCH")
        .uri(format!("{SESSION_ROOT}/staff/staff-rivera"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"budget_actual_total\": "))
        .expect("request builds");
    let response = app
        .clone()
        .oneshot(truncated)
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"], Value::Null);
    assert!(payload["error"].is_string());

    let response = app
        .oneshot(get_request(
            "/api/v1/tenants/licensee-denver/compensation/summary?year=next",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"], Value::Null);
    assert!(payload["error"].is_string());
}
