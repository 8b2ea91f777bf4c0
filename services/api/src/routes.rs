use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use camp_incentives::workflows::compensation::{compensation_router, CompensationService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_operational_routes(service: Arc<CompensationService>) -> axum::Router {
    compensation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{demo_plan, seed_demo_roster, DEMO_CAMP, DEMO_STAFF, DEMO_TENANT};
    use axum::body::Body;
    use axum::http::Request;
    use camp_incentives::config::CompensationConfig;
    use camp_incentives::workflows::compensation::InMemoryCompensationStore;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let store = Arc::new(InMemoryCompensationStore::default());
        seed_demo_roster(&store, 2026, 55).expect("roster seeds");
        let service = CompensationService::with_store(store, CompensationConfig::default());
        service.upsert_plan(demo_plan()).expect("plan saved");

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_operational_routes(Arc::new(service)).layer(Extension(state))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_startup_flag() {
        let response = app(false)
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::Release);
        let state = AppState {
            readiness: flag,
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn compensation_routes_are_mounted_next_to_operational_ones() {
        let app = app(true);
        let attach = Request::builder()
            .method("POST")
            .uri(format!(
                "/api/v1/tenants/{DEMO_TENANT}/camps/{DEMO_CAMP}/compensation"
            ))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "staff_profile_id": DEMO_STAFF, "plan_code": "HEAD_COACH" }).to_string(),
            ))
            .expect("request");
        let response = app.clone().oneshot(attach).await.expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let calculate = Request::builder()
            .method("POST")
            .uri(format!(
                "/api/v1/tenants/{DEMO_TENANT}/camps/{DEMO_CAMP}/compensation/calculate"
            ))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "staff_profile_id": DEMO_STAFF }).to_string()))
            .expect("request");
        let response = app.oneshot(calculate).await.expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        // 500 stipends + 5 campers over threshold at $2.
        assert_eq!(payload["data"]["total_compensation"], json!(510.0));
    }
}
