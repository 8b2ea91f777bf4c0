use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::domain::{CampDayId, CampId, PlanCode, StaffProfileId, TenantId};
use super::export::export_finalized_csv;
use super::money::Score;
use super::repository::RepositoryError;
use super::service::{
    AttachPlan, CompensationService, CompensationServiceError, DailySnapshotCapture,
    MetricOverrides, PlanDraft, SessionRef,
};

type SharedService = Arc<CompensationService>;

/// Uniform response body: exactly one of `data` and `error` is set.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

fn ok<T: Serialize>(data: T) -> Response {
    let body = ApiEnvelope {
        data: Some(data),
        error: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn failure(error: CompensationServiceError) -> Response {
    let status = match &error {
        CompensationServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        CompensationServiceError::AlreadyFinalized { .. } => StatusCode::CONFLICT,
        CompensationServiceError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CompensationServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::Finalized,
        ) => StatusCode::CONFLICT,
        CompensationServiceError::Repository(_) => {
            error!(error = %error, "compensation repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    rejected(status, error.to_string())
}

fn rejected(status: StatusCode, message: String) -> Response {
    let body: ApiEnvelope<()> = ApiEnvelope {
        data: None,
        error: Some(message),
    };
    (status, Json(body)).into_response()
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| rejected(rejection.status(), rejection.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    params
        .map(|Query(query)| query)
        .map_err(|rejection| rejected(rejection.status(), rejection.body_text()))
}

fn respond<T: Serialize>(result: Result<T, CompensationServiceError>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(err) => failure(err),
    }
}

/// Router builder exposing plan administration, session workflow and overview endpoints.
pub fn compensation_router(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/hq/compensation/plans", get(list_plans_handler).post(upsert_plan_handler))
        .route("/api/v1/hq/compensation/plans/:plan_code", get(plan_handler))
        .route("/api/v1/hq/compensation/overview", get(global_overview_handler))
        .route("/api/v1/hq/compensation/export.csv", get(export_handler))
        .route("/api/v1/tenants/:tenant_id/camps/:camp_id/compensation", post(attach_handler))
        .route(
            "/api/v1/tenants/:tenant_id/camps/:camp_id/compensation/calculate",
            post(calculate_handler),
        )
        .route(
            "/api/v1/tenants/:tenant_id/camps/:camp_id/compensation/staff/:staff_profile_id",
            get(session_handler).patch(update_metrics_handler),
        )
        .route(
            "/api/v1/tenants/:tenant_id/camps/:camp_id/compensation/staff/:staff_profile_id/snapshots",
            get(snapshots_handler),
        )
        .route(
            "/api/v1/tenants/:tenant_id/camp-days/:camp_day_id/compensation/snapshots",
            post(capture_snapshot_handler),
        )
        .route("/api/v1/tenants/:tenant_id/compensation/overview", get(tenant_overview_handler))
        .route("/api/v1/tenants/:tenant_id/compensation/summary", get(licensee_summary_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct AttachPlanBody {
    #[serde(alias = "staffProfileId")]
    pub staff_profile_id: StaffProfileId,
    #[serde(alias = "planCode")]
    pub plan_code: PlanCode,
}

#[derive(Debug, Deserialize)]
pub struct CalculateBody {
    #[serde(alias = "staffProfileId")]
    pub staff_profile_id: StaffProfileId,
    #[serde(flatten)]
    pub overrides: MetricOverrides,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotBody {
    #[serde(alias = "staffProfileId")]
    pub staff_profile_id: StaffProfileId,
    #[serde(default, alias = "csatScore")]
    pub csat_score: Option<Score>,
    #[serde(default, alias = "guestSpeakerCount")]
    pub guest_speaker_count: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub tenant_id: Option<TenantId>,
}

pub(crate) async fn list_plans_handler(State(service): State<SharedService>) -> Response {
    respond(service.list_plans())
}

pub(crate) async fn upsert_plan_handler(
    State(service): State<SharedService>,
    payload: Result<Json<PlanDraft>, JsonRejection>,
) -> Response {
    let draft = match json_body(payload) {
        Ok(draft) => draft,
        Err(response) => return response,
    };
    respond(service.upsert_plan(draft))
}

pub(crate) async fn plan_handler(
    State(service): State<SharedService>,
    Path(plan_code): Path<String>,
) -> Response {
    respond(service.get_plan(&PlanCode(plan_code)))
}

pub(crate) async fn attach_handler(
    State(service): State<SharedService>,
    Path((tenant_id, camp_id)): Path<(String, String)>,
    payload: Result<Json<AttachPlanBody>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request = AttachPlan {
        tenant_id: TenantId(tenant_id),
        camp_id: CampId(camp_id),
        staff_profile_id: body.staff_profile_id,
        plan_code: body.plan_code,
    };
    respond(service.attach_plan(request))
}

pub(crate) async fn calculate_handler(
    State(service): State<SharedService>,
    Path((tenant_id, camp_id)): Path<(String, String)>,
    payload: Result<Json<CalculateBody>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let session = SessionRef {
        tenant_id: TenantId(tenant_id),
        camp_id: CampId(camp_id),
        staff_profile_id: body.staff_profile_id,
    };
    respond(service.calculate(session, body.overrides))
}

pub(crate) async fn session_handler(
    State(service): State<SharedService>,
    Path((tenant_id, camp_id, staff_profile_id)): Path<(String, String, String)>,
) -> Response {
    let session = session_ref(tenant_id, camp_id, staff_profile_id);
    respond(service.session_detail(&session))
}

pub(crate) async fn update_metrics_handler(
    State(service): State<SharedService>,
    Path((tenant_id, camp_id, staff_profile_id)): Path<(String, String, String)>,
    payload: Result<Json<MetricOverrides>, JsonRejection>,
) -> Response {
    let update = match json_body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let session = session_ref(tenant_id, camp_id, staff_profile_id);
    respond(service.update_metrics(session, update))
}

pub(crate) async fn snapshots_handler(
    State(service): State<SharedService>,
    Path((tenant_id, camp_id, staff_profile_id)): Path<(String, String, String)>,
) -> Response {
    let session = session_ref(tenant_id, camp_id, staff_profile_id);
    respond(service.daily_snapshots(&session))
}

pub(crate) async fn capture_snapshot_handler(
    State(service): State<SharedService>,
    Path((tenant_id, camp_day_id)): Path<(String, String)>,
    payload: Result<Json<SnapshotBody>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request = DailySnapshotCapture {
        tenant_id: TenantId(tenant_id),
        camp_day_id: CampDayId(camp_day_id),
        staff_profile_id: body.staff_profile_id,
        csat_score: body.csat_score,
        guest_speaker_count: body.guest_speaker_count,
        notes: body.notes,
    };
    respond(service.capture_daily_snapshot(request))
}

pub(crate) async fn tenant_overview_handler(
    State(service): State<SharedService>,
    Path(tenant_id): Path<String>,
) -> Response {
    respond(service.tenant_overview(&TenantId(tenant_id)))
}

pub(crate) async fn global_overview_handler(State(service): State<SharedService>) -> Response {
    respond(service.global_overview())
}

pub(crate) async fn licensee_summary_handler(
    State(service): State<SharedService>,
    Path(tenant_id): Path<String>,
    params: Result<Query<SummaryQuery>, QueryRejection>,
) -> Response {
    let query = match query_params(params) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    respond(service.licensee_summary(&TenantId(tenant_id), year))
}

pub(crate) async fn export_handler(
    State(service): State<SharedService>,
    params: Result<Query<ExportQuery>, QueryRejection>,
) -> Response {
    let query = match query_params(params) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let sessions = match service.finalized_sessions(query.tenant_id.as_ref()) {
        Ok(sessions) => sessions,
        Err(err) => return failure(err),
    };

    let mut buffer = Vec::new();
    match export_finalized_csv(&mut buffer, &sessions) {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "payroll export failed");
            rejected(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn session_ref(tenant_id: String, camp_id: String, staff_profile_id: String) -> SessionRef {
    SessionRef {
        tenant_id: TenantId(tenant_id),
        camp_id: CampId(camp_id),
        staff_profile_id: StaffProfileId(staff_profile_id),
    }
}
