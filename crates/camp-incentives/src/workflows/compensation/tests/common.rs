use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::CompensationConfig;
use crate::workflows::compensation::domain::{
    AttendanceRecord, AttendanceStatus, BudgetEfficiencyRule, Camp, CampDay, CampDayId, CampId,
    CsatBonusRule, EnrollmentBonusRule, GuestSpeakerRule, PayoutAmounts, PerformanceMetrics,
    PlanCode, PlanParameters, Registration, RegistrationId, RegistrationStatus,
    SessionCompensation, SessionKey, StaffProfileId, TenantId,
};
use crate::workflows::compensation::money::{Money, Rate, Score};
use crate::workflows::compensation::repository::{RepositoryError, SessionCompensationRepository};
use crate::workflows::compensation::service::{
    AttachPlan, CompensationService, DailySnapshotCapture, PlanDraft, SessionRef,
};
use crate::workflows::compensation::InMemoryCompensationStore;

pub(super) const PLAN: &str = "HEAD_COACH_2026";

pub(super) fn tenant() -> TenantId {
    TenantId::new("licensee-denver")
}

pub(super) fn other_tenant() -> TenantId {
    TenantId::new("licensee-austin")
}

pub(super) fn camp() -> CampId {
    CampId::new("camp-soccer-june")
}

pub(super) fn staff() -> StaffProfileId {
    StaffProfileId::new("staff-rivera")
}

pub(super) fn score(tenths: i64) -> Score {
    Score::new(Decimal::new(tenths, 1))
}

pub(super) fn session_ref() -> SessionRef {
    SessionRef {
        tenant_id: tenant(),
        camp_id: camp(),
        staff_profile_id: staff(),
    }
}

pub(super) fn plan_parameters() -> PlanParameters {
    PlanParameters {
        pre_camp_stipend: Money::from_units(200),
        on_site_stipend: Money::from_units(300),
        enrollment_bonus: Some(EnrollmentBonusRule {
            threshold: 50,
            per_camper_rate: Money::from_units(2),
        }),
        csat_bonus: Some(CsatBonusRule {
            required_score: score(45),
            bonus_amount: Money::from_units(100),
        }),
        budget_efficiency: Some(BudgetEfficiencyRule {
            rate: Rate::new(Decimal::new(2, 1)),
        }),
        guest_speaker: Some(GuestSpeakerRule {
            required_count: 3,
            bonus_amount: Money::from_units(100),
        }),
    }
}

pub(super) fn plan_draft() -> PlanDraft {
    PlanDraft {
        plan_code: PlanCode::new(PLAN),
        name: "Head coach, summer 2026".to_string(),
        parameters: plan_parameters(),
    }
}

pub(super) fn day(n: u32) -> CampDayId {
    CampDayId::new(format!("{}-day-{n}", camp()))
}

/// Store with one camp running June 8-12 2026 and `enrolled` active registrations plus a
/// cancelled and a waitlisted one that must never count.
pub(super) fn seeded_store(enrolled: u32) -> Arc<InMemoryCompensationStore> {
    let store = Arc::new(InMemoryCompensationStore::default());
    store
        .add_camp(Camp {
            camp_id: camp(),
            tenant_id: tenant(),
            name: "June Soccer Week".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 8).expect("valid"),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 12).expect("valid"),
        })
        .expect("camp stored");

    for n in 1..=5 {
        store
            .add_camp_day(CampDay {
                camp_day_id: day(n),
                camp_id: camp(),
                day_date: NaiveDate::from_ymd_opt(2026, 6, 7 + n).expect("valid"),
            })
            .expect("day stored");
    }

    for n in 0..enrolled {
        let status = if n % 3 == 0 {
            RegistrationStatus::Pending
        } else {
            RegistrationStatus::Confirmed
        };
        store
            .add_registration(Registration {
                registration_id: RegistrationId::new(format!("reg-{n}")),
                camp_id: camp(),
                status,
            })
            .expect("registration stored");
    }
    for (id, status) in [
        ("reg-cancelled", RegistrationStatus::Cancelled),
        ("reg-waitlisted", RegistrationStatus::Waitlisted),
    ] {
        store
            .add_registration(Registration {
                registration_id: RegistrationId::new(id),
                camp_id: camp(),
                status,
            })
            .expect("registration stored");
    }

    store
}

pub(super) fn record_attendance(
    store: &InMemoryCompensationStore,
    day_id: &CampDayId,
    statuses: &[AttendanceStatus],
) {
    for (n, status) in statuses.iter().enumerate() {
        store
            .record_attendance(AttendanceRecord {
                camp_day_id: day_id.clone(),
                registration_id: RegistrationId::new(format!("reg-{n}")),
                status: *status,
            })
            .expect("attendance stored");
    }
}

pub(super) fn build_service(
    enrolled: u32,
) -> (CompensationService, Arc<InMemoryCompensationStore>) {
    let store = seeded_store(enrolled);
    let service = CompensationService::with_store(store.clone(), CompensationConfig::default());
    service.upsert_plan(plan_draft()).expect("plan saved");
    (service, store)
}

pub(super) fn attach_request() -> AttachPlan {
    AttachPlan {
        tenant_id: tenant(),
        camp_id: camp(),
        staff_profile_id: staff(),
        plan_code: PlanCode::new(PLAN),
    }
}

/// Service with the plan already attached to the default staff member.
pub(super) fn attached_service(
    enrolled: u32,
) -> (CompensationService, Arc<InMemoryCompensationStore>) {
    let (service, store) = build_service(enrolled);
    service.attach_plan(attach_request()).expect("plan attaches");
    (service, store)
}

pub(super) fn snapshot_request(day_n: u32, guest_speakers: Option<u32>) -> DailySnapshotCapture {
    DailySnapshotCapture {
        tenant_id: tenant(),
        camp_day_id: day(day_n),
        staff_profile_id: staff(),
        csat_score: None,
        guest_speaker_count: guest_speakers,
        notes: None,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Session repository whose backing database is down.
pub(super) struct UnavailableSessions;

impl SessionCompensationRepository for UnavailableSessions {
    fn fetch_session(
        &self,
        _key: &SessionKey,
    ) -> Result<Option<SessionCompensation>, RepositoryError> {
        Err(RepositoryError::Unavailable("primary offline".to_string()))
    }

    fn create_session(
        &self,
        _record: SessionCompensation,
    ) -> Result<SessionCompensation, RepositoryError> {
        Err(RepositoryError::Unavailable("primary offline".to_string()))
    }

    fn refresh_plan_snapshot(
        &self,
        _key: &SessionKey,
        _plan_code: PlanCode,
        _plan: PlanParameters,
        _updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        Err(RepositoryError::Unavailable("primary offline".to_string()))
    }

    fn update_metrics(
        &self,
        _key: &SessionKey,
        _metrics: PerformanceMetrics,
        _updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        Err(RepositoryError::Unavailable("primary offline".to_string()))
    }

    fn finalize_session(
        &self,
        _key: &SessionKey,
        _metrics: PerformanceMetrics,
        _payout: PayoutAmounts,
        _calculated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        Err(RepositoryError::Unavailable("primary offline".to_string()))
    }

    fn sessions_for_tenant(
        &self,
        _tenant: &TenantId,
    ) -> Result<Vec<SessionCompensation>, RepositoryError> {
        Err(RepositoryError::Unavailable("primary offline".to_string()))
    }

    fn all_sessions(&self) -> Result<Vec<SessionCompensation>, RepositoryError> {
        Err(RepositoryError::Unavailable("primary offline".to_string()))
    }
}

pub(super) fn unavailable_service() -> CompensationService {
    let store = seeded_store(10);
    CompensationService::new(
        store.clone(),
        Arc::new(UnavailableSessions),
        store.clone(),
        store,
        CompensationConfig::default(),
    )
}

type RacingWrite = Box<dyn FnOnce() + Send>;

/// Session repository that runs `racing_write` once, right after the first read returns,
/// so a competing request lands between a service's read and its write.
pub(super) struct InterleavedSessions {
    pub(super) inner: Arc<InMemoryCompensationStore>,
    pub(super) racing_write: Mutex<Option<RacingWrite>>,
}

impl SessionCompensationRepository for InterleavedSessions {
    fn fetch_session(
        &self,
        key: &SessionKey,
    ) -> Result<Option<SessionCompensation>, RepositoryError> {
        let record = self.inner.fetch_session(key)?;
        let racing_write = self.racing_write.lock().expect("hook mutex").take();
        if let Some(write) = racing_write {
            write();
        }
        Ok(record)
    }

    fn create_session(
        &self,
        record: SessionCompensation,
    ) -> Result<SessionCompensation, RepositoryError> {
        self.inner.create_session(record)
    }

    fn refresh_plan_snapshot(
        &self,
        key: &SessionKey,
        plan_code: PlanCode,
        plan: PlanParameters,
        updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        self.inner.refresh_plan_snapshot(key, plan_code, plan, updated_at)
    }

    fn update_metrics(
        &self,
        key: &SessionKey,
        metrics: PerformanceMetrics,
        updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        self.inner.update_metrics(key, metrics, updated_at)
    }

    fn finalize_session(
        &self,
        key: &SessionKey,
        metrics: PerformanceMetrics,
        payout: PayoutAmounts,
        calculated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        self.inner.finalize_session(key, metrics, payout, calculated_at)
    }

    fn sessions_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<SessionCompensation>, RepositoryError> {
        self.inner.sessions_for_tenant(tenant)
    }

    fn all_sessions(&self) -> Result<Vec<SessionCompensation>, RepositoryError> {
        self.inner.all_sessions()
    }
}

/// Service whose first session read is followed by `racing_write` against the same store.
pub(super) fn interleaved_service(
    store: Arc<InMemoryCompensationStore>,
    racing_write: impl FnOnce() + Send + 'static,
) -> CompensationService {
    let sessions = InterleavedSessions {
        inner: store.clone(),
        racing_write: Mutex::new(Some(Box::new(racing_write))),
    };
    CompensationService::new(
        store.clone(),
        Arc::new(sessions),
        store.clone(),
        store,
        CompensationConfig::default(),
    )
}
