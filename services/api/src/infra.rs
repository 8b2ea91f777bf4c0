use camp_incentives::workflows::compensation::{
    AttendanceRecord, AttendanceStatus, BudgetEfficiencyRule, Camp, CampDay, CampDayId, CampId,
    CsatBonusRule, EnrollmentBonusRule, GuestSpeakerRule, InMemoryCompensationStore, Money,
    PlanCode, PlanDraft, PlanParameters, Rate, Registration, RegistrationId, RegistrationStatus,
    RepositoryError, Score, StaffProfileId, TenantId,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const DEMO_TENANT: &str = "licensee-denver";
pub(crate) const DEMO_CAMP: &str = "camp-soccer-june";
pub(crate) const DEMO_STAFF: &str = "staff-rivera";
pub(crate) const DEMO_PLAN: &str = "HEAD_COACH";
pub(crate) const DEMO_DAYS: u32 = 5;

pub(crate) fn demo_tenant() -> TenantId {
    TenantId::new(DEMO_TENANT)
}

pub(crate) fn demo_camp() -> CampId {
    CampId::new(DEMO_CAMP)
}

pub(crate) fn demo_staff() -> StaffProfileId {
    StaffProfileId::new(DEMO_STAFF)
}

pub(crate) fn demo_day(n: u32) -> CampDayId {
    CampDayId::new(format!("{DEMO_CAMP}-day-{n}"))
}

/// Head coach plan: $200 + $300 stipends, $2 per camper over 50, $100 at CSAT 4.5,
/// 20% of budget savings and $100 for three guest speakers.
pub(crate) fn demo_plan() -> PlanDraft {
    PlanDraft {
        plan_code: PlanCode::new(DEMO_PLAN),
        name: "Head coach, summer season".to_string(),
        parameters: PlanParameters {
            pre_camp_stipend: Money::from_units(200),
            on_site_stipend: Money::from_units(300),
            enrollment_bonus: Some(EnrollmentBonusRule {
                threshold: 50,
                per_camper_rate: Money::from_units(2),
            }),
            csat_bonus: Some(CsatBonusRule {
                required_score: Score::new(Decimal::new(45, 1)),
                bonus_amount: Money::from_units(100),
            }),
            budget_efficiency: Some(BudgetEfficiencyRule {
                rate: Rate::new(Decimal::new(2, 1)),
            }),
            guest_speaker: Some(GuestSpeakerRule {
                required_count: 3,
                bonus_amount: Money::from_units(100),
            }),
        },
    }
}

/// Seeds one week-long camp in June of `year` with `enrolled` confirmed campers who all
/// checked in and out every day.
pub(crate) fn seed_demo_roster(
    store: &InMemoryCompensationStore,
    year: i32,
    enrolled: u32,
) -> Result<(), RepositoryError> {
    let date = |day: u32| {
        NaiveDate::from_ymd_opt(year, 6, day)
            .ok_or_else(|| RepositoryError::Unavailable(format!("invalid demo year {year}")))
    };

    store.add_camp(Camp {
        camp_id: demo_camp(),
        tenant_id: demo_tenant(),
        name: "June Soccer Week".to_string(),
        start_date: date(8)?,
        end_date: date(7 + DEMO_DAYS)?,
    })?;

    for n in 0..enrolled {
        store.add_registration(Registration {
            registration_id: RegistrationId::new(format!("reg-{n}")),
            camp_id: demo_camp(),
            status: RegistrationStatus::Confirmed,
        })?;
    }

    for day in 1..=DEMO_DAYS {
        store.add_camp_day(CampDay {
            camp_day_id: demo_day(day),
            camp_id: demo_camp(),
            day_date: date(7 + day)?,
        })?;
        for n in 0..enrolled {
            store.record_attendance(AttendanceRecord {
                camp_day_id: demo_day(day),
                registration_id: RegistrationId::new(format!("reg-{n}")),
                status: AttendanceStatus::CheckedOut,
            })?;
        }
    }

    Ok(())
}

pub(crate) fn parse_money(raw: &str) -> Result<Money, String> {
    raw.trim()
        .parse::<Decimal>()
        .map(Money::new)
        .map_err(|err| format!("failed to parse '{raw}' as an amount ({err})"))
}

pub(crate) fn parse_score(raw: &str) -> Result<Score, String> {
    raw.trim()
        .parse::<Decimal>()
        .map(Score::new)
        .map_err(|err| format!("failed to parse '{raw}' as a score ({err})"))
}
