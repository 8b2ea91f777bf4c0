use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CompensationConfig;

use super::calculator::{self, budget_savings, CompensationBreakdown, ResolvedMetrics};
use super::domain::{
    AttendanceRecord, AttendanceStatus, CampDayCompensationSnapshot, CampDayId, CampId,
    CompensationPlan, PayoutAmounts, PerformanceMetrics, PlanCode, PlanParameters,
    SessionCompensation, SessionKey, SnapshotKey, StaffProfileId, TenantId,
};
use super::money::{Money, Score};
use super::overview::{
    self, GlobalCompensationOverview, LicenseeIncentiveSummary, TenantCompensationOverview,
};
use super::repository::{
    CampRoster, DailySnapshotRepository, PlanRepository, RepositoryError,
    SessionCompensationRepository,
};

/// Plan template as submitted by HQ tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub plan_code: PlanCode,
    pub name: String,
    #[serde(flatten)]
    pub parameters: PlanParameters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachPlan {
    pub tenant_id: TenantId,
    pub camp_id: CampId,
    pub staff_profile_id: StaffProfileId,
    pub plan_code: PlanCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySnapshotCapture {
    pub tenant_id: TenantId,
    pub camp_day_id: CampDayId,
    pub staff_profile_id: StaffProfileId,
    pub csat_score: Option<Score>,
    pub guest_speaker_count: Option<u32>,
    pub notes: Option<String>,
}

/// Metric values supplied inline. `None` keeps whatever is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricOverrides {
    #[serde(default, alias = "budgetPreapprovedTotal")]
    pub budget_preapproved_total: Option<Money>,
    #[serde(default, alias = "budgetActualTotal")]
    pub budget_actual_total: Option<Money>,
    #[serde(default, alias = "csatAvgScore")]
    pub csat_avg_score: Option<Score>,
    #[serde(default, alias = "guestSpeakerCount")]
    pub guest_speaker_count: Option<u32>,
}

impl MetricOverrides {
    fn validate(&self) -> Result<(), CompensationServiceError> {
        for (field, amount) in [
            ("budget_preapproved_total", self.budget_preapproved_total),
            ("budget_actual_total", self.budget_actual_total),
        ] {
            if amount.is_some_and(|value| value.is_negative()) {
                return Err(CompensationServiceError::InvalidInput(format!(
                    "{field} must not be negative"
                )));
            }
        }
        if self
            .csat_avg_score
            .is_some_and(|score| score < Score::default())
        {
            return Err(CompensationServiceError::InvalidInput(
                "csat_avg_score must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub tenant_id: TenantId,
    pub camp_id: CampId,
    pub staff_profile_id: StaffProfileId,
}

impl SessionRef {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.camp_id.clone(), self.staff_profile_id.clone())
    }
}

/// Result of the one-shot calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculationOutcome {
    pub total_compensation: Money,
    pub breakdown: CompensationBreakdown,
    pub session: SessionCompensation,
}

/// Orchestrates plan attachment, daily snapshots, the calculator and overviews over the
/// injected repositories.
pub struct CompensationService {
    plans: Arc<dyn PlanRepository>,
    sessions: Arc<dyn SessionCompensationRepository>,
    snapshots: Arc<dyn DailySnapshotRepository>,
    roster: Arc<dyn CampRoster>,
    config: CompensationConfig,
}

impl CompensationService {
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        sessions: Arc<dyn SessionCompensationRepository>,
        snapshots: Arc<dyn DailySnapshotRepository>,
        roster: Arc<dyn CampRoster>,
        config: CompensationConfig,
    ) -> Self {
        Self {
            plans,
            sessions,
            snapshots,
            roster,
            config,
        }
    }

    /// Wires every repository to one backing store.
    pub fn with_store<T>(store: Arc<T>, config: CompensationConfig) -> Self
    where
        T: PlanRepository
            + SessionCompensationRepository
            + DailySnapshotRepository
            + CampRoster
            + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store, config)
    }

    pub fn config(&self) -> &CompensationConfig {
        &self.config
    }

    /// Create or replace a plan template. Sessions keep the snapshot taken when they attached.
    pub fn upsert_plan(
        &self,
        draft: PlanDraft,
    ) -> Result<CompensationPlan, CompensationServiceError> {
        if draft.plan_code.as_str().trim().is_empty() {
            return Err(CompensationServiceError::InvalidInput(
                "plan_code must not be empty".to_string(),
            ));
        }
        if let Some(problem) = draft.parameters.validation_error() {
            return Err(CompensationServiceError::InvalidInput(problem));
        }

        let plan = self.plans.save_plan(CompensationPlan {
            plan_code: draft.plan_code,
            name: draft.name,
            parameters: draft.parameters,
            updated_at: Utc::now(),
        })?;
        info!(plan_code = %plan.plan_code, "compensation plan saved");
        Ok(plan)
    }

    pub fn list_plans(&self) -> Result<Vec<CompensationPlan>, CompensationServiceError> {
        let mut plans = self.plans.list_plans()?;
        plans.sort_by(|a, b| a.plan_code.cmp(&b.plan_code));
        Ok(plans)
    }

    pub fn get_plan(&self, code: &PlanCode) -> Result<CompensationPlan, CompensationServiceError> {
        self.plans
            .fetch_plan(code)?
            .ok_or_else(|| CompensationServiceError::NotFound(MissingEntity::Plan(code.clone())))
    }

    /// Attach a plan to a (camp, staff) pair, snapshotting its parameters.
    ///
    /// Re-attaching replaces the snapshot only; recorded metrics are left untouched.
    pub fn attach_plan(
        &self,
        request: AttachPlan,
    ) -> Result<SessionCompensation, CompensationServiceError> {
        let plan = self.get_plan(&request.plan_code)?;
        let key = SessionKey::new(request.camp_id.clone(), request.staff_profile_id.clone());
        let now = Utc::now();

        let existing = match self.sessions.fetch_session(&key)? {
            Some(existing) => Some(existing),
            None => {
                let record = SessionCompensation {
                    camp_id: request.camp_id,
                    staff_profile_id: request.staff_profile_id,
                    tenant_id: request.tenant_id.clone(),
                    plan_code: plan.plan_code.clone(),
                    plan: plan.parameters.clone(),
                    metrics: PerformanceMetrics::default(),
                    payout: PayoutAmounts::default(),
                    is_finalized: false,
                    calculated_at: None,
                    created_at: now,
                    updated_at: now,
                };
                match self.sessions.create_session(record) {
                    Ok(_) => None,
                    // Created by a concurrent attach; refresh it instead.
                    Err(RepositoryError::Conflict) => self.sessions.fetch_session(&key)?,
                    Err(err) => return Err(err.into()),
                }
            }
        };

        if let Some(existing) = existing {
            let existing = self.owned_by(existing, &request.tenant_id)?;
            ensure_open(&existing)?;
        }
        let stored = self
            .sessions
            .refresh_plan_snapshot(&key, plan.plan_code, plan.parameters, now)
            .map_err(|err| frozen_session(err, &key))?;
        info!(
            camp_id = %stored.camp_id,
            staff_profile_id = %stored.staff_profile_id,
            plan_code = %stored.plan_code,
            "compensation plan attached"
        );
        Ok(stored)
    }

    /// Record attendance-derived counts and daily metrics for one camp day.
    pub fn capture_daily_snapshot(
        &self,
        request: DailySnapshotCapture,
    ) -> Result<CampDayCompensationSnapshot, CompensationServiceError> {
        let camp_day = self.roster.camp_day(&request.camp_day_id)?.ok_or_else(|| {
            CompensationServiceError::NotFound(MissingEntity::CampDay(request.camp_day_id.clone()))
        })?;

        let session_key = SessionKey::new(
            camp_day.camp_id.clone(),
            request.staff_profile_id.clone(),
        );
        let session = self.load_session(&request.tenant_id, &session_key)?;

        let attendance = self.roster.attendance_for_day(&camp_day.camp_day_id)?;
        let snapshot_key = SnapshotKey {
            camp_day_id: camp_day.camp_day_id.clone(),
            staff_profile_id: request.staff_profile_id.clone(),
        };
        let previous = self.snapshots.fetch_snapshot(&snapshot_key)?;

        let snapshot = CampDayCompensationSnapshot {
            camp_day_id: camp_day.camp_day_id,
            camp_id: camp_day.camp_id,
            staff_profile_id: request.staff_profile_id,
            tenant_id: session.tenant_id,
            day_date: camp_day.day_date,
            enrolled_count: attendance.len() as u32,
            checked_in_count: count_status(
                &attendance,
                &[AttendanceStatus::CheckedIn, AttendanceStatus::CheckedOut],
            ),
            checked_out_count: count_status(&attendance, &[AttendanceStatus::CheckedOut]),
            no_show_count: count_status(&attendance, &[AttendanceStatus::NoShow]),
            csat_score: request
                .csat_score
                .or_else(|| previous.as_ref().and_then(|p| p.csat_score)),
            guest_speaker_count: request
                .guest_speaker_count
                .or_else(|| previous.as_ref().map(|p| p.guest_speaker_count))
                .unwrap_or(0),
            notes: request
                .notes
                .or_else(|| previous.as_ref().and_then(|p| p.notes.clone())),
            captured_at: Utc::now(),
        };

        Ok(self.snapshots.upsert_snapshot(snapshot)?)
    }

    /// Run the one-shot calculation and finalize the session.
    pub fn calculate(
        &self,
        session: SessionRef,
        overrides: MetricOverrides,
    ) -> Result<CalculationOutcome, CompensationServiceError> {
        overrides.validate()?;
        let key = session.key();
        let record = self.load_session(&session.tenant_id, &key)?;
        ensure_open(&record)?;

        let enrollment_count = self
            .roster
            .registrations_for_camp(&record.camp_id)?
            .iter()
            .filter(|registration| registration.status.counts_toward_enrollment())
            .count() as u32;

        let csat_score = overrides.csat_avg_score.or(record.metrics.csat_avg_score);
        let budget_preapproved = overrides
            .budget_preapproved_total
            .or(record.metrics.budget_preapproved_total);
        let budget_actual = overrides
            .budget_actual_total
            .or(record.metrics.budget_actual_total);
        let guest_speaker_count = match overrides
            .guest_speaker_count
            .or(record.metrics.guest_speaker_count)
        {
            Some(count) => count,
            None => self
                .snapshots
                .snapshots_for_session(&key)?
                .iter()
                .map(|snapshot| snapshot.guest_speaker_count)
                .sum(),
        };

        let breakdown = calculator::calculate(
            &record.plan,
            &ResolvedMetrics {
                enrollment_count,
                csat_score,
                budget_preapproved_total: budget_preapproved.unwrap_or(Money::ZERO),
                budget_actual_total: budget_actual.unwrap_or(Money::ZERO),
                guest_speaker_count,
            },
        );

        let metrics = PerformanceMetrics {
            enrollment_count,
            csat_avg_score: csat_score,
            budget_preapproved_total: budget_preapproved,
            budget_actual_total: budget_actual,
            budget_savings_amount: Some(breakdown.budget_efficiency.savings),
            guest_speaker_count: Some(guest_speaker_count),
        };
        let record = self
            .sessions
            .finalize_session(&key, metrics, breakdown.payout(), Utc::now())
            .map_err(|err| frozen_session(err, &key))?;
        info!(
            camp_id = %record.camp_id,
            staff_profile_id = %record.staff_profile_id,
            total = %breakdown.total_compensation,
            "session compensation finalized"
        );

        Ok(CalculationOutcome {
            total_compensation: breakdown.total_compensation,
            breakdown,
            session: record,
        })
    }

    /// Record budget, CSAT or guest-speaker figures ahead of the calculation.
    pub fn update_metrics(
        &self,
        session: SessionRef,
        update: MetricOverrides,
    ) -> Result<SessionCompensation, CompensationServiceError> {
        update.validate()?;
        let key = session.key();
        let record = self.load_session(&session.tenant_id, &key)?;
        ensure_open(&record)?;

        let mut metrics = record.metrics;
        if let Some(total) = update.budget_preapproved_total {
            metrics.budget_preapproved_total = Some(total);
        }
        if let Some(total) = update.budget_actual_total {
            metrics.budget_actual_total = Some(total);
        }
        if let Some(score) = update.csat_avg_score {
            metrics.csat_avg_score = Some(score);
        }
        if let Some(count) = update.guest_speaker_count {
            metrics.guest_speaker_count = Some(count);
        }
        metrics.budget_savings_amount =
            match (metrics.budget_preapproved_total, metrics.budget_actual_total) {
                (Some(preapproved), Some(actual)) => Some(budget_savings(preapproved, actual)),
                _ => None,
            };

        self.sessions
            .update_metrics(&key, metrics, Utc::now())
            .map_err(|err| frozen_session(err, &key))
    }

    pub fn session_detail(
        &self,
        session: &SessionRef,
    ) -> Result<SessionCompensation, CompensationServiceError> {
        self.load_session(&session.tenant_id, &session.key())
    }

    /// Daily snapshots for a session, earliest day first.
    pub fn daily_snapshots(
        &self,
        session: &SessionRef,
    ) -> Result<Vec<CampDayCompensationSnapshot>, CompensationServiceError> {
        let key = session.key();
        self.load_session(&session.tenant_id, &key)?;
        let mut snapshots = self.snapshots.snapshots_for_session(&key)?;
        snapshots.sort_by(|a, b| {
            a.day_date
                .cmp(&b.day_date)
                .then_with(|| a.camp_day_id.cmp(&b.camp_day_id))
        });
        Ok(snapshots)
    }

    pub fn tenant_overview(
        &self,
        tenant_id: &TenantId,
    ) -> Result<TenantCompensationOverview, CompensationServiceError> {
        let sessions = self.sessions.sessions_for_tenant(tenant_id)?;
        Ok(overview::tenant_overview(tenant_id, &sessions))
    }

    pub fn global_overview(&self) -> Result<GlobalCompensationOverview, CompensationServiceError> {
        let sessions = self.sessions.all_sessions()?;
        Ok(overview::global_overview(&sessions))
    }

    /// Season summary for a licensee director, using the configured season months.
    pub fn licensee_summary(
        &self,
        tenant_id: &TenantId,
        year: i32,
    ) -> Result<LicenseeIncentiveSummary, CompensationServiceError> {
        let season = self.config.season_for(year).ok_or_else(|| {
            CompensationServiceError::InvalidInput(format!("no incentive season exists for {year}"))
        })?;

        let sessions = self.sessions.sessions_for_tenant(tenant_id)?;
        let mut camp_starts = BTreeMap::new();
        for session in &sessions {
            if camp_starts.contains_key(&session.camp_id) {
                continue;
            }
            if let Some(camp) = self.roster.camp(&session.camp_id)? {
                camp_starts.insert(camp.camp_id, camp.start_date);
            }
        }

        Ok(overview::licensee_summary(
            tenant_id,
            season,
            &sessions,
            &camp_starts,
        ))
    }

    /// Finalized sessions, optionally limited to one tenant, in a stable payroll order.
    pub fn finalized_sessions(
        &self,
        tenant_id: Option<&TenantId>,
    ) -> Result<Vec<SessionCompensation>, CompensationServiceError> {
        let sessions = match tenant_id {
            Some(tenant_id) => self.sessions.sessions_for_tenant(tenant_id)?,
            None => self.sessions.all_sessions()?,
        };
        let mut finalized: Vec<SessionCompensation> = sessions
            .into_iter()
            .filter(|session| session.is_finalized)
            .collect();
        finalized.sort_by(|a, b| {
            (&a.tenant_id, &a.camp_id, &a.staff_profile_id).cmp(&(
                &b.tenant_id,
                &b.camp_id,
                &b.staff_profile_id,
            ))
        });
        Ok(finalized)
    }

    fn load_session(
        &self,
        tenant_id: &TenantId,
        key: &SessionKey,
    ) -> Result<SessionCompensation, CompensationServiceError> {
        let record = self.sessions.fetch_session(key)?.ok_or_else(|| {
            CompensationServiceError::NotFound(MissingEntity::SessionCompensation(key.clone()))
        })?;
        self.owned_by(record, tenant_id)
    }

    // Records of another tenant are indistinguishable from missing ones.
    fn owned_by(
        &self,
        record: SessionCompensation,
        tenant_id: &TenantId,
    ) -> Result<SessionCompensation, CompensationServiceError> {
        if &record.tenant_id == tenant_id {
            Ok(record)
        } else {
            Err(CompensationServiceError::NotFound(
                MissingEntity::SessionCompensation(record.key()),
            ))
        }
    }
}

// A checked-out camper was also checked in.
fn count_status(attendance: &[AttendanceRecord], wanted: &[AttendanceStatus]) -> u32 {
    attendance
        .iter()
        .filter(|record| wanted.contains(&record.status))
        .count() as u32
}

// The store refuses writes to a record finalized after it was read.
fn frozen_session(err: RepositoryError, key: &SessionKey) -> CompensationServiceError {
    match err {
        RepositoryError::Finalized => {
            warn!(
                camp_id = %key.camp_id,
                staff_profile_id = %key.staff_profile_id,
                "session compensation finalized concurrently"
            );
            CompensationServiceError::AlreadyFinalized {
                camp_id: key.camp_id.clone(),
                staff_profile_id: key.staff_profile_id.clone(),
            }
        }
        other => CompensationServiceError::Repository(other),
    }
}

fn ensure_open(record: &SessionCompensation) -> Result<(), CompensationServiceError> {
    if record.is_finalized {
        warn!(
            camp_id = %record.camp_id,
            staff_profile_id = %record.staff_profile_id,
            "rejected change to finalized session compensation"
        );
        return Err(CompensationServiceError::AlreadyFinalized {
            camp_id: record.camp_id.clone(),
            staff_profile_id: record.staff_profile_id.clone(),
        });
    }
    Ok(())
}

/// What a lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingEntity {
    Plan(PlanCode),
    SessionCompensation(SessionKey),
    CampDay(CampDayId),
}

impl fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEntity::Plan(code) => write!(f, "compensation plan '{code}'"),
            MissingEntity::SessionCompensation(key) => write!(
                f,
                "compensation for staff '{}' at camp '{}'",
                key.staff_profile_id, key.camp_id
            ),
            MissingEntity::CampDay(id) => write!(f, "camp day '{id}'"),
        }
    }
}

/// Error raised by the compensation service.
#[derive(Debug, thiserror::Error)]
pub enum CompensationServiceError {
    #[error("{0} not found")]
    NotFound(MissingEntity),
    #[error("compensation for staff '{staff_profile_id}' at camp '{camp_id}' is already finalized")]
    AlreadyFinalized {
        camp_id: CampId,
        staff_profile_id: StaffProfileId,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
