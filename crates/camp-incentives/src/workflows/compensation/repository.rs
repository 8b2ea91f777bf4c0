use chrono::{DateTime, Utc};

use super::domain::{
    AttendanceRecord, Camp, CampDay, CampDayCompensationSnapshot, CampDayId, CampId,
    CompensationPlan, PayoutAmounts, PerformanceMetrics, PlanCode, PlanParameters, Registration,
    SessionCompensation, SessionKey, SnapshotKey, TenantId,
};

/// Storage for plan templates.
pub trait PlanRepository: Send + Sync {
    fn fetch_plan(&self, code: &PlanCode) -> Result<Option<CompensationPlan>, RepositoryError>;
    fn save_plan(&self, plan: CompensationPlan) -> Result<CompensationPlan, RepositoryError>;
    fn list_plans(&self) -> Result<Vec<CompensationPlan>, RepositoryError>;
}

/// Storage for per-(camp, staff) payout records.
///
/// Writes after creation touch only their own fields and must check `is_finalized` in the
/// same step as the write, returning `Finalized` once the record is frozen.
pub trait SessionCompensationRepository: Send + Sync {
    fn fetch_session(&self, key: &SessionKey)
        -> Result<Option<SessionCompensation>, RepositoryError>;
    /// Inserts a new record; `Conflict` when the key already exists.
    fn create_session(
        &self,
        record: SessionCompensation,
    ) -> Result<SessionCompensation, RepositoryError>;
    /// Replaces the plan snapshot only.
    fn refresh_plan_snapshot(
        &self,
        key: &SessionKey,
        plan_code: PlanCode,
        plan: PlanParameters,
        updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError>;
    /// Replaces the performance metrics only.
    fn update_metrics(
        &self,
        key: &SessionKey,
        metrics: PerformanceMetrics,
        updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError>;
    /// Stores the calculated figures and freezes the record.
    fn finalize_session(
        &self,
        key: &SessionKey,
        metrics: PerformanceMetrics,
        payout: PayoutAmounts,
        calculated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError>;
    fn sessions_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<SessionCompensation>, RepositoryError>;
    fn all_sessions(&self) -> Result<Vec<SessionCompensation>, RepositoryError>;
}

/// Storage for per-(camp day, staff) snapshots.
pub trait DailySnapshotRepository: Send + Sync {
    fn fetch_snapshot(
        &self,
        key: &SnapshotKey,
    ) -> Result<Option<CampDayCompensationSnapshot>, RepositoryError>;
    fn upsert_snapshot(
        &self,
        snapshot: CampDayCompensationSnapshot,
    ) -> Result<CampDayCompensationSnapshot, RepositoryError>;
    fn snapshots_for_session(
        &self,
        key: &SessionKey,
    ) -> Result<Vec<CampDayCompensationSnapshot>, RepositoryError>;
}

/// Read-only view of camps, camp days, attendance and registrations owned by the
/// registration side of the platform.
pub trait CampRoster: Send + Sync {
    fn camp(&self, camp_id: &CampId) -> Result<Option<Camp>, RepositoryError>;
    fn camp_day(&self, camp_day_id: &CampDayId) -> Result<Option<CampDay>, RepositoryError>;
    fn attendance_for_day(
        &self,
        camp_day_id: &CampDayId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    fn registrations_for_camp(
        &self,
        camp_id: &CampId,
    ) -> Result<Vec<Registration>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record is finalized")]
    Finalized,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
