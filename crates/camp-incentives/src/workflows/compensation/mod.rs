//! Camp staff compensation: plan snapshots, daily metrics, the one-shot payout calculation
//! and dashboard rollups.

pub mod calculator;
pub mod domain;
pub mod export;
pub mod memory;
pub mod money;
pub mod overview;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use calculator::{CompensationBreakdown, ResolvedMetrics};
pub use domain::{
    AttendanceRecord, AttendanceStatus, BudgetEfficiencyRule, Camp, CampDay,
    CampDayCompensationSnapshot, CampDayId, CampId, CompensationPlan, CsatBonusRule,
    EnrollmentBonusRule, GuestSpeakerRule, PayoutAmounts, PerformanceMetrics, PlanCode,
    PlanParameters, Registration, RegistrationId, RegistrationStatus, SessionCompensation,
    SessionKey, SessionStatus, StaffProfileId, TenantId,
};
pub use export::{export_finalized_csv, PayrollExportError};
pub use memory::InMemoryCompensationStore;
pub use money::{Money, Rate, Score};
pub use overview::{
    GlobalCompensationOverview, LicenseeIncentiveSummary, SeasonWindow,
    TenantCompensationOverview,
};
pub use repository::{
    CampRoster, DailySnapshotRepository, PlanRepository, RepositoryError,
    SessionCompensationRepository,
};
pub use router::compensation_router;
pub use service::{
    AttachPlan, CalculationOutcome, CompensationService, CompensationServiceError,
    DailySnapshotCapture, MetricOverrides, MissingEntity, PlanDraft, SessionRef,
};
