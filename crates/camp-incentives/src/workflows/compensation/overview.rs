//! Dashboard rollups over session compensation records.
//!
//! Records are grouped in memory; season-scale volumes (tens to low hundreds of sessions per
//! tenant) keep this cheap enough to run per request.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::domain::{CampId, SessionCompensation, StaffProfileId, TenantId};
use super::money::{Money, Score};

/// Inclusive date range of an incentive season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonWindow {
    /// From the first day of `start_month` through the last day of `end_month`.
    pub fn for_months(year: i32, start_month: u32, end_month: u32) -> Option<Self> {
        if start_month > end_month {
            return None;
        }
        let start = NaiveDate::from_ymd_opt(year, start_month, 1)?;
        let end = if end_month == 12 {
            NaiveDate::from_ymd_opt(year, 12, 31)?
        } else {
            NaiveDate::from_ymd_opt(year, end_month + 1, 1)?.pred_opt()?
        };
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffCompensationSummary {
    pub staff_profile_id: StaffProfileId,
    pub session_count: usize,
    pub camps: Vec<CampId>,
    pub total_enrollment: u32,
    pub average_csat: Option<Score>,
    pub total_fixed_stipend: Money,
    pub total_variable_bonus: Money,
    pub total_compensation: Money,
    pub average_compensation: Option<Money>,
}

/// Finalized payouts within one tenant, per staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantCompensationOverview {
    pub tenant_id: TenantId,
    pub session_count: usize,
    pub staff_count: usize,
    pub total_fixed_stipend: Money,
    pub total_variable_bonus: Money,
    pub total_compensation: Money,
    pub staff: Vec<StaffCompensationSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRollup {
    pub tenant_id: TenantId,
    pub session_count: usize,
    pub staff_count: usize,
    pub total_fixed_stipend: Money,
    pub total_variable_bonus: Money,
    pub total_compensation: Money,
    pub average_per_session: Option<Money>,
}

/// Finalized payouts across the whole platform, per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalCompensationOverview {
    pub tenant_count: usize,
    pub session_count: usize,
    pub total_compensation: Money,
    pub tenants: Vec<TenantRollup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseeStaffEntry {
    pub staff_profile_id: StaffProfileId,
    pub finalized_sessions: usize,
    pub pending_sessions: usize,
    pub finalized_compensation: Money,
    pub pending_fixed_stipend: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FinalizedTotals {
    pub session_count: usize,
    pub total_fixed_stipend: Money,
    pub total_variable_bonus: Money,
    pub total_compensation: Money,
}

/// Pending sessions have no computed bonuses yet; only their stipends are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PendingTotals {
    pub session_count: usize,
    pub projected_fixed_stipend: Money,
}

/// A director's season view, separating finalized payouts from pending sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseeIncentiveSummary {
    pub tenant_id: TenantId,
    pub season: SeasonWindow,
    pub finalized: FinalizedTotals,
    pub pending: PendingTotals,
    pub staff: Vec<LicenseeStaffEntry>,
}

pub fn tenant_overview(
    tenant_id: &TenantId,
    sessions: &[SessionCompensation],
) -> TenantCompensationOverview {
    let finalized: Vec<&SessionCompensation> = sessions
        .iter()
        .filter(|session| session.is_finalized && &session.tenant_id == tenant_id)
        .collect();

    let staff = summarize_staff(&finalized);

    TenantCompensationOverview {
        tenant_id: tenant_id.clone(),
        session_count: finalized.len(),
        staff_count: staff.len(),
        total_fixed_stipend: finalized.iter().map(|s| s.payout.fixed_stipend_total).sum(),
        total_variable_bonus: finalized.iter().map(|s| s.payout.total_variable_bonus).sum(),
        total_compensation: finalized.iter().map(|s| s.payout.total_compensation).sum(),
        staff,
    }
}

pub fn global_overview(sessions: &[SessionCompensation]) -> GlobalCompensationOverview {
    let mut by_tenant: BTreeMap<&TenantId, Vec<&SessionCompensation>> = BTreeMap::new();
    for session in sessions.iter().filter(|session| session.is_finalized) {
        by_tenant.entry(&session.tenant_id).or_default().push(session);
    }

    let mut tenants: Vec<TenantRollup> = by_tenant
        .into_iter()
        .map(|(tenant_id, records)| {
            let staff: BTreeSet<&StaffProfileId> =
                records.iter().map(|s| &s.staff_profile_id).collect();
            let total_compensation: Money =
                records.iter().map(|s| s.payout.total_compensation).sum();
            TenantRollup {
                tenant_id: tenant_id.clone(),
                session_count: records.len(),
                staff_count: staff.len(),
                total_fixed_stipend: records.iter().map(|s| s.payout.fixed_stipend_total).sum(),
                total_variable_bonus: records.iter().map(|s| s.payout.total_variable_bonus).sum(),
                total_compensation,
                average_per_session: total_compensation.average_over(records.len()),
            }
        })
        .collect();
    tenants.sort_by(|a, b| {
        b.total_compensation
            .cmp(&a.total_compensation)
            .then_with(|| a.tenant_id.cmp(&b.tenant_id))
    });

    GlobalCompensationOverview {
        tenant_count: tenants.len(),
        session_count: tenants.iter().map(|t| t.session_count).sum(),
        total_compensation: tenants.iter().map(|t| t.total_compensation).sum(),
        tenants,
    }
}

/// Sessions whose camp start date is unknown or outside `season` are left out.
pub fn licensee_summary(
    tenant_id: &TenantId,
    season: SeasonWindow,
    sessions: &[SessionCompensation],
    camp_starts: &BTreeMap<CampId, NaiveDate>,
) -> LicenseeIncentiveSummary {
    let mut finalized = FinalizedTotals::default();
    let mut pending = PendingTotals::default();
    let mut staff: BTreeMap<&StaffProfileId, LicenseeStaffEntry> = BTreeMap::new();

    let in_season = sessions.iter().filter(|session| {
        &session.tenant_id == tenant_id
            && camp_starts
                .get(&session.camp_id)
                .is_some_and(|start| season.contains(*start))
    });

    for session in in_season {
        let entry = staff
            .entry(&session.staff_profile_id)
            .or_insert_with(|| LicenseeStaffEntry {
                staff_profile_id: session.staff_profile_id.clone(),
                finalized_sessions: 0,
                pending_sessions: 0,
                finalized_compensation: Money::ZERO,
                pending_fixed_stipend: Money::ZERO,
            });

        if session.is_finalized {
            finalized.session_count += 1;
            finalized.total_fixed_stipend =
                finalized.total_fixed_stipend + session.payout.fixed_stipend_total;
            finalized.total_variable_bonus =
                finalized.total_variable_bonus + session.payout.total_variable_bonus;
            finalized.total_compensation =
                finalized.total_compensation + session.payout.total_compensation;
            entry.finalized_sessions += 1;
            entry.finalized_compensation =
                entry.finalized_compensation + session.payout.total_compensation;
        } else {
            let stipend = session.plan.fixed_stipend_total();
            pending.session_count += 1;
            pending.projected_fixed_stipend = pending.projected_fixed_stipend + stipend;
            entry.pending_sessions += 1;
            entry.pending_fixed_stipend = entry.pending_fixed_stipend + stipend;
        }
    }

    LicenseeIncentiveSummary {
        tenant_id: tenant_id.clone(),
        season,
        finalized,
        pending,
        staff: staff.into_values().collect(),
    }
}

fn summarize_staff(sessions: &[&SessionCompensation]) -> Vec<StaffCompensationSummary> {
    let mut grouped: BTreeMap<&StaffProfileId, Vec<&SessionCompensation>> = BTreeMap::new();
    for &session in sessions {
        grouped
            .entry(&session.staff_profile_id)
            .or_default()
            .push(session);
    }

    let mut summaries: Vec<StaffCompensationSummary> = grouped
        .into_iter()
        .map(|(staff_profile_id, records)| {
            let total_compensation: Money =
                records.iter().map(|s| s.payout.total_compensation).sum();
            StaffCompensationSummary {
                staff_profile_id: staff_profile_id.clone(),
                session_count: records.len(),
                camps: records.iter().map(|s| s.camp_id.clone()).collect(),
                total_enrollment: records.iter().map(|s| s.metrics.enrollment_count).sum(),
                average_csat: Score::mean(records.iter().filter_map(|s| s.metrics.csat_avg_score)),
                total_fixed_stipend: records.iter().map(|s| s.payout.fixed_stipend_total).sum(),
                total_variable_bonus: records.iter().map(|s| s.payout.total_variable_bonus).sum(),
                total_compensation,
                average_compensation: total_compensation.average_over(records.len()),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_compensation
            .cmp(&a.total_compensation)
            .then_with(|| a.staff_profile_id.cmp(&b.staff_profile_id))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_window_spans_whole_months() {
        let season = SeasonWindow::for_months(2026, 4, 8).expect("valid months");
        assert_eq!(season.start, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
        assert_eq!(season.end, NaiveDate::from_ymd_opt(2026, 8, 31).unwrap());
        assert!(season.contains(NaiveDate::from_ymd_opt(2026, 8, 31).unwrap()));
        assert!(!season.contains(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()));
        assert!(!season.contains(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()));
        assert_eq!(season.year(), 2026);
    }

    #[test]
    fn season_window_handles_december_and_bad_ranges() {
        let season = SeasonWindow::for_months(2026, 11, 12).expect("valid months");
        assert_eq!(season.end, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        assert!(SeasonWindow::for_months(2026, 9, 4).is_none());
        assert!(SeasonWindow::for_months(2026, 0, 4).is_none());
    }
}
