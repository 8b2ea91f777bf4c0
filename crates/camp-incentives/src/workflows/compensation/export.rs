use std::io::Write;

use serde::Serialize;

use super::domain::SessionCompensation;

#[derive(Debug, thiserror::Error)]
pub enum PayrollExportError {
    #[error("failed to write payroll csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush payroll csv: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct PayrollRow<'a> {
    tenant_id: &'a str,
    camp_id: &'a str,
    staff_profile_id: &'a str,
    plan_code: &'a str,
    fixed_stipend_total: String,
    enrollment_bonus_earned: String,
    csat_bonus_earned: String,
    budget_efficiency_bonus_earned: String,
    guest_speaker_bonus_earned: String,
    total_variable_bonus: String,
    total_compensation: String,
    calculated_at: String,
}

impl<'a> PayrollRow<'a> {
    fn from_session(session: &'a SessionCompensation) -> Self {
        let payout = &session.payout;
        Self {
            tenant_id: session.tenant_id.as_str(),
            camp_id: session.camp_id.as_str(),
            staff_profile_id: session.staff_profile_id.as_str(),
            plan_code: session.plan_code.as_str(),
            fixed_stipend_total: payout.fixed_stipend_total.to_string(),
            enrollment_bonus_earned: payout.enrollment_bonus_earned.to_string(),
            csat_bonus_earned: payout.csat_bonus_earned.to_string(),
            budget_efficiency_bonus_earned: payout.budget_efficiency_bonus_earned.to_string(),
            guest_speaker_bonus_earned: payout.guest_speaker_bonus_earned.to_string(),
            total_variable_bonus: payout.total_variable_bonus.to_string(),
            total_compensation: payout.total_compensation.to_string(),
            calculated_at: session
                .calculated_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

/// Writes one payroll row per finalized session. Pending sessions are skipped.
///
/// Amounts are written as fixed two-place decimals so spreadsheets do not reformat them.
pub fn export_finalized_csv<W: Write>(
    writer: W,
    sessions: &[SessionCompensation],
) -> Result<usize, PayrollExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for session in sessions.iter().filter(|session| session.is_finalized) {
        csv_writer.serialize(PayrollRow::from_session(session))?;
        rows += 1;
    }
    if rows == 0 {
        csv_writer.write_record(HEADERS)?;
    }
    csv_writer.flush()?;
    Ok(rows)
}

const HEADERS: [&str; 12] = [
    "tenant_id",
    "camp_id",
    "staff_profile_id",
    "plan_code",
    "fixed_stipend_total",
    "enrollment_bonus_earned",
    "csat_bonus_earned",
    "budget_efficiency_bonus_earned",
    "guest_speaker_bonus_earned",
    "total_variable_bonus",
    "total_compensation",
    "calculated_at",
];
