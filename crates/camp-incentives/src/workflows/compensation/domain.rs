use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::money::{Money, Rate, Score};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Licensee (franchise operator) identifier.
    TenantId
);
string_id!(CampId);
string_id!(CampDayId);
string_id!(
    /// Camp staff member receiving a payout.
    StaffProfileId
);
string_id!(
    /// Unique, enum-like code naming a compensation plan template.
    PlanCode
);
string_id!(RegistrationId);

/// Minimum enrollment after which every additional camper earns a per-camper bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentBonusRule {
    pub threshold: u32,
    pub per_camper_rate: Money,
}

/// Flat bonus paid when the CSAT average reaches the required score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsatBonusRule {
    pub required_score: Score,
    pub bonus_amount: Money,
}

/// Share of budget savings paid back as a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEfficiencyRule {
    pub rate: Rate,
}

/// Flat bonus paid once enough guest speakers have visited the camp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSpeakerRule {
    pub required_count: u32,
    pub bonus_amount: Money,
}

/// Stipends and bonus rules of a plan. Copied verbatim onto each session at attach time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanParameters {
    pub pre_camp_stipend: Money,
    pub on_site_stipend: Money,
    #[serde(default)]
    pub enrollment_bonus: Option<EnrollmentBonusRule>,
    #[serde(default)]
    pub csat_bonus: Option<CsatBonusRule>,
    #[serde(default)]
    pub budget_efficiency: Option<BudgetEfficiencyRule>,
    #[serde(default)]
    pub guest_speaker: Option<GuestSpeakerRule>,
}

impl PlanParameters {
    pub fn fixed_stipend_total(&self) -> Money {
        self.pre_camp_stipend + self.on_site_stipend
    }

    /// Describes the first parameter that cannot be paid out, if any.
    pub fn validation_error(&self) -> Option<String> {
        let amounts = [
            ("pre_camp_stipend", Some(self.pre_camp_stipend)),
            ("on_site_stipend", Some(self.on_site_stipend)),
            (
                "enrollment_bonus.per_camper_rate",
                self.enrollment_bonus.map(|rule| rule.per_camper_rate),
            ),
            (
                "csat_bonus.bonus_amount",
                self.csat_bonus.map(|rule| rule.bonus_amount),
            ),
            (
                "guest_speaker.bonus_amount",
                self.guest_speaker.map(|rule| rule.bonus_amount),
            ),
        ];
        for (field, amount) in amounts {
            if amount.is_some_and(|value| value.is_negative()) {
                return Some(format!("{field} must not be negative"));
            }
        }

        if let Some(rule) = self.csat_bonus {
            if rule.required_score < Score::default() {
                return Some(format!(
                    "csat_bonus.required_score {} must not be negative",
                    rule.required_score
                ));
            }
        }

        if let Some(rule) = self.budget_efficiency {
            if !rule.rate.is_within_unit_interval() {
                return Some(format!(
                    "budget_efficiency.rate {} must be between 0 and 1",
                    rule.rate
                ));
            }
        }

        None
    }
}

/// Reusable compensation template maintained by HQ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationPlan {
    pub plan_code: PlanCode,
    pub name: String,
    pub parameters: PlanParameters,
    pub updated_at: DateTime<Utc>,
}

/// Performance figures captured before a session is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub enrollment_count: u32,
    pub csat_avg_score: Option<Score>,
    pub budget_preapproved_total: Option<Money>,
    pub budget_actual_total: Option<Money>,
    pub budget_savings_amount: Option<Money>,
    pub guest_speaker_count: Option<u32>,
}

/// Computed payout amounts written when the session is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayoutAmounts {
    pub enrollment_bonus_earned: Money,
    pub csat_bonus_earned: Money,
    pub budget_efficiency_bonus_earned: Money,
    pub guest_speaker_bonus_earned: Money,
    pub fixed_stipend_total: Money,
    pub total_variable_bonus: Money,
    pub total_compensation: Money,
}

/// One staff member's payout record for one camp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCompensation {
    pub camp_id: CampId,
    pub staff_profile_id: StaffProfileId,
    pub tenant_id: TenantId,
    pub plan_code: PlanCode,
    pub plan: PlanParameters,
    pub metrics: PerformanceMetrics,
    pub payout: PayoutAmounts,
    pub is_finalized: bool,
    pub calculated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionCompensation {
    pub fn key(&self) -> SessionKey {
        SessionKey {
            camp_id: self.camp_id.clone(),
            staff_profile_id: self.staff_profile_id.clone(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_finalized {
            SessionStatus::Finalized
        } else {
            SessionStatus::Pending
        }
    }
}

/// Composite key of a session compensation record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub camp_id: CampId,
    pub staff_profile_id: StaffProfileId,
}

impl SessionKey {
    pub fn new(camp_id: CampId, staff_profile_id: StaffProfileId) -> Self {
        Self {
            camp_id,
            staff_profile_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Finalized,
}

/// Attendance and daily metrics for one staff member on one camp day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampDayCompensationSnapshot {
    pub camp_day_id: CampDayId,
    pub camp_id: CampId,
    pub staff_profile_id: StaffProfileId,
    pub tenant_id: TenantId,
    pub day_date: NaiveDate,
    pub enrolled_count: u32,
    pub checked_in_count: u32,
    pub checked_out_count: u32,
    pub no_show_count: u32,
    pub csat_score: Option<Score>,
    pub guest_speaker_count: u32,
    pub notes: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// Composite key of a daily snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotKey {
    pub camp_day_id: CampDayId,
    pub staff_profile_id: StaffProfileId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camp {
    pub camp_id: CampId,
    pub tenant_id: TenantId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampDay {
    pub camp_day_id: CampDayId,
    pub camp_id: CampId,
    pub day_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Expected,
    CheckedIn,
    CheckedOut,
    NoShow,
}

/// A registered camper's attendance on a camp day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub camp_day_id: CampDayId,
    pub registration_id: RegistrationId,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Waitlisted,
    Cancelled,
    Refunded,
}

impl RegistrationStatus {
    /// Registrations that count toward enrollment bonuses.
    pub fn counts_toward_enrollment(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub registration_id: RegistrationId,
    pub camp_id: CampId,
    pub status: RegistrationStatus,
}
