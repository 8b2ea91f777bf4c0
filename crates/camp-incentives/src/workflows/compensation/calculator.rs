//! Bonus rules applied to a session's plan snapshot.
//!
//! Each rule is evaluated independently against the resolved metrics and the results are
//! summed with the fixed stipend. Nothing here touches storage, so the whole payout can be
//! audited from the returned [`CompensationBreakdown`].

use serde::{Deserialize, Serialize};

use super::domain::{PayoutAmounts, PlanParameters};
use super::money::{Money, Rate, Score};

/// Metric values after overrides and stored figures have been reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedMetrics {
    pub enrollment_count: u32,
    pub csat_score: Option<Score>,
    pub budget_preapproved_total: Money,
    pub budget_actual_total: Money,
    pub guest_speaker_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedStipendBreakdown {
    pub pre_camp: Money,
    pub on_site: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentBonusBreakdown {
    pub threshold: Option<u32>,
    pub per_camper_rate: Option<Money>,
    pub actual: u32,
    pub earned: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsatBonusBreakdown {
    pub required_score: Option<Score>,
    pub actual: Option<Score>,
    pub earned: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEfficiencyBreakdown {
    pub preapproved: Money,
    pub actual: Money,
    pub savings: Money,
    pub rate: Option<Rate>,
    pub earned: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSpeakerBreakdown {
    pub required_count: Option<u32>,
    pub actual: u32,
    pub earned: Money,
}

/// Full payout trail for display and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationBreakdown {
    pub fixed_stipend: FixedStipendBreakdown,
    pub enrollment: EnrollmentBonusBreakdown,
    pub csat: CsatBonusBreakdown,
    pub budget_efficiency: BudgetEfficiencyBreakdown,
    pub guest_speaker: GuestSpeakerBreakdown,
    pub total_variable_bonus: Money,
    pub total_compensation: Money,
}

impl CompensationBreakdown {
    pub fn payout(&self) -> PayoutAmounts {
        PayoutAmounts {
            enrollment_bonus_earned: self.enrollment.earned,
            csat_bonus_earned: self.csat.earned,
            budget_efficiency_bonus_earned: self.budget_efficiency.earned,
            guest_speaker_bonus_earned: self.guest_speaker.earned,
            fixed_stipend_total: self.fixed_stipend.total,
            total_variable_bonus: self.total_variable_bonus,
            total_compensation: self.total_compensation,
        }
    }
}

pub fn calculate(plan: &PlanParameters, metrics: &ResolvedMetrics) -> CompensationBreakdown {
    let fixed_stipend = FixedStipendBreakdown {
        pre_camp: plan.pre_camp_stipend,
        on_site: plan.on_site_stipend,
        total: plan.fixed_stipend_total(),
    };
    let enrollment = enrollment_bonus(plan, metrics.enrollment_count);
    let csat = csat_bonus(plan, metrics.csat_score);
    let budget_efficiency = budget_efficiency_bonus(
        plan,
        metrics.budget_preapproved_total,
        metrics.budget_actual_total,
    );
    let guest_speaker = guest_speaker_bonus(plan, metrics.guest_speaker_count);

    let total_variable_bonus =
        enrollment.earned + csat.earned + budget_efficiency.earned + guest_speaker.earned;

    CompensationBreakdown {
        fixed_stipend,
        enrollment,
        csat,
        budget_efficiency,
        guest_speaker,
        total_variable_bonus,
        total_compensation: fixed_stipend.total + total_variable_bonus,
    }
}

fn enrollment_bonus(plan: &PlanParameters, enrolled: u32) -> EnrollmentBonusBreakdown {
    let earned = match plan.enrollment_bonus {
        Some(rule) if enrolled > rule.threshold => {
            rule.per_camper_rate.times(enrolled - rule.threshold)
        }
        _ => Money::ZERO,
    };

    EnrollmentBonusBreakdown {
        threshold: plan.enrollment_bonus.map(|rule| rule.threshold),
        per_camper_rate: plan.enrollment_bonus.map(|rule| rule.per_camper_rate),
        actual: enrolled,
        earned,
    }
}

// All or nothing: never prorated toward the required score.
fn csat_bonus(plan: &PlanParameters, score: Option<Score>) -> CsatBonusBreakdown {
    let earned = match (plan.csat_bonus, score) {
        (Some(rule), Some(score)) if score >= rule.required_score => rule.bonus_amount,
        _ => Money::ZERO,
    };

    CsatBonusBreakdown {
        required_score: plan.csat_bonus.map(|rule| rule.required_score),
        actual: score,
        earned,
    }
}

fn budget_efficiency_bonus(
    plan: &PlanParameters,
    preapproved: Money,
    actual: Money,
) -> BudgetEfficiencyBreakdown {
    let savings = budget_savings(preapproved, actual);
    let rate = plan.budget_efficiency.map(|rule| rule.rate);
    let earned = rate.map_or(Money::ZERO, |rate| savings.apply_rate(rate));

    BudgetEfficiencyBreakdown {
        preapproved,
        actual,
        savings,
        rate,
        earned,
    }
}

/// Savings against the preapproved budget. A budget that was never set saves nothing.
pub fn budget_savings(preapproved: Money, actual: Money) -> Money {
    if preapproved.is_zero() {
        return Money::ZERO;
    }
    preapproved.saturating_sub(actual)
}

fn guest_speaker_bonus(plan: &PlanParameters, count: u32) -> GuestSpeakerBreakdown {
    let earned = match plan.guest_speaker {
        Some(rule) if rule.required_count > 0 && count >= rule.required_count => {
            rule.bonus_amount
        }
        _ => Money::ZERO,
    };

    GuestSpeakerBreakdown {
        required_count: plan.guest_speaker.map(|rule| rule.required_count),
        actual: count,
        earned,
    }
}
