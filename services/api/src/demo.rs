use crate::infra::{
    demo_camp, demo_day, demo_plan, demo_staff, demo_tenant, parse_money, parse_score,
    seed_demo_roster, DEMO_DAYS, DEMO_PLAN,
};
use camp_incentives::config::CompensationConfig;
use camp_incentives::error::AppError;
use camp_incentives::workflows::compensation::{
    export_finalized_csv, AttachPlan, CalculationOutcome, CompensationService,
    CompensationServiceError, DailySnapshotCapture, InMemoryCompensationStore, MetricOverrides,
    Money, PlanCode, Score, SessionRef,
};
use chrono::{Datelike, Utc};
use clap::Args;
use std::sync::Arc;

/// Inputs for the sample season. Defaults reproduce the $890 head coach payout.
#[derive(Args, Debug, Clone)]
pub(crate) struct ScenarioArgs {
    /// Confirmed registrations for the sample camp
    #[arg(long, default_value_t = 65)]
    pub(crate) enrolled: u32,
    /// Pre-approved budget total
    #[arg(long, value_parser = parse_money, default_value = "5000")]
    pub(crate) budget_preapproved: Money,
    /// Actual spend against the budget
    #[arg(long, value_parser = parse_money, default_value = "4200")]
    pub(crate) budget_actual: Money,
    /// Average customer satisfaction score
    #[arg(long, value_parser = parse_score, default_value = "4.7")]
    pub(crate) csat: Score,
    /// Guest speakers per camp day, comma separated
    #[arg(long, value_delimiter = ',', default_value = "1,2,1")]
    pub(crate) guest_speakers: Vec<u32>,
    /// Season year for the sample camp (defaults to the current year)
    #[arg(long)]
    pub(crate) year: Option<i32>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DemoArgs {
    #[command(flatten)]
    pub(crate) scenario: ScenarioArgs,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) scenario: ScenarioArgs,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (_, outcome) = finalize_sample_season(&args.scenario)?;

    println!("Camp staff compensation demo");
    println!(
        "- {} at {} on plan {}",
        outcome.session.staff_profile_id, outcome.session.camp_id, outcome.session.plan_code
    );
    println!(
        "- fixed stipends {} | variable bonus {} | total {}",
        outcome.session.payout.fixed_stipend_total,
        outcome.session.payout.total_variable_bonus,
        outcome.total_compensation
    );

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("Breakdown payload unavailable: {err}"),
    }
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let (service, _) = finalize_sample_season(&args.scenario)?;
    let sessions = service.finalized_sessions(None)?;

    let stdout = std::io::stdout();
    export_finalized_csv(stdout.lock(), &sessions)?;
    Ok(())
}

/// Seeds the sample camp, attaches the head coach plan, records one snapshot per listed day
/// and finalizes the payout.
pub(crate) fn finalize_sample_season(
    scenario: &ScenarioArgs,
) -> Result<(CompensationService, CalculationOutcome), AppError> {
    let year = scenario.year.unwrap_or_else(|| Utc::now().year());
    let store = Arc::new(InMemoryCompensationStore::default());
    seed_demo_roster(&store, year, scenario.enrolled).map_err(CompensationServiceError::from)?;

    let service = CompensationService::with_store(store, CompensationConfig::default());
    service.upsert_plan(demo_plan())?;
    service.attach_plan(AttachPlan {
        tenant_id: demo_tenant(),
        camp_id: demo_camp(),
        staff_profile_id: demo_staff(),
        plan_code: PlanCode::new(DEMO_PLAN),
    })?;

    for (index, speakers) in scenario
        .guest_speakers
        .iter()
        .take(DEMO_DAYS as usize)
        .enumerate()
    {
        service.capture_daily_snapshot(DailySnapshotCapture {
            tenant_id: demo_tenant(),
            camp_day_id: demo_day(index as u32 + 1),
            staff_profile_id: demo_staff(),
            csat_score: None,
            guest_speaker_count: Some(*speakers),
            notes: None,
        })?;
    }

    let session = SessionRef {
        tenant_id: demo_tenant(),
        camp_id: demo_camp(),
        staff_profile_id: demo_staff(),
    };
    let overrides = MetricOverrides {
        budget_preapproved_total: Some(scenario.budget_preapproved),
        budget_actual_total: Some(scenario.budget_actual),
        csat_avg_score: Some(scenario.csat),
        guest_speaker_count: None,
    };
    let outcome = service.calculate(session, overrides)?;
    Ok((service, outcome))
}
