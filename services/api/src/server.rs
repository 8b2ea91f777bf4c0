use crate::cli::ServeArgs;
use crate::infra::{demo_plan, seed_demo_roster, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use camp_incentives::config::AppConfig;
use camp_incentives::error::AppError;
use camp_incentives::telemetry;
use camp_incentives::workflows::compensation::{
    CompensationService, CompensationServiceError, InMemoryCompensationStore,
};
use chrono::{Datelike, Utc};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryCompensationStore::default());
    let service = Arc::new(CompensationService::with_store(
        store.clone(),
        config.compensation,
    ));

    if args.seed_demo {
        seed_demo_roster(&store, Utc::now().year(), 65)
            .map_err(CompensationServiceError::from)?;
        service.upsert_plan(demo_plan())?;
        info!("sample camp roster and plan loaded");
    }

    let app = with_operational_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "compensation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
