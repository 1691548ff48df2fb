use crate::cli::ServeArgs;
use crate::infra::{seed_roster, AppState};
use crate::routes::with_fleet_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fleet_ops::config::AppConfig;
use fleet_ops::error::AppError;
use fleet_ops::telemetry;
use fleet_ops::workflows::dispatch::{
    FleetDispatchService, InMemoryFleetStore, SafetyPolicy, SystemClock,
};
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

    let store = Arc::new(InMemoryFleetStore::default());
    let dispatch_service = Arc::new(FleetDispatchService::new(
        store,
        Arc::new(SystemClock),
        config.dispatch,
        SafetyPolicy::default(),
    ));

    let seeded = seed_roster(
        &dispatch_service,
        args.vehicles_csv.as_deref(),
        args.drivers_csv.as_deref(),
    )?;

    let app = with_fleet_routes(dispatch_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        vehicles = seeded.vehicles,
        drivers = seeded.drivers,
        conflict_retries = config.dispatch.conflict_retries,
        "fleet dispatch service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
