use chrono::NaiveDate;
use fleet_ops::error::AppError;
use fleet_ops::workflows::dispatch::{Clock, FleetDispatchService, FleetStore};
use fleet_ops::workflows::roster::RosterImporter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RosterCounts {
    pub(crate) vehicles: usize,
    pub(crate) drivers: usize,
}

/// Registers every vehicle and driver from the given roster files. The first rejected
/// record aborts the load.
pub(crate) fn seed_roster<S, C>(
    service: &FleetDispatchService<S, C>,
    vehicles_csv: Option<&Path>,
    drivers_csv: Option<&Path>,
) -> Result<RosterCounts, AppError>
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let mut counts = RosterCounts::default();

    if let Some(path) = vehicles_csv {
        for registration in RosterImporter::vehicles_from_path(path)? {
            service.register_vehicle(registration)?;
            counts.vehicles += 1;
        }
        info!(path = %path.display(), vehicles = counts.vehicles, "vehicle roster loaded");
    }

    if let Some(path) = drivers_csv {
        for onboarding in RosterImporter::drivers_from_path(path)? {
            service.onboard_driver(onboarding)?;
            counts.drivers += 1;
        }
        info!(path = %path.display(), drivers = counts.drivers, "driver roster loaded");
    }

    Ok(counts)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
