use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use clap::Args;
use fleet_ops::config::DispatchConfig;
use fleet_ops::error::AppError;
use fleet_ops::workflows::dispatch::{
    Clock, DriverId, FleetDispatchService, FleetError, InMemoryFleetStore, IncidentReport,
    IncidentSeverity, IncidentType, ManualClock, SafetyPolicy, TripRequest, VehicleId,
};
use fleet_ops::workflows::roster::RosterImporter;
use std::path::PathBuf;
use std::sync::Arc;

type DemoService = FleetDispatchService<InMemoryFleetStore, ManualClock>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Scenario start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Vehicle roster CSV to use instead of the built-in sample fleet.
    #[arg(long)]
    pub(crate) vehicles_csv: Option<PathBuf>,
    /// Driver roster CSV to use instead of the built-in sample drivers.
    #[arg(long)]
    pub(crate) drivers_csv: Option<PathBuf>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        vehicles_csv,
        drivers_csv,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let opening = today
        .and_hms_opt(7, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now);

    let clock = Arc::new(ManualClock::new(opening));
    let service = FleetDispatchService::new(
        Arc::new(InMemoryFleetStore::default()),
        clock.clone(),
        DispatchConfig::default(),
        SafetyPolicy::default(),
    );

    println!("Fleet dispatch demo ({today})");
    load_roster(&service, vehicles_csv, drivers_csv, today)?;

    println!("\nMorning dispatch");
    let trip = service.create_trip(TripRequest {
        vehicle_id: VehicleId("van-01".to_string()),
        driver_id: DriverId("drv-001".to_string()),
        cargo_weight_kg: 950,
        start_odometer_km: 48_210,
        revenue_cents: Some(62_500),
    })?;
    println!("- {} drafted: van-01 with drv-001, 950 kg", trip.id);

    let trip = service.dispatch_trip(&trip.id)?;
    println!("- {} {}", trip.id, trip.status);
    report_outcome(
        "second trip for van-01",
        service.create_trip(TripRequest {
            vehicle_id: VehicleId("van-01".to_string()),
            driver_id: DriverId("drv-002".to_string()),
            cargo_weight_kg: 200,
            start_odometer_km: 48_210,
            revenue_cents: None,
        }),
    );
    report_outcome(
        "overweight load on pickup-01",
        service.create_trip(TripRequest {
            vehicle_id: VehicleId("pickup-01".to_string()),
            driver_id: DriverId("drv-002".to_string()),
            cargo_weight_kg: 1400,
            start_odometer_km: 22_750,
            revenue_cents: None,
        }),
    );

    clock.advance(Duration::hours(4));
    report_outcome(
        "odometer reading below start",
        service.complete_trip(&trip.id, 48_000),
    );
    let trip = service.complete_trip(&trip.id, 48_342)?;
    println!(
        "- {} {} after {} km",
        trip.id,
        trip.status,
        trip.end_odometer_km.unwrap_or(trip.start_odometer_km) - trip.start_odometer_km
    );
    report_outcome("re-dispatching a completed trip", service.dispatch_trip(&trip.id));

    println!("\nSafety desk");
    let driver_id = DriverId("drv-002".to_string());
    for (kind, severity) in [
        (IncidentType::Speeding, IncidentSeverity::Medium),
        (IncidentType::Accident, IncidentSeverity::High),
        (IncidentType::Accident, IncidentSeverity::High),
    ] {
        clock.advance(Duration::hours(1));
        let filed = service.file_incident(IncidentReport {
            driver_id: driver_id.clone(),
            trip_id: None,
            kind,
            severity,
            description: format!("{kind:?} flagged by telematics"),
            occurred_at: clock.now(),
            filed_by: "safety-desk".to_string(),
        })?;
        println!(
            "- {} {:?}/{:?}: score {} ({})",
            filed.incident.id,
            kind,
            severity,
            filed.assessment.score,
            filed.assessment.compliance_status.label()
        );
    }

    report_outcome(
        "assigning drv-002 after suspension",
        service.create_trip(TripRequest {
            vehicle_id: VehicleId("truck-01".to_string()),
            driver_id: driver_id.clone(),
            cargo_weight_kg: 3000,
            start_odometer_km: 132_004,
            revenue_cents: None,
        }),
    );

    clock.advance(Duration::days(service.safety_policy().recovery_period_days * 2));
    let recovered = service.recompute_safety(&driver_id)?;
    println!(
        "- {} clean periods later: score {} ({})",
        recovered.recovery_periods,
        recovered.score,
        recovered.compliance_status.label()
    );

    println!("\nEligibility");
    for id in ["drv-001", "drv-002", "drv-003"] {
        let verdict = service.driver_eligibility(&DriverId(id.to_string()))?;
        let reason = verdict
            .reason
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "eligible".to_string());
        println!(
            "- {id}: {reason} | persisted {} | effective {}",
            verdict.compliance_status.label(),
            verdict.effective_compliance.label()
        );
    }

    Ok(())
}

fn load_roster(
    service: &DemoService,
    vehicles_csv: Option<PathBuf>,
    drivers_csv: Option<PathBuf>,
    today: NaiveDate,
) -> Result<(), AppError> {
    let vehicles = match vehicles_csv {
        Some(path) => RosterImporter::vehicles_from_path(path)?,
        None => RosterImporter::vehicles_from_reader(SAMPLE_VEHICLES.as_bytes())?,
    };
    let drivers = match drivers_csv {
        Some(path) => RosterImporter::drivers_from_path(path)?,
        None => RosterImporter::drivers_from_reader(sample_drivers(today).as_bytes())?,
    };

    println!(
        "Roster: {} vehicles, {} drivers",
        vehicles.len(),
        drivers.len()
    );
    for registration in vehicles {
        service.register_vehicle(registration)?;
    }
    for onboarding in drivers {
        service.onboard_driver(onboarding)?;
    }
    Ok(())
}

const SAMPLE_VEHICLES: &str = "\
Id,Name,Max Capacity Kg,Odometer Km
van-01,Sprinter 314 CDI,1200,48210
truck-01,Isuzu NPR Box,4500,132004
pickup-01,Hilux Double Cab,900,22750
";

/// drv-003's license lands inside the warning window.
fn sample_drivers(today: NaiveDate) -> String {
    let far = today + Duration::days(720);
    let soon = today + Duration::days(20);
    format!(
        "Id,Name,License Expires On,Onboarded On\n\
drv-001,Amara Okafor,{far},\n\
drv-002,Tomasz Nowak,{far},\n\
drv-003,Priya Raman,{soon},\n"
    )
}

fn report_outcome<T>(label: &str, outcome: Result<T, FleetError>) {
    match outcome {
        Ok(_) => println!("- {label}: accepted"),
        Err(err) => println!("- {label}: rejected [{}] {err}", err.code()),
    }
}
