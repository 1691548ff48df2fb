use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use super::domain::{
    DriverId, DriverOnboarding, IncidentId, IncidentReport, IncidentResolution, TripCompletion,
    TripId, TripRequest, TripStatus, VehicleId, VehicleRegistration,
};
use super::eligibility::Ineligibility;
use super::error::FleetError;
use super::lifecycle::TransitionError;
use super::repository::{Clock, FleetStore, RepositoryError};
use super::service::FleetDispatchService;

type SharedService<S, C> = Arc<FleetDispatchService<S, C>>;

/// Router builder exposing the dispatch, incident, and eligibility endpoints.
pub fn fleet_router<S, C>(service: SharedService<S, C>) -> Router
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route(
            "/api/v1/fleet/trips",
            post(create_trip_handler::<S, C>).get(list_trips_handler::<S, C>),
        )
        .route("/api/v1/fleet/trips/:trip_id", get(get_trip_handler::<S, C>))
        .route(
            "/api/v1/fleet/trips/:trip_id/dispatch",
            post(dispatch_trip_handler::<S, C>),
        )
        .route(
            "/api/v1/fleet/trips/:trip_id/complete",
            post(complete_trip_handler::<S, C>),
        )
        .route(
            "/api/v1/fleet/trips/:trip_id/cancel",
            post(cancel_trip_handler::<S, C>),
        )
        .route("/api/v1/fleet/incidents", post(file_incident_handler::<S, C>))
        .route(
            "/api/v1/fleet/incidents/:incident_id/resolve",
            post(resolve_incident_handler::<S, C>),
        )
        .route("/api/v1/fleet/vehicles", post(register_vehicle_handler::<S, C>))
        .route(
            "/api/v1/fleet/vehicles/:vehicle_id/:action",
            post(vehicle_maintenance_handler::<S, C>),
        )
        .route("/api/v1/fleet/drivers", post(onboard_driver_handler::<S, C>))
        .route(
            "/api/v1/fleet/drivers/:driver_id/eligibility",
            get(eligibility_handler::<S, C>),
        )
        .route(
            "/api/v1/fleet/drivers/:driver_id/safety",
            get(safety_profile_handler::<S, C>),
        )
        .with_state(service)
}

/// Maps the error taxonomy onto HTTP statuses with a stable `code` for clients.
pub(crate) fn error_response(error: FleetError) -> Response {
    let status = match &error {
        FleetError::NotFound { .. } => StatusCode::NOT_FOUND,
        FleetError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FleetError::Ineligible(Ineligibility::CapacityExceeded { .. })
        | FleetError::Transition(TransitionError::InvalidOdometerReading { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        FleetError::Ineligible(_)
        | FleetError::Transition(_)
        | FleetError::ConcurrentAssignmentConflict => StatusCode::CONFLICT,
        FleetError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        FleetError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
        "code": error.code(),
    });
    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, outcome: Result<T, FleetError>) -> Response {
    match outcome {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Malformed bodies, paths, and queries get the same `{error, code}` shape as domain errors.
fn rejected(rejection: impl fmt::Display) -> Response {
    error_response(FleetError::InvalidRequest(rejection.to_string()))
}

/// Runs a service call on the blocking pool. Exclusive sections park the calling thread, so
/// service calls never run on a runtime worker.
async fn run_blocking<T, F>(work: F) -> Result<T, FleetError>
where
    F: FnOnce() -> Result<T, FleetError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .unwrap_or_else(|join_error| {
            Err(FleetError::Repository(RepositoryError::Unavailable(format!(
                "dispatch worker stopped: {join_error}"
            ))))
        })
}

type Handled = Result<Response, Response>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TripFilter {
    #[serde(default)]
    pub(crate) status: Option<TripStatus>,
}

pub(crate) async fn create_trip_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    body: Result<Json<TripRequest>, JsonRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Json(request) = body.map_err(rejected)?;
    let outcome = run_blocking(move || service.create_trip(request)).await;
    Ok(respond(StatusCode::CREATED, outcome))
}

pub(crate) async fn list_trips_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    filter: Result<Query<TripFilter>, QueryRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Query(filter) = filter.map_err(rejected)?;
    let outcome = run_blocking(move || service.list_trips(filter.status)).await;
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn get_trip_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    trip_id: Result<Path<String>, PathRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path(trip_id) = trip_id.map_err(rejected)?;
    let outcome = run_blocking(move || service.get_trip(&TripId(trip_id))).await;
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn dispatch_trip_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    trip_id: Result<Path<String>, PathRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path(trip_id) = trip_id.map_err(rejected)?;
    let outcome = run_blocking(move || service.dispatch_trip(&TripId(trip_id))).await;
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn complete_trip_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    trip_id: Result<Path<String>, PathRejection>,
    body: Result<Json<TripCompletion>, JsonRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path(trip_id) = trip_id.map_err(rejected)?;
    let Json(completion) = body.map_err(rejected)?;
    let outcome = run_blocking(move || {
        service.complete_trip(&TripId(trip_id), completion.end_odometer_km)
    })
    .await;
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn cancel_trip_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    trip_id: Result<Path<String>, PathRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path(trip_id) = trip_id.map_err(rejected)?;
    let outcome = run_blocking(move || service.cancel_trip(&TripId(trip_id))).await;
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn file_incident_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    body: Result<Json<IncidentReport>, JsonRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Json(report) = body.map_err(rejected)?;
    let outcome = run_blocking(move || service.file_incident(report)).await;
    Ok(respond(StatusCode::CREATED, outcome))
}

pub(crate) async fn resolve_incident_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    incident_id: Result<Path<String>, PathRejection>,
    body: Result<Json<IncidentResolution>, JsonRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path(incident_id) = incident_id.map_err(rejected)?;
    let Json(resolution) = body.map_err(rejected)?;
    let outcome = run_blocking(move || {
        service.resolve_incident(&IncidentId(incident_id), resolution)
    })
    .await;
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn register_vehicle_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    body: Result<Json<VehicleRegistration>, JsonRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Json(registration) = body.map_err(rejected)?;
    let outcome = run_blocking(move || service.register_vehicle(registration)).await;
    Ok(respond(StatusCode::CREATED, outcome))
}

pub(crate) async fn vehicle_maintenance_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    params: Result<Path<(String, String)>, PathRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path((vehicle_id, action)) = params.map_err(rejected)?;
    let vehicle_id = VehicleId(vehicle_id);
    let outcome = match action.as_str() {
        "shop" => run_blocking(move || service.send_to_shop(&vehicle_id)).await,
        "release" => run_blocking(move || service.release_from_shop(&vehicle_id)).await,
        "retire" => run_blocking(move || service.retire_vehicle(&vehicle_id)).await,
        other => {
            let payload = json!({
                "error": format!("unknown vehicle action '{other}'"),
                "code": "not_found",
            });
            return Err((StatusCode::NOT_FOUND, Json(payload)).into_response());
        }
    };
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn onboard_driver_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    body: Result<Json<DriverOnboarding>, JsonRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Json(onboarding) = body.map_err(rejected)?;
    let outcome = run_blocking(move || service.onboard_driver(onboarding)).await;
    Ok(respond(StatusCode::CREATED, outcome))
}

pub(crate) async fn eligibility_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    driver_id: Result<Path<String>, PathRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path(driver_id) = driver_id.map_err(rejected)?;
    let outcome = run_blocking(move || service.driver_eligibility(&DriverId(driver_id))).await;
    Ok(respond(StatusCode::OK, outcome))
}

pub(crate) async fn safety_profile_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    driver_id: Result<Path<String>, PathRejection>,
) -> Handled
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    let Path(driver_id) = driver_id.map_err(rejected)?;
    let outcome =
        run_blocking(move || service.driver_safety_profile(&DriverId(driver_id))).await;
    Ok(respond(StatusCode::OK, outcome))
}
