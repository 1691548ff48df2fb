//! Bulk vehicle and driver registration from CSV exports.

mod parser;

use std::io::Read;
use std::path::Path;

use crate::workflows::dispatch::{DriverId, DriverOnboarding, VehicleId, VehicleRegistration};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Invalid(String),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster file: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::Invalid(detail) => write!(f, "invalid roster entry: {}", detail),
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn vehicles_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<VehicleRegistration>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::vehicles_from_reader(file)
    }

    /// Expects the columns `Id,Name,Max Capacity Kg,Odometer Km`. A blank odometer reads as 0.
    pub fn vehicles_from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<VehicleRegistration>, RosterImportError> {
        let mut registrations = Vec::new();

        for (index, row) in parser::vehicle_rows(reader)?.into_iter().enumerate() {
            let line = index + 2;
            require_text(&row.id, "Id", line)?;
            require_text(&row.name, "Name", line)?;

            let odometer_km = match row.odometer_km.as_deref() {
                Some(value) => value.parse::<u64>().map_err(|_| {
                    RosterImportError::Invalid(format!(
                        "line {line}: odometer '{value}' is not a whole number of km"
                    ))
                })?,
                None => 0,
            };

            registrations.push(VehicleRegistration {
                id: VehicleId(row.id),
                name: row.name,
                max_capacity_kg: row.max_capacity_kg,
                odometer_km,
            });
        }

        Ok(registrations)
    }

    pub fn drivers_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<DriverOnboarding>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::drivers_from_reader(file)
    }

    /// Expects the columns `Id,Name,License Expires On,Onboarded On`. Dates are `YYYY-MM-DD`;
    /// the onboarding column also accepts RFC 3339 and may be left blank.
    pub fn drivers_from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<DriverOnboarding>, RosterImportError> {
        let mut onboardings = Vec::new();

        for (index, row) in parser::driver_rows(reader)?.into_iter().enumerate() {
            let line = index + 2;
            require_text(&row.id, "Id", line)?;
            require_text(&row.name, "Name", line)?;

            let license_expires_on = parser::parse_date(&row.license_expires_on).ok_or_else(|| {
                RosterImportError::Invalid(format!(
                    "line {line}: license expiry '{}' is not a YYYY-MM-DD date",
                    row.license_expires_on
                ))
            })?;

            let onboarded_at = match row.onboarded_on.as_deref() {
                Some(value) => Some(parser::parse_timestamp(value).ok_or_else(|| {
                    RosterImportError::Invalid(format!(
                        "line {line}: onboarding date '{value}' is not recognised"
                    ))
                })?),
                None => None,
            };

            onboardings.push(DriverOnboarding {
                id: DriverId(row.id),
                name: row.name,
                license_expires_on,
                onboarded_at,
            });
        }

        Ok(onboardings)
    }
}

fn require_text(value: &str, column: &str, line: usize) -> Result<(), RosterImportError> {
    if value.trim().is_empty() {
        return Err(RosterImportError::Invalid(format!(
            "line {line}: column '{column}' is empty"
        )));
    }
    Ok(())
}
