use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug, Deserialize)]
pub(crate) struct VehicleRow {
    #[serde(rename = "Id")]
    pub(crate) id: String,
    #[serde(rename = "Name")]
    pub(crate) name: String,
    #[serde(rename = "Max Capacity Kg")]
    pub(crate) max_capacity_kg: u32,
    #[serde(
        rename = "Odometer Km",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) odometer_km: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverRow {
    #[serde(rename = "Id")]
    pub(crate) id: String,
    #[serde(rename = "Name")]
    pub(crate) name: String,
    #[serde(rename = "License Expires On")]
    pub(crate) license_expires_on: String,
    #[serde(
        rename = "Onboarded On",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) onboarded_on: Option<String>,
}

pub(crate) fn vehicle_rows<R: Read>(reader: R) -> Result<Vec<VehicleRow>, csv::Error> {
    rows(reader)
}

pub(crate) fn driver_rows<R: Read>(reader: R) -> Result<Vec<DriverRow>, csv::Error> {
    rows(reader)
}

fn rows<R, T>(reader: R) -> Result<Vec<T>, csv::Error>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<T>().collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Accepts RFC 3339 timestamps or bare dates (midnight UTC).
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    parse_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
