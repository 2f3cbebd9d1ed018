/*
 * Copyright (c):
 * 2024 zephyrj
 * zephyrj@protonmail.com
 *
 * This file is part of carbon-calculator.
 *
 * carbon-calculator is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * carbon-calculator is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with carbon-calculator. If not, see <https://www.gnu.org/licenses/>.
 */

use std::fmt::{Display, Formatter};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Row;
use rusqlite::types::Type;
use utils::numeric::{format_float_to, round_float_to, split_leading_float};
use utils::units::TemperatureScale;

pub type RecordId = i64;

pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp the way the store writes `CURRENT_TIMESTAMP`
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (both with optional fractional
/// seconds) and a bare `YYYY-MM-DD`, which is read as midnight
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|d| {
                d.and_hms_opt(0, 0, 0).unwrap_or_default()
            })
        })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    pub value: f64,
    pub scale: TemperatureScale
}

impl Temperature {
    pub fn new(value: f64, scale: TemperatureScale) -> Temperature {
        Temperature { value, scale }
    }

    pub fn celsius(value: f64) -> Temperature {
        Temperature::new(value, TemperatureScale::Celsius)
    }

    pub fn fahrenheit(value: f64) -> Temperature {
        Temperature::new(value, TemperatureScale::Fahrenheit)
    }

    pub fn kelvin(value: f64) -> Temperature {
        Temperature::new(value, TemperatureScale::Kelvin)
    }

    pub fn to_scale(&self, scale: TemperatureScale) -> Temperature {
        Temperature::new(scale.from_kelvin(self.scale.to_kelvin(self.value)), scale)
    }

    /// Reads the stored form, e.g. "25C" or "-4.5F"
    pub fn parse_stored(value: &str) -> Option<Temperature> {
        let (reading, suffix) = split_leading_float(value)?;
        let suffix = suffix.trim_start_matches('°');
        Some(Temperature::new(reading, suffix.parse().ok()?))
    }
}

impl Display for Temperature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", round_float_to(self.value, 2), self.scale.letter())
    }
}

/// A record as handed to the store. The store assigns the id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub user_id: i64,
    pub fuel_type: String,
    pub fuel_used: String,
    pub emissions: String,
    pub emissions_unit: Option<String>,
    pub temperature: Option<String>,
    pub farming_technique: Option<String>
}

/// A previously exported record being brought back in with its original timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRecord {
    pub record: NewRecord,
    pub timestamp: NaiveDateTime
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsRecord {
    pub id: RecordId,
    pub user_id: i64,
    pub fuel_type: String,
    pub fuel_used: String,
    pub emissions: String,
    pub emissions_unit: Option<String>,
    pub temperature: Option<String>,
    pub farming_technique: Option<String>,
    pub timestamp: NaiveDateTime
}

impl EmissionsRecord {
    pub(crate) const COLUMNS: &'static str =
        "id, user_id, fuel_type, fuel_used, emissions, emissions_unit, temperature, farming_technique, timestamp";

    pub(crate) fn load_from_row(row: &Row) -> rusqlite::Result<EmissionsRecord> {
        let timestamp: String = row.get(8)?;
        let timestamp = parse_timestamp(&timestamp).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e))
        })?;
        Ok(EmissionsRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            fuel_type: row.get(2)?,
            fuel_used: row.get(3)?,
            emissions: row.get(4)?,
            emissions_unit: row.get(5)?,
            temperature: row.get(6)?,
            farming_technique: row.get(7)?,
            timestamp
        })
    }

    pub fn emissions_value(&self) -> Option<f64> {
        split_leading_float(&self.emissions).map(|(value, _)| value)
    }

    /// The fuel quantity and unit name, e.g. (10.5, "Liters")
    pub fn fuel_quantity(&self) -> Option<(f64, &str)> {
        split_leading_float(&self.fuel_used)
    }

    pub fn temperature_reading(&self) -> Option<Temperature> {
        Temperature::parse_stored(self.temperature.as_deref()?)
    }
}

impl Display for EmissionsRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | user {} | {} | {} | {} {}",
               format_timestamp(&self.timestamp),
               self.user_id,
               self.fuel_type,
               self.fuel_used,
               self.emissions_value().map(|v| format_float_to(v, 2)).unwrap_or_else(|| self.emissions.clone()),
               self.emissions_unit.as_deref().unwrap_or(""))?;
        if let Some(temperature) = &self.temperature {
            write!(f, " | {}", temperature)?;
        }
        if let Some(technique) = &self.farming_technique {
            write!(f, " | {}", technique)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use utils::units::TemperatureScale;
    use super::*;

    #[test]
    fn timestamps_parse_in_every_accepted_form() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 30, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-01 12:30:05").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T12:30:05").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01").unwrap(),
                   NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        assert!(parse_timestamp("01/01/2024").is_err());
        assert_eq!(format_timestamp(&expected), "2024-01-01 12:30:05");
    }

    #[test]
    fn stored_temperatures() {
        assert_eq!(Temperature::celsius(25.0).to_string(), "25C");
        assert_eq!(Temperature::kelvin(293.15).to_string(), "293.15K");
        assert_eq!(Temperature::parse_stored("25C"), Some(Temperature::celsius(25.0)));
        assert_eq!(Temperature::parse_stored("-4.5°F"), Some(Temperature::fahrenheit(-4.5)));
        assert_eq!(Temperature::parse_stored("25"), None);
        let converted = Temperature::celsius(20.0).to_scale(TemperatureScale::Fahrenheit);
        assert!((converted.value - 68.0).abs() < 1e-9);
        let from_kelvin = Temperature::kelvin(296.0).to_scale(TemperatureScale::Celsius);
        assert_eq!(from_kelvin.to_string(), "22.85C");
        assert_eq!(Temperature::parse_stored(&from_kelvin.to_string()), Some(Temperature::celsius(22.85)));
    }
}
