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

//! Range checks applied to caller supplied values before any computation or write.

use tracing::{debug, error};
use utils::numeric::is_within_i64_range;
use utils::units::TemperatureScale;
use crate::error::{EmissionsError, Result};

pub fn validate_user_id(user_id: i64) -> bool {
    if user_id <= 0 {
        error!("user_id {} is not a positive integer", user_id);
        return false;
    }
    debug!("user_id validated");
    true
}

/// Parses a user id typed in by a user or read from an import file
pub fn parse_user_id(value: &str) -> Result<i64> {
    let user_id = value.trim().parse::<i64>().map_err(|e| {
        EmissionsError::validation(format!("user id `{}` is not a valid integer. {}", value, e))
    })?;
    if !validate_user_id(user_id) {
        return Err(EmissionsError::validation(format!("user id must be positive, got {}", user_id)));
    }
    Ok(user_id)
}

/// Fuel quantities are fractional, so the 64-bit bound applies to the magnitude of the float
pub fn validate_fuel_used(fuel_used: f64) -> bool {
    if !fuel_used.is_finite() || fuel_used <= 0.0 {
        error!("fuel_used {} is not a positive number", fuel_used);
        return false;
    }
    if !is_within_i64_range(fuel_used) {
        error!("fuel_used {} is out of range", fuel_used);
        return false;
    }
    debug!("fuel_used validated");
    true
}

pub fn validate_emissions_result(emissions: f64) -> bool {
    if !emissions.is_finite() || emissions < 0.0 {
        error!("emissions {} is not a non-negative number", emissions);
        return false;
    }
    true
}

pub fn validate_temperature(value: f64, scale: TemperatureScale) -> Result<()> {
    if !value.is_finite() {
        return Err(EmissionsError::validation(format!("temperature {} is not a number", value)));
    }
    if value < scale.absolute_zero() {
        return Err(EmissionsError::validation(
            format!("temperature {} is below absolute zero for {}", value, scale)
        ));
    }
    Ok(())
}

/// Converts a numeric scale code (Celsius=0, Fahrenheit=1, Kelvin=2)
pub fn validate_temperature_scale(code: i64) -> Result<TemperatureScale> {
    TemperatureScale::try_from(code).map_err(|e| EmissionsError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use utils::units::TemperatureScale;
    use crate::error::EmissionsError;
    use crate::validation::*;

    #[test]
    fn user_ids() {
        assert_eq!(validate_user_id(-5), false);
        assert_eq!(validate_user_id(0), false);
        assert_eq!(validate_user_id(10), true);
        assert_eq!(validate_user_id(i64::MAX), true);
    }

    #[test]
    fn parsed_user_ids() {
        assert_eq!(parse_user_id(" 42 ").unwrap(), 42);
        assert!(matches!(parse_user_id("one"), Err(EmissionsError::Validation(_))));
        assert!(matches!(parse_user_id("0"), Err(EmissionsError::Validation(_))));
        assert!(matches!(parse_user_id("9223372036854775808"), Err(EmissionsError::Validation(_))));
    }

    #[test]
    fn fuel_used() {
        assert_eq!(validate_fuel_used(10.0), true);
        assert_eq!(validate_fuel_used(10.5), true);
        assert_eq!(validate_fuel_used(0.0), false);
        assert_eq!(validate_fuel_used(-1.0), false);
        assert_eq!(validate_fuel_used(f64::NAN), false);
        assert_eq!(validate_fuel_used(f64::INFINITY), false);
        assert_eq!(validate_fuel_used(1e19), false);
    }

    #[test]
    fn emissions_results() {
        assert_eq!(validate_emissions_result(0.0), true);
        assert_eq!(validate_emissions_result(10.5), true);
        assert_eq!(validate_emissions_result(-0.1), false);
        assert_eq!(validate_emissions_result(f64::NAN), false);
    }

    #[test]
    fn temperatures() {
        assert!(validate_temperature(-273.16, TemperatureScale::Celsius).is_err());
        assert!(validate_temperature(0.0, TemperatureScale::Celsius).is_ok());
        assert!(validate_temperature(-273.15, TemperatureScale::Celsius).is_ok());
        assert!(validate_temperature(-460.0, TemperatureScale::Fahrenheit).is_err());
        assert!(validate_temperature(-40.0, TemperatureScale::Fahrenheit).is_ok());
        assert!(validate_temperature(-0.01, TemperatureScale::Kelvin).is_err());
        assert!(validate_temperature(f64::NAN, TemperatureScale::Kelvin).is_err());
    }

    #[test]
    fn temperature_scale_codes() {
        assert_eq!(validate_temperature_scale(0).unwrap(), TemperatureScale::Celsius);
        assert_eq!(validate_temperature_scale(2).unwrap(), TemperatureScale::Kelvin);
        assert!(matches!(validate_temperature_scale(3), Err(EmissionsError::Validation(_))));
        assert!(matches!(validate_temperature_scale(-1), Err(EmissionsError::Validation(_))));
    }
}
