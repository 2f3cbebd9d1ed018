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

//! Turns a fuel consumption event into an emissions estimate and records it.

use tracing::{debug, info};
use utils::numeric::format_float_to;
use utils::units::{MassUnit, TemperatureScale, Unit};
use crate::error::{EmissionsError, Result};
use crate::factors::FactorSource;
use crate::record::{EmissionsRecord, NewRecord, Temperature};
use crate::store::HistoryStore;
use crate::validation::{validate_emissions_result, validate_fuel_used, validate_temperature, validate_user_id};

pub const EMISSIONS_DECIMAL_PLACES: u32 = 2;

/// Reference temperature the adjustment measures deviation against
pub fn baseline_temperature(scale: TemperatureScale) -> f64 {
    match scale {
        TemperatureScale::Celsius => 20.0,
        TemperatureScale::Fahrenheit => 68.0,
        TemperatureScale::Kelvin => 293.15
    }
}

/// Penalises deviation from the baseline quadratically, so readings above and below the
/// baseline by the same relative amount raise the factor equally
pub fn temperature_adjusted_factor(factor: f64, temperature: &Temperature) -> f64 {
    let baseline = baseline_temperature(temperature.scale);
    let deviation = (temperature.value - baseline) / baseline;
    factor * (1.0 + deviation.powi(2))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub user_id: i64,
    pub fuel_type: String,
    pub fuel_used: f64,
    pub fuel_unit: String,
    pub temperature: Option<Temperature>,
    pub farming_technique: Option<String>,
    pub output_unit: MassUnit
}

impl CalculationRequest {
    pub fn new(user_id: i64, fuel_type: &str, fuel_used: f64, fuel_unit: &str) -> CalculationRequest {
        CalculationRequest {
            user_id,
            fuel_type: fuel_type.to_string(),
            fuel_used,
            fuel_unit: fuel_unit.to_string(),
            temperature: None,
            farming_technique: None,
            output_unit: MassUnit::default()
        }
    }

    pub fn with_temperature(mut self, temperature: Temperature) -> CalculationRequest {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_farming_technique(mut self, technique: &str) -> CalculationRequest {
        self.farming_technique = Some(technique.to_string());
        self
    }

    pub fn with_output_unit(mut self, unit: MassUnit) -> CalculationRequest {
        self.output_unit = unit;
        self
    }
}

/// The numbers behind a calculation, before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub fuel_unit: Unit,
    pub fuel_used_base: f64,
    pub base_unit: Unit,
    pub fuel_factor: f64,
    pub effective_factor: f64,
    pub emissions_kg: f64,
    pub emissions: f64,
    pub output_unit: MassUnit
}

impl Estimate {
    /// Rounded for display. Stored records keep the full value
    pub fn formatted_emissions(&self) -> String {
        format_float_to(self.emissions, EMISSIONS_DECIMAL_PLACES)
    }
}

/// Runs every check and conversion of a calculation without touching the history store
pub fn estimate<F: FactorSource + ?Sized>(factors: &F, request: &CalculationRequest) -> Result<Estimate> {
    if !validate_user_id(request.user_id) {
        return Err(EmissionsError::Validation(
            format!("user id must be a positive integer, got {}", request.user_id)
        ));
    }
    if !validate_fuel_used(request.fuel_used) {
        return Err(EmissionsError::Validation(
            format!("fuel used must be a positive number, got {}", request.fuel_used)
        ));
    }

    let fuel_unit: Unit = request.fuel_unit.parse()?;
    let fuel_used_base = fuel_unit.to_base(request.fuel_used);
    let base_unit = fuel_unit.family().base_unit();
    debug!("{} {} is {} {}", request.fuel_used, fuel_unit, fuel_used_base, base_unit);

    let fuel_factor = factors.fuel_factor(&request.fuel_type)?;
    let mut effective_factor = fuel_factor;
    match &request.temperature {
        Some(temperature) => {
            validate_temperature(temperature.value, temperature.scale)?;
            effective_factor = temperature_adjusted_factor(effective_factor, temperature);
            info!("Temperature data available, factor for {} adjusted from {} to {}",
                  request.fuel_type, fuel_factor, effective_factor);
        }
        None => {
            info!("Temperature data not available, using standard factor for {}", request.fuel_type);
        }
    }
    if let Some(technique) = &request.farming_technique {
        let modifier = factors.technique_modifier(technique)?;
        effective_factor *= modifier;
        debug!("Applied {} modifier {}", technique, modifier);
    }

    let emissions_kg = fuel_used_base * effective_factor;
    if !validate_emissions_result(emissions_kg) {
        return Err(EmissionsError::Validation(
            format!("calculated emissions {} are invalid; check the factor for {}", emissions_kg, request.fuel_type)
        ));
    }

    Ok(Estimate {
        fuel_unit,
        fuel_used_base,
        base_unit,
        fuel_factor,
        effective_factor,
        emissions_kg,
        emissions: request.output_unit.from_kilograms(emissions_kg),
        output_unit: request.output_unit
    })
}

pub struct EmissionsCalculator<'a, 'b, F: FactorSource + ?Sized, S: HistoryStore + ?Sized> {
    factors: &'a F,
    store: &'b S
}

impl<'a, 'b, F: FactorSource + ?Sized, S: HistoryStore + ?Sized> EmissionsCalculator<'a, 'b, F, S> {
    pub fn new(factors: &'a F, store: &'b S) -> EmissionsCalculator<'a, 'b, F, S> {
        EmissionsCalculator { factors, store }
    }

    pub fn estimate(&self, request: &CalculationRequest) -> Result<Estimate> {
        estimate(self.factors, request)
    }

    /// Estimates and appends exactly one record, returning it as stored. Emissions are
    /// written unrounded in the output unit
    pub fn calculate(&self, request: &CalculationRequest) -> Result<EmissionsRecord> {
        let estimate = self.estimate(request)?;
        let record = NewRecord {
            user_id: request.user_id,
            fuel_type: request.fuel_type.clone(),
            fuel_used: format!("{} {}", request.fuel_used, estimate.fuel_unit),
            emissions: estimate.emissions.to_string(),
            emissions_unit: Some(estimate.output_unit.to_string()),
            temperature: request.temperature.map(|t| t.to_string()),
            farming_technique: request.farming_technique.clone()
        };
        let id = self.store.append(&record)?;
        info!("User {}: {} of {} produced {} {} (record {})",
              record.user_id, record.fuel_used, record.fuel_type,
              record.emissions, estimate.output_unit, id);
        self.store.fetch(id).map_err(|e| EmissionsError::StoredButUnreadable(id, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use utils::units::{MassUnit, TemperatureScale};
    use crate::calculator::*;
    use crate::error::EmissionsError;
    use crate::factors::{EmissionsVariables, FactorTable, FuelType};
    use crate::record::Temperature;
    use std::collections::BTreeSet;
    use crate::record::{EmissionsRecord, NewRecord, RecordId};
    use crate::store::{HistoryFilter, HistoryStore, SqliteHistoryStore};

    fn factors() -> FactorTable {
        FactorTable::new(&EmissionsVariables::from_json_str(r#"{
            "fuel_types": [
                {"fuel_type": "gasoline", "emissions_modifier": 2.5},
                {"fuel_type": "coal", "emissions_modifier": 2.42}
            ],
            "farming_techniques": [
                {"technique": "Organic", "emissions_modifier": 0.8}
            ]
        }"#).unwrap()).unwrap()
    }

    #[test]
    fn no_temperature_uses_plain_factor_for_every_fuel() {
        let vars = EmissionsVariables::embedded_default().unwrap();
        let table = FactorTable::new(&vars).unwrap();
        for FuelType { name, emissions_modifier } in &vars.fuel_types {
            for (amount, unit, base) in [(10.0, "Liters", 10.0), (2.0, "Cubic Meters", 2000.0), (500.0, "Grams", 0.5)] {
                let estimate = estimate(&table, &CalculationRequest::new(1, name, amount, unit)).unwrap();
                assert_eq!(estimate.fuel_used_base, base);
                assert_eq!(estimate.effective_factor, *emissions_modifier);
                assert_eq!(estimate.emissions_kg, base * emissions_modifier);
            }
        }
    }

    #[test]
    fn baseline_temperature_leaves_factor_unchanged() {
        for scale in TemperatureScale::ALL {
            let temperature = Temperature::new(baseline_temperature(scale), scale);
            assert_eq!(temperature_adjusted_factor(2.5, &temperature), 2.5);
        }
    }

    #[test]
    fn temperature_penalty_is_symmetric() {
        let hot = temperature_adjusted_factor(2.5, &Temperature::celsius(25.0));
        let cold = temperature_adjusted_factor(2.5, &Temperature::celsius(15.0));
        assert!((hot - cold).abs() < 1e-12);
        assert!(hot > 2.5);
    }

    #[test]
    fn warm_day_scenario() {
        let request = CalculationRequest::new(1, "gasoline", 10.0, "Liters")
            .with_temperature(Temperature::celsius(25.0));
        let estimate = estimate(&factors(), &request).unwrap();
        assert!((estimate.effective_factor - 2.65625).abs() < 1e-12);
        assert!((estimate.emissions - 26.5625).abs() < 0.01);
        assert_eq!(estimate.formatted_emissions(), "26.56");
    }

    #[test]
    fn technique_and_output_unit() {
        let request = CalculationRequest::new(1, "gasoline", 10.0, "Liters")
            .with_farming_technique("Organic")
            .with_output_unit(MassUnit::Grams);
        let estimate = estimate(&factors(), &request).unwrap();
        assert!((estimate.emissions_kg - 20.0).abs() < 1e-9);
        assert!((estimate.emissions - 20_000.0).abs() < 1e-6);
    }

    #[test]
    fn failures_are_typed() {
        let table = factors();
        let bad_user = CalculationRequest::new(0, "gasoline", 10.0, "Liters");
        assert!(matches!(estimate(&table, &bad_user), Err(EmissionsError::Validation(_))));
        let bad_amount = CalculationRequest::new(1, "gasoline", -3.0, "Liters");
        assert!(matches!(estimate(&table, &bad_amount), Err(EmissionsError::Validation(_))));
        let bad_unit = CalculationRequest::new(1, "gasoline", 3.0, "Gallons");
        assert!(matches!(estimate(&table, &bad_unit), Err(EmissionsError::UnsupportedUnit(_))));
        let bad_fuel = CalculationRequest::new(1, "kerosene", 3.0, "Liters");
        assert!(matches!(estimate(&table, &bad_fuel), Err(EmissionsError::FuelTypeNotFound(_))));
        let bad_technique = CalculationRequest::new(1, "gasoline", 3.0, "Liters").with_farming_technique("Slash");
        assert!(matches!(estimate(&table, &bad_technique), Err(EmissionsError::TechniqueNotFound(_))));
        let bad_temperature = CalculationRequest::new(1, "gasoline", 3.0, "Liters")
            .with_temperature(Temperature::celsius(-273.16));
        assert!(matches!(estimate(&table, &bad_temperature), Err(EmissionsError::Validation(_))));
    }

    #[test]
    fn calculate_persists_one_record() {
        let table = factors();
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        let calculator = EmissionsCalculator::new(&table, &store);
        let request = CalculationRequest::new(3, "gasoline", 10.0, "Liters")
            .with_temperature(Temperature::celsius(25.0));
        let record = calculator.calculate(&request).unwrap();
        assert_eq!(record.user_id, 3);
        assert_eq!(record.fuel_used, "10 Liters");
        assert_eq!(record.emissions, "26.5625");
        assert_eq!(record.emissions_unit.as_deref(), Some("Kilograms"));
        assert_eq!(record.temperature.as_deref(), Some("25C"));
        assert_eq!(record.emissions_value(), Some(26.5625));
        assert_eq!(store.query(&HistoryFilter::all()).unwrap(), vec![record]);
    }

    #[test]
    fn failed_calculation_writes_nothing() {
        let table = factors();
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        let calculator = EmissionsCalculator::new(&table, &store);
        assert!(calculator.calculate(&CalculationRequest::new(1, "kerosene", 1.0, "Liters")).is_err());
        assert!(calculator.calculate(&CalculationRequest::new(-5, "gasoline", 1.0, "Liters")).is_err());
        assert!(store.query(&HistoryFilter::all()).unwrap().is_empty());
        assert!(store.distinct_user_ids().unwrap().is_empty());
    }

    #[test]
    fn stored_emissions_match_base_quantity_times_factor() {
        let vars = EmissionsVariables::embedded_default().unwrap();
        let table = FactorTable::new(&vars).unwrap();
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        let calculator = EmissionsCalculator::new(&table, &store);
        for FuelType { name, emissions_modifier } in &vars.fuel_types {
            for (amount, unit, base) in [(1.0, "Liters", 1.0), (10.0, "Liters", 10.0), (3.0, "Grams", 0.003)] {
                let record = calculator.calculate(&CalculationRequest::new(1, name, amount, unit)).unwrap();
                let expected = base * emissions_modifier;
                assert_eq!(record.emissions_value(), Some(expected), "{} {} of {}", amount, unit, name);
            }
        }
        let natural_gas = calculator.calculate(&CalculationRequest::new(1, "natural gas", 1.0, "Liters")).unwrap();
        assert_eq!(natural_gas.emissions, "0.00193");
    }

    #[test]
    fn fuel_unit_is_stored_by_canonical_name() {
        let table = factors();
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        let calculator = EmissionsCalculator::new(&table, &store);
        let record = calculator.calculate(&CalculationRequest::new(1, "gasoline", 1.0, "l")).unwrap();
        assert_eq!(record.fuel_used, "1 Liters");
        let record = calculator.calculate(&CalculationRequest::new(1, "gasoline", 2.5, "cubic meters")).unwrap();
        assert_eq!(record.fuel_used, "2.5 Cubic Meters");
    }

    struct WriteOnlyStore {
        inner: SqliteHistoryStore
    }

    impl HistoryStore for WriteOnlyStore {
        fn append(&self, record: &NewRecord) -> crate::error::Result<RecordId> {
            self.inner.append(record)
        }

        fn fetch(&self, _id: RecordId) -> crate::error::Result<EmissionsRecord> {
            Err(EmissionsError::Storage(rusqlite::Error::QueryReturnedNoRows))
        }

        fn query(&self, filter: &HistoryFilter) -> crate::error::Result<Vec<EmissionsRecord>> {
            self.inner.query(filter)
        }

        fn distinct_user_ids(&self) -> crate::error::Result<BTreeSet<String>> {
            self.inner.distinct_user_ids()
        }
    }

    #[test]
    fn failed_read_back_reports_the_stored_id() {
        let table = factors();
        let store = WriteOnlyStore { inner: SqliteHistoryStore::open_in_memory().unwrap() };
        let calculator = EmissionsCalculator::new(&table, &store);
        match calculator.calculate(&CalculationRequest::new(1, "gasoline", 1.0, "Liters")) {
            Err(EmissionsError::StoredButUnreadable(id, _)) => {
                assert_eq!(store.inner.fetch(id).unwrap().fuel_type, "gasoline");
            }
            other => panic!("unexpected result {:?}", other)
        }
        assert_eq!(store.inner.count().unwrap(), 1);
    }
}
