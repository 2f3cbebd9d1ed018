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

//! Emissions factors for fuel types and farming techniques.
//!
//! Factors are seeded from an emissions variables document and looked up by exact,
//! case-sensitive name. The calculator only needs something implementing [FactorSource].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::error::{EmissionsError, Result};

const DEFAULT_EMISSIONS_VARIABLES: &'static str = include_str!("../../resources/emissions_variables.json");

pub trait FactorSource {
    fn fuel_factor(&self, fuel_type: &str) -> Result<f64>;
    fn technique_modifier(&self, technique: &str) -> Result<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelType {
    #[serde(rename = "fuel_type")]
    pub name: String,
    pub emissions_modifier: f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmingTechnique {
    #[serde(rename = "technique")]
    pub name: String,
    pub emissions_modifier: f64,
    #[serde(default)]
    pub description: String
}

/// The seed document fuel and technique tables are built from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionsVariables {
    #[serde(default)]
    pub fuel_types: Vec<FuelType>,
    #[serde(default)]
    pub farming_techniques: Vec<FarmingTechnique>
}

impl EmissionsVariables {
    pub fn from_json_str(data: &str) -> Result<EmissionsVariables> {
        let vars: EmissionsVariables = serde_json::from_str(data).map_err(|e| {
            EmissionsError::InvalidVariables(e.to_string())
        })?;
        vars.validate()?;
        Ok(vars)
    }

    pub fn from_json_file(path: &Path) -> Result<EmissionsVariables> {
        info!("Loading emissions variables from {}", path.display());
        let data = fs::read_to_string(path).map_err(|e| {
            EmissionsError::FailedToOpen(path.display().to_string(), e.to_string())
        })?;
        EmissionsVariables::from_json_str(&data)
    }

    /// The document shipped with the application
    pub fn embedded_default() -> Result<EmissionsVariables> {
        EmissionsVariables::from_json_str(DEFAULT_EMISSIONS_VARIABLES)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for fuel in &self.fuel_types {
            if fuel.name.trim().is_empty() {
                return Err(EmissionsError::InvalidVariables("fuel type with an empty name".to_string()));
            }
            if !seen.insert(fuel.name.as_str()) {
                return Err(EmissionsError::InvalidVariables(format!("duplicate fuel type `{}`", fuel.name)));
            }
            if !fuel.emissions_modifier.is_finite() || fuel.emissions_modifier <= 0.0 {
                return Err(EmissionsError::InvalidVariables(
                    format!("fuel type `{}` has invalid modifier {}", fuel.name, fuel.emissions_modifier)
                ));
            }
        }
        seen.clear();
        for technique in &self.farming_techniques {
            if technique.name.trim().is_empty() {
                return Err(EmissionsError::InvalidVariables("farming technique with an empty name".to_string()));
            }
            if !seen.insert(technique.name.as_str()) {
                return Err(EmissionsError::InvalidVariables(format!("duplicate farming technique `{}`", technique.name)));
            }
            if !technique.emissions_modifier.is_finite() || technique.emissions_modifier < 0.0 {
                return Err(EmissionsError::InvalidVariables(
                    format!("farming technique `{}` has invalid modifier {}", technique.name, technique.emissions_modifier)
                ));
            }
        }
        Ok(())
    }
}

/// In-memory factor lookup
#[derive(Debug, Clone, Default)]
pub struct FactorTable {
    fuel_types: HashMap<String, f64>,
    farming_techniques: HashMap<String, f64>
}

impl FactorTable {
    pub fn new(vars: &EmissionsVariables) -> Result<FactorTable> {
        vars.validate()?;
        Ok(FactorTable {
            fuel_types: vars.fuel_types.iter().map(|f| (f.name.clone(), f.emissions_modifier)).collect(),
            farming_techniques: vars.farming_techniques.iter().map(|t| (t.name.clone(), t.emissions_modifier)).collect()
        })
    }

    pub fn fuel_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fuel_types.keys().cloned().collect();
        names.sort();
        names
    }
}

impl FactorSource for FactorTable {
    fn fuel_factor(&self, fuel_type: &str) -> Result<f64> {
        self.fuel_types.get(fuel_type).copied().ok_or_else(|| {
            EmissionsError::FuelTypeNotFound(fuel_type.to_string())
        })
    }

    fn technique_modifier(&self, technique: &str) -> Result<f64> {
        self.farming_techniques.get(technique).copied().ok_or_else(|| {
            EmissionsError::TechniqueNotFound(technique.to_string())
        })
    }
}

/// Factor tables persisted in the emissions variables database
pub struct SqliteFactorTable {
    conn: Connection
}

impl SqliteFactorTable {
    pub fn open(path: &Path) -> Result<SqliteFactorTable> {
        let conn = Connection::open(path).map_err(|e| {
            EmissionsError::FailedToOpen(path.display().to_string(), e.to_string())
        })?;
        SqliteFactorTable::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<SqliteFactorTable> {
        SqliteFactorTable::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<SqliteFactorTable> {
        conn.execute_batch(create_tables_query())?;
        Ok(SqliteFactorTable { conn })
    }

    /// Drops both tables and recreates them from `vars` in a single transaction
    pub fn reload(&self, vars: &EmissionsVariables) -> Result<()> {
        vars.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DROP TABLE IF EXISTS fuel_types; DROP TABLE IF EXISTS farming_techniques;")?;
        tx.execute_batch(create_tables_query())?;
        {
            let mut stmt = tx.prepare("INSERT INTO fuel_types (fuel_type, emissions_modifier) VALUES (?1, ?2)")?;
            for fuel in &vars.fuel_types {
                stmt.execute(params![fuel.name, fuel.emissions_modifier])?;
            }
            let mut stmt = tx.prepare(
                "INSERT INTO farming_techniques (technique, emissions_modifier, description) VALUES (?1, ?2, ?3)"
            )?;
            for technique in &vars.farming_techniques {
                stmt.execute(params![technique.name, technique.emissions_modifier, technique.description])?;
            }
        }
        tx.commit()?;
        info!("Loaded {} fuel types and {} farming techniques",
              vars.fuel_types.len(), vars.farming_techniques.len());
        Ok(())
    }

    pub fn fuel_types(&self) -> Result<Vec<FuelType>> {
        let mut stmt = self.conn.prepare("SELECT fuel_type, emissions_modifier FROM fuel_types ORDER BY fuel_type")?;
        let rows = stmt.query_map([], |row| {
            Ok(FuelType { name: row.get(0)?, emissions_modifier: row.get(1)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn farming_techniques(&self) -> Result<Vec<FarmingTechnique>> {
        let mut stmt = self.conn.prepare(
            "SELECT technique, emissions_modifier, description FROM farming_techniques ORDER BY technique"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FarmingTechnique {
                name: row.get(0)?,
                emissions_modifier: row.get(1)?,
                description: row.get::<_, Option<String>>(2)?.unwrap_or_default()
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl FactorSource for SqliteFactorTable {
    fn fuel_factor(&self, fuel_type: &str) -> Result<f64> {
        debug!("Looking up emissions modifier for {}", fuel_type);
        self.conn.query_row(
            "SELECT emissions_modifier FROM fuel_types WHERE fuel_type = ?1",
            params![fuel_type],
            |row| row.get::<_, f64>(0)
        ).optional()?.ok_or_else(|| EmissionsError::FuelTypeNotFound(fuel_type.to_string()))
    }

    fn technique_modifier(&self, technique: &str) -> Result<f64> {
        debug!("Looking up emissions modifier for {}", technique);
        self.conn.query_row(
            "SELECT emissions_modifier FROM farming_techniques WHERE technique = ?1",
            params![technique],
            |row| row.get::<_, f64>(0)
        ).optional()?.ok_or_else(|| EmissionsError::TechniqueNotFound(technique.to_string()))
    }
}

fn create_tables_query() -> &'static str {
    "CREATE TABLE IF NOT EXISTS fuel_types (
        fuel_type TEXT PRIMARY KEY,
        emissions_modifier REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS farming_techniques (
        technique TEXT PRIMARY KEY,
        emissions_modifier REAL NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    );"
}

#[cfg(test)]
mod tests {
    use crate::error::EmissionsError;
    use crate::factors::*;

    fn seed() -> EmissionsVariables {
        EmissionsVariables::from_json_str(r#"{
            "fuel_types": [
                {"fuel_type": "gasoline", "emissions_modifier": 2.5},
                {"fuel_type": "coal", "emissions_modifier": 2.42}
            ],
            "farming_techniques": [
                {"technique": "Organic", "emissions_modifier": 0.85, "description": "no synthetics"},
                {"technique": "No-Till", "emissions_modifier": 0.8}
            ]
        }"#).unwrap()
    }

    #[test]
    fn embedded_default_is_valid() {
        let vars = EmissionsVariables::embedded_default().unwrap();
        assert!(vars.fuel_types.iter().any(|f| f.name == "gasoline"));
        assert!(vars.farming_techniques.iter().any(|t| t.name == "Organic"));
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let missing_modifier = r#"{"fuel_types": [{"fuel_type": "gasoline"}]}"#;
        assert!(matches!(EmissionsVariables::from_json_str(missing_modifier),
                         Err(EmissionsError::InvalidVariables(_))));
        let negative = r#"{"fuel_types": [{"fuel_type": "gasoline", "emissions_modifier": -1.0}]}"#;
        assert!(matches!(EmissionsVariables::from_json_str(negative),
                         Err(EmissionsError::InvalidVariables(_))));
        let duplicate = r#"{"fuel_types": [
            {"fuel_type": "gasoline", "emissions_modifier": 1.0},
            {"fuel_type": "gasoline", "emissions_modifier": 2.0}
        ]}"#;
        assert!(matches!(EmissionsVariables::from_json_str(duplicate),
                         Err(EmissionsError::InvalidVariables(_))));
    }

    #[test]
    fn in_memory_lookup_is_case_sensitive() {
        let table = FactorTable::new(&seed()).unwrap();
        assert_eq!(table.fuel_factor("gasoline").unwrap(), 2.5);
        assert!(matches!(table.fuel_factor("Gasoline"), Err(EmissionsError::FuelTypeNotFound(name)) if name == "Gasoline"));
        assert_eq!(table.technique_modifier("No-Till").unwrap(), 0.8);
        assert!(matches!(table.technique_modifier("Burning"), Err(EmissionsError::TechniqueNotFound(_))));
        assert_eq!(table.fuel_types(), vec!["coal".to_string(), "gasoline".to_string()]);
    }

    #[test]
    fn sqlite_table_reload_replaces_contents() {
        let table = SqliteFactorTable::open_in_memory().unwrap();
        assert!(matches!(table.fuel_factor("gasoline"), Err(EmissionsError::FuelTypeNotFound(_))));

        table.reload(&seed()).unwrap();
        assert_eq!(table.fuel_factor("gasoline").unwrap(), 2.5);
        assert_eq!(table.technique_modifier("Organic").unwrap(), 0.85);
        let techniques = table.farming_techniques().unwrap();
        assert_eq!(techniques.len(), 2);
        assert_eq!(techniques[0].name, "No-Till");
        assert_eq!(techniques[0].description, "");

        let replacement = EmissionsVariables {
            fuel_types: vec![FuelType { name: "diesel".to_string(), emissions_modifier: 2.68 }],
            farming_techniques: vec![]
        };
        table.reload(&replacement).unwrap();
        assert!(matches!(table.fuel_factor("gasoline"), Err(EmissionsError::FuelTypeNotFound(_))));
        assert_eq!(table.fuel_factor("diesel").unwrap(), 2.68);
        assert!(table.farming_techniques().unwrap().is_empty());
    }

    #[test]
    fn sqlite_table_persists_between_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emissions_variables.db");
        SqliteFactorTable::open(&path).unwrap().reload(&seed()).unwrap();
        let reopened = SqliteFactorTable::open(&path).unwrap();
        let fuels = reopened.fuel_types().unwrap();
        assert_eq!(fuels.len(), 2);
        assert_eq!(reopened.fuel_factor("coal").unwrap(), 2.42);
    }
}
