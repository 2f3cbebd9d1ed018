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

use tracing::{info, warn};
use emissions::{EmissionsError, EmissionsVariables, SqliteFactorTable, SqliteHistoryStore};
use crate::config::AppConfig;
use crate::settings::Settings;

#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("failed to create data directories. `{0}`")]
    DirectoryCreationFailed(#[from] std::io::Error),
    #[error("{0}")]
    EmissionsError(#[from] EmissionsError),
    #[error("refusing to reset history without confirmation")]
    NotConfirmed
}

/// The opened stores the rest of the application works with
pub struct Application {
    pub history: SqliteHistoryStore,
    pub factors: SqliteFactorTable
}

/// Creates the data directories, opens both databases and reloads the factor tables from
/// the configured seed document, or the embedded one if none is configured
pub fn initialize(config: &AppConfig, settings: &Settings) -> Result<Application, SetupError> {
    config.create_dirs()?;
    let history = SqliteHistoryStore::open(&config.history_db_path())?;
    let factors = SqliteFactorTable::open(&config.factors_db_path())?;
    let vars = load_emissions_variables(settings)?;
    factors.reload(&vars)?;
    info!("Initialisation complete");
    Ok(Application { history, factors })
}

pub fn load_emissions_variables(settings: &Settings) -> Result<EmissionsVariables, EmissionsError> {
    match settings.emissions_modifiers_path() {
        Some(path) => EmissionsVariables::from_json_file(&path),
        None => {
            info!("No emissions modifiers path configured. Using built in values");
            EmissionsVariables::embedded_default()
        }
    }
}

/// Deletes every stored calculation
pub fn reset_history(config: &AppConfig, confirmed: bool) -> Result<usize, SetupError> {
    if !confirmed {
        return Err(SetupError::NotConfirmed);
    }
    config.create_dirs()?;
    let history = SqliteHistoryStore::open(&config.history_db_path())?;
    let deleted = history.purge()?;
    warn!("Emissions history reset. {} records removed", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use emissions::{FactorSource, HistoryStore, NewRecord};
    use crate::config::AppConfig;
    use crate::settings::Settings;
    use crate::setup::{initialize, reset_history, SetupError};

    #[test]
    fn initialize_seeds_factors_from_embedded_document() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_dir(dir.path());
        let app = initialize(&config, &Settings::default()).unwrap();
        assert!(config.history_db_path().is_file());
        assert_eq!(app.factors.fuel_factor("gasoline").unwrap(), 2.31);
        assert_eq!(app.factors.technique_modifier("Conventional").unwrap(), 1.0);
    }

    #[test]
    fn initialize_uses_configured_seed() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("vars.json");
        fs::write(&seed, r#"{"fuel_types": [{"fuel_type": "hydrogen", "emissions_modifier": 0.5}]}"#).unwrap();
        let mut settings = Settings::default();
        settings.set("paths", "emissions_modifiers_path", &seed.to_string_lossy()).unwrap();

        let config = AppConfig::with_data_dir(&dir.path().join("data"));
        let app = initialize(&config, &settings).unwrap();
        assert_eq!(app.factors.fuel_factor("hydrogen").unwrap(), 0.5);
        assert!(app.factors.fuel_factor("gasoline").is_err());
    }

    #[test]
    fn reset_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_dir(dir.path());
        let app = initialize(&config, &Settings::default()).unwrap();
        app.history.append(&NewRecord {
            user_id: 1,
            fuel_type: "diesel".to_string(),
            fuel_used: "1 Liters".to_string(),
            emissions: "2.68".to_string(),
            emissions_unit: Some("Kilograms".to_string()),
            temperature: None,
            farming_technique: None
        }).unwrap();
        assert!(matches!(reset_history(&config, false), Err(SetupError::NotConfirmed)));
        assert_eq!(reset_history(&config, true).unwrap(), 1);
        assert!(app.history.query(&emissions::HistoryFilter::all()).unwrap().is_empty());
    }
}
