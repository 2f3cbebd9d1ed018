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

use std::fs;
use std::path::{Path, PathBuf};
use config::{Config, ConfigError};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utils::units::{MassUnit, TemperatureScale};

pub const ENV_PREFIX: &'static str = "CARBON";

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings. `{0}`")]
    LoadError(#[from] ConfigError),
    #[error("unknown settings category `{0}`")]
    UnknownCategory(String),
    #[error("unknown setting `{1}` in category `{0}`")]
    UnknownSetting(String, String),
    #[error("invalid value `{value}` for `{category}.{name}`. {reason}")]
    InvalidValue { category: String, name: String, value: String, reason: String },
    #[error("failed to write settings to {0}. {1}")]
    WriteFailed(String, String)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApiKeys {
    pub openweathermap_api_key: String,
    pub ip_geolocation_api_key: String
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Paths {
    pub emissions_modifiers_path: String
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Preferences {
    pub temperature_unit: String,
    pub calculation_unit: String,
    pub language: String,
    pub theme: String,
    pub use_temperature: bool,
    pub fetch_local_temperatures_on_startup: bool
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub api_keys: ApiKeys,
    pub paths: Paths,
    pub preferences: Preferences
}

impl Settings {
    pub const API_KEYS: &'static str = "api_keys";
    pub const PATHS: &'static str = "paths";
    pub const PREFERENCES: &'static str = "preferences";

    pub fn default() -> Self {
        Settings {
            api_keys: ApiKeys {
                openweathermap_api_key: String::new(),
                ip_geolocation_api_key: String::new()
            },
            paths: Paths {
                emissions_modifiers_path: String::new()
            },
            preferences: Preferences {
                temperature_unit: TemperatureScale::Celsius.as_str().to_string(),
                calculation_unit: MassUnit::Grams.as_str().to_string(),
                language: "English".to_string(),
                theme: "Light".to_string(),
                use_temperature: true,
                fetch_local_temperatures_on_startup: true
            }
        }
    }

    /// Every `(category, name)` pair the document knows about
    pub fn keys() -> Vec<(&'static str, &'static str)> {
        vec![
            (Settings::API_KEYS, "openweathermap_api_key"),
            (Settings::API_KEYS, "ip_geolocation_api_key"),
            (Settings::PATHS, "emissions_modifiers_path"),
            (Settings::PREFERENCES, "temperature_unit"),
            (Settings::PREFERENCES, "calculation_unit"),
            (Settings::PREFERENCES, "language"),
            (Settings::PREFERENCES, "theme"),
            (Settings::PREFERENCES, "use_temperature"),
            (Settings::PREFERENCES, "fetch_local_temperatures_on_startup"),
        ]
    }

    pub fn get(&self, category: &str, name: &str) -> Result<String, SettingsError> {
        let value = match (category, name) {
            (Settings::API_KEYS, "openweathermap_api_key") => self.api_keys.openweathermap_api_key.clone(),
            (Settings::API_KEYS, "ip_geolocation_api_key") => self.api_keys.ip_geolocation_api_key.clone(),
            (Settings::PATHS, "emissions_modifiers_path") => self.paths.emissions_modifiers_path.clone(),
            (Settings::PREFERENCES, "temperature_unit") => self.preferences.temperature_unit.clone(),
            (Settings::PREFERENCES, "calculation_unit") => self.preferences.calculation_unit.clone(),
            (Settings::PREFERENCES, "language") => self.preferences.language.clone(),
            (Settings::PREFERENCES, "theme") => self.preferences.theme.clone(),
            (Settings::PREFERENCES, "use_temperature") => self.preferences.use_temperature.to_string(),
            (Settings::PREFERENCES, "fetch_local_temperatures_on_startup") => {
                self.preferences.fetch_local_temperatures_on_startup.to_string()
            }
            _ => return Err(unknown(category, name))
        };
        Ok(value)
    }

    /// Applies a single change after checking the value makes sense for the key
    pub fn set(&mut self, category: &str, name: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = |reason: String| SettingsError::InvalidValue {
            category: category.to_string(),
            name: name.to_string(),
            value: value.to_string(),
            reason
        };
        match (category, name) {
            (Settings::API_KEYS, "openweathermap_api_key") => {
                self.api_keys.openweathermap_api_key = value.trim().to_string()
            }
            (Settings::API_KEYS, "ip_geolocation_api_key") => {
                self.api_keys.ip_geolocation_api_key = value.trim().to_string()
            }
            (Settings::PATHS, "emissions_modifiers_path") => {
                self.paths.emissions_modifiers_path = value.trim().to_string()
            }
            (Settings::PREFERENCES, "temperature_unit") => {
                let scale: TemperatureScale = value.parse().map_err(|e| invalid(format!("{}", e)))?;
                self.preferences.temperature_unit = scale.as_str().to_string()
            }
            (Settings::PREFERENCES, "calculation_unit") => {
                let unit: MassUnit = value.parse().map_err(|e| invalid(format!("{}", e)))?;
                self.preferences.calculation_unit = unit.as_str().to_string()
            }
            (Settings::PREFERENCES, "language") => {
                if value.trim().is_empty() {
                    return Err(invalid("language cannot be empty".to_string()));
                }
                self.preferences.language = value.trim().to_string()
            }
            (Settings::PREFERENCES, "theme") => {
                self.preferences.theme = match value.trim().to_lowercase().as_str() {
                    "light" => "Light".to_string(),
                    "dark" => "Dark".to_string(),
                    _ => return Err(invalid("theme must be Light or Dark".to_string()))
                }
            }
            (Settings::PREFERENCES, "use_temperature") => {
                self.preferences.use_temperature = parse_bool(value).ok_or_else(|| invalid("expected true or false".to_string()))?
            }
            (Settings::PREFERENCES, "fetch_local_temperatures_on_startup") => {
                self.preferences.fetch_local_temperatures_on_startup = parse_bool(value).ok_or_else(|| invalid("expected true or false".to_string()))?
            }
            _ => return Err(unknown(category, name))
        }
        Ok(())
    }

    /// Falls back to Celsius if the stored preference can't be understood
    pub fn temperature_scale(&self) -> TemperatureScale {
        self.preferences.temperature_unit.parse().unwrap_or_else(|e| {
            warn!("Bad temperature_unit preference. {}", e);
            TemperatureScale::default()
        })
    }

    pub fn calculation_unit(&self) -> MassUnit {
        self.preferences.calculation_unit.parse().unwrap_or_else(|e| {
            warn!("Bad calculation_unit preference. {}", e);
            MassUnit::Grams
        })
    }

    /// `None` means the embedded seed should be used
    pub fn emissions_modifiers_path(&self) -> Option<PathBuf> {
        match self.paths.emissions_modifiers_path.trim() {
            "" => None,
            path => Some(PathBuf::from(path))
        }
    }

    pub fn openweathermap_api_key(&self) -> Option<&str> {
        non_empty(&self.api_keys.openweathermap_api_key)
    }

    pub fn ip_geolocation_api_key(&self) -> Option<&str> {
        non_empty(&self.api_keys.ip_geolocation_api_key)
    }

    fn builder_with_defaults() -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Settings::default();
        let mut builder = Config::builder();
        for (category, name) in Settings::keys() {
            let key = format!("{}.{}", category, name);
            builder = match (category, name) {
                (Settings::PREFERENCES, "use_temperature") => {
                    builder.set_default(key, defaults.preferences.use_temperature)?
                }
                (Settings::PREFERENCES, "fetch_local_temperatures_on_startup") => {
                    builder.set_default(key, defaults.preferences.fetch_local_temperatures_on_startup)?
                }
                _ => {
                    let value = defaults.get(category, name).map_err(|e| ConfigError::Message(e.to_string()))?;
                    builder.set_default(key, value)?
                }
            };
        }
        Ok(builder)
    }
}

/// Owns the settings document and the file it lives in. Every change is written
/// straight back to disk
pub struct SettingsManager {
    path: PathBuf,
    settings: Settings
}

impl SettingsManager {
    pub fn load(path: &Path) -> Result<SettingsManager, SettingsError> {
        let settings = match Settings::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__"))
            .build() {
            Ok(settings) => {
                settings.try_deserialize()?
            }
            Err(e) if path.exists() => {
                error!("Failed to load settings from {}. {}", path.display(), e.to_string());
                return Err(SettingsError::LoadError(e));
            }
            Err(e) => {
                warn!("No settings found at {}. Writing defaults. {}", path.display(), e.to_string());
                let settings = Settings::builder_with_defaults()?.build()?;
                let ret: Settings = settings.try_deserialize()?;
                write_settings(path, &ret).unwrap_or_else(|e| { error!("{}", e.to_string()) });
                ret
            }
        };
        info!("Settings loaded from {}", path.display());
        Ok(SettingsManager { path: path.to_path_buf(), settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get(&self, category: &str, name: &str) -> Result<String, SettingsError> {
        self.settings.get(category, name)
    }

    /// The in-memory document only changes if the write succeeds
    pub fn update(&mut self, category: &str, name: &str, value: &str) -> Result<(), SettingsError> {
        let mut updated = self.settings.clone();
        updated.set(category, name, value)?;
        write_settings(&self.path, &updated)?;
        self.settings = updated;
        info!("Updated setting {}.{}", category, name);
        Ok(())
    }
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let failed = |reason: String| SettingsError::WriteFailed(path.display().to_string(), reason);
    let encoded = toml::to_string(settings).map_err(|e| failed(e.to_string()))?;
    fs::write(path, encoded).map_err(|e| failed(e.to_string()))
}

fn unknown(category: &str, name: &str) -> SettingsError {
    match category {
        Settings::API_KEYS | Settings::PATHS | Settings::PREFERENCES => {
            SettingsError::UnknownSetting(category.to_string(), name.to_string())
        }
        _ => SettingsError::UnknownCategory(category.to_string())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None
    }
}

fn non_empty(value: &str) -> Option<&str> {
    match value.trim() {
        "" => None,
        v => Some(v)
    }
}
