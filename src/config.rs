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

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use tracing::info;
use utils::filesystem::ensure_dir;

pub const DATA_DIR_ENV_VAR: &'static str = "CARBON_DATA_DIR";

/// Every path the application touches, resolved once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub databases_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub settings_file: PathBuf,
    pub log_file: PathBuf
}

impl AppConfig {
    const DATABASES_DIR: &'static str = "databases";
    const EXPORTS_DIR: &'static str = "exports";
    const SETTINGS_FILENAME: &'static str = "settings.toml";
    const LOG_FILENAME: &'static str = "carbon_calculator.log";
    const HISTORY_DB_FILENAME: &'static str = "emissions.db";
    const FACTORS_DB_FILENAME: &'static str = "emissions_variables.db";

    pub fn with_data_dir(data_dir: &Path) -> AppConfig {
        AppConfig {
            data_dir: data_dir.to_path_buf(),
            databases_dir: data_dir.join(AppConfig::DATABASES_DIR),
            exports_dir: data_dir.join(AppConfig::EXPORTS_DIR),
            settings_file: data_dir.join(AppConfig::SETTINGS_FILENAME),
            log_file: data_dir.join(AppConfig::LOG_FILENAME)
        }
    }

    /// An explicit override wins, then `CARBON_DATA_DIR`, then the platform data directory
    pub fn resolve(data_dir_override: Option<&Path>) -> AppConfig {
        if let Some(dir) = data_dir_override {
            return AppConfig::with_data_dir(dir);
        }
        if let Some(dir) = env::var_os(DATA_DIR_ENV_VAR).filter(|d| !d.is_empty()) {
            return AppConfig::with_data_dir(Path::new(&dir));
        }
        AppConfig::with_data_dir(&default_data_dir())
    }

    pub fn history_db_path(&self) -> PathBuf {
        self.databases_dir.join(AppConfig::HISTORY_DB_FILENAME)
    }

    pub fn factors_db_path(&self) -> PathBuf {
        self.databases_dir.join(AppConfig::FACTORS_DB_FILENAME)
    }

    pub fn create_dirs(&self) -> io::Result<()> {
        for dir in [&self.data_dir, &self.databases_dir, &self.exports_dir] {
            ensure_dir(dir)?;
        }
        info!("Data directory is {}", self.data_dir.display());
        Ok(())
    }
}

pub fn default_data_dir() -> PathBuf {
    match ProjectDirs::from("", "", "carbon-calculator") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from(".").join("carbon-calculator")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use crate::config::AppConfig;

    #[test]
    fn paths_are_derived_from_data_dir() {
        let config = AppConfig::with_data_dir(Path::new("/tmp/carbon"));
        assert_eq!(config.databases_dir, Path::new("/tmp/carbon/databases"));
        assert_eq!(config.settings_file, Path::new("/tmp/carbon/settings.toml"));
        assert_eq!(config.log_file, Path::new("/tmp/carbon/carbon_calculator.log"));
        assert_eq!(config.history_db_path(), Path::new("/tmp/carbon/databases/emissions.db"));
    }

    #[test]
    fn override_wins() {
        let config = AppConfig::resolve(Some(Path::new("/srv/carbon")));
        assert_eq!(config.data_dir, Path::new("/srv/carbon"));
    }

    #[test]
    fn create_dirs_builds_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_dir(&dir.path().join("nested"));
        config.create_dirs().unwrap();
        assert!(config.databases_dir.is_dir());
        assert!(config.exports_dir.is_dir());
    }
}
