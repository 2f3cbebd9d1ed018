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

use std::path::PathBuf;
use chrono::Utc;
use itertools::Itertools;
use tracing::{error, info, warn};
use emissions::{CalculationRequest, EmissionsCalculator, EmissionsError, HistoryFilter, HistoryStore, Temperature};
use emissions::transfer::{export_history, import_history, TransferError, TransferFormat};
use emissions::validation::parse_user_id;
use utils::filesystem::create_safe_filename_in_path;
use utils::units::{MassUnit, TemperatureScale, UnsupportedUnit};
use crate::cli::{CalculateArgs, Command, HistoryArgs, SettingsCommand, USAGE};
use crate::config::AppConfig;
use crate::settings::{Settings, SettingsError, SettingsManager};
use crate::setup;
use crate::setup::{Application, SetupError};
use crate::weather::{LocationService, WeatherError, WeatherService};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Settings(#[from] SettingsError),
    #[error("{0}")]
    Setup(#[from] SetupError),
    #[error("{0}")]
    Emissions(#[from] EmissionsError),
    #[error("{0}")]
    Transfer(#[from] TransferError),
    #[error("{0}")]
    Weather(#[from] WeatherError),
    #[error("{0}")]
    UnsupportedUnit(#[from] UnsupportedUnit)
}

pub fn run(config: &AppConfig, command: Command) -> Result<(), AppError> {
    if let Command::Help = command {
        println!("{}", USAGE);
        return Ok(());
    }
    if let Command::Reset { confirmed } = command {
        let deleted = setup::reset_history(config, confirmed)?;
        println!("Removed {} records", deleted);
        return Ok(());
    }

    let mut settings = SettingsManager::load(&config.settings_file)?;
    if let Command::Settings(settings_command) = command {
        return run_settings(&mut settings, settings_command);
    }

    let app = setup::initialize(config, settings.settings())?;
    match command {
        Command::Init => {
            println!("Data directory ready at {}", config.data_dir.display());
            println!("{} fuel types, {} farming techniques",
                     app.factors.fuel_types()?.len(), app.factors.farming_techniques()?.len());
        }
        Command::Calculate(args) => calculate(&app, settings.settings(), args)?,
        Command::History(args) => {
            let records = app.history.query(&history_filter(&args)?)?;
            if records.is_empty() {
                println!("No history found");
            }
            for record in records {
                println!("{}", record);
            }
        }
        Command::Users => {
            println!("{}", app.history.distinct_user_ids()?.iter().join("\n"));
        }
        Command::Fuels => {
            for fuel in app.factors.fuel_types()? {
                println!("{}: {} kg CO2e per base unit", fuel.name, fuel.emissions_modifier);
            }
        }
        Command::Techniques => {
            for technique in app.factors.farming_techniques()? {
                println!("{} (x{}): {}", technique.name, technique.emissions_modifier, technique.description);
            }
        }
        Command::Import(path) => {
            let count = import_history(&app.history, &path)?;
            println!("Imported {} records from {}", count, path.display());
        }
        Command::Export { path, format, filter } => {
            let (path, format) = export_target(config, path, format)?;
            let count = export_history(&app.history, &history_filter(&filter)?, &path, format)?;
            println!("Exported {} records to {}", count, path.display());
        }
        Command::Help | Command::Reset { .. } | Command::Settings(_) => {}
    }
    Ok(())
}

fn run_settings(settings: &mut SettingsManager, command: SettingsCommand) -> Result<(), AppError> {
    match command {
        SettingsCommand::List => {
            for (category, name) in Settings::keys() {
                println!("{}.{} = {}", category, name, settings.get(category, name)?);
            }
        }
        SettingsCommand::Get { category, name } => println!("{}", settings.get(&category, &name)?),
        SettingsCommand::Set { category, name, value } => {
            settings.update(&category, &name, &value)?;
            println!("{}.{} = {}", category, name, settings.get(&category, &name)?);
        }
    }
    Ok(())
}

fn calculate(app: &Application, settings: &Settings, args: CalculateArgs) -> Result<(), AppError> {
    let user_id = parse_user_id(&args.user)?;
    let scale = match &args.scale {
        Some(scale) => scale.parse::<TemperatureScale>()?,
        None => settings.temperature_scale()
    };
    let output_unit = match &args.output_unit {
        Some(unit) => unit.parse::<MassUnit>()?,
        None => settings.calculation_unit()
    };

    let mut request = CalculationRequest::new(user_id, &args.fuel, args.amount, &args.unit)
        .with_output_unit(output_unit);
    if let Some(technique) = &args.technique {
        request = request.with_farming_technique(technique);
    }
    let temperature = match args.temperature {
        Some(value) => Some(Temperature::new(value, scale)),
        None if wants_local_temperature(&args, settings) => {
            local_temperature(settings, scale).unwrap_or_else(|e| {
                warn!("Continuing without a temperature reading. {}", e);
                eprintln!("Couldn't fetch the local temperature. {}", e);
                None
            })
        }
        None => None
    };
    if let Some(temperature) = temperature {
        request = request.with_temperature(temperature);
    }

    let calculator = EmissionsCalculator::new(&app.factors, &app.history);
    if args.dry_run {
        let estimate = calculator.estimate(&request)?;
        println!("{} {}", estimate.formatted_emissions(), estimate.output_unit);
    } else {
        let record = calculator.calculate(&request)?;
        info!("Stored calculation {}", record.id);
        println!("{}", record);
    }
    Ok(())
}

/// `--local-weather` asks explicitly. Otherwise a reading is fetched automatically when the
/// preference is on and both api keys are configured
fn wants_local_temperature(args: &CalculateArgs, settings: &Settings) -> bool {
    if !settings.preferences.use_temperature {
        return false;
    }
    args.local_weather || (settings.preferences.fetch_local_temperatures_on_startup
        && settings.openweathermap_api_key().is_some()
        && settings.ip_geolocation_api_key().is_some())
}

fn local_temperature(settings: &Settings, scale: TemperatureScale) -> Result<Option<Temperature>, WeatherError> {
    let location_key = settings.ip_geolocation_api_key().unwrap_or_default();
    let weather_key = settings.openweathermap_api_key().unwrap_or_default();
    let location = LocationService::new(location_key)?.locate()?;
    let reading = WeatherService::new(weather_key)?.current_temperature(&location, scale)?;
    Ok(Some(reading))
}

fn history_filter(args: &HistoryArgs) -> Result<HistoryFilter, AppError> {
    let mut filter = HistoryFilter::all();
    if let Some(user) = &args.user {
        filter = filter.for_user(parse_user_id(user)?);
    }
    if let Some(fuel) = &args.fuel {
        filter = filter.for_fuel_type(fuel);
    }
    if let Some(last) = args.last {
        filter = filter.within_last(last);
    }
    Ok(filter)
}

/// Without a path the export goes to a fresh timestamped file in the exports directory
fn export_target(config: &AppConfig,
                 path: Option<PathBuf>,
                 format: Option<TransferFormat>) -> Result<(PathBuf, TransferFormat), AppError> {
    match (path, format) {
        (Some(path), Some(format)) => Ok((path, format)),
        (Some(path), None) => {
            let format = TransferFormat::from_path(&path)?;
            Ok((path, format))
        }
        (None, format) => {
            let format = format.unwrap_or(TransferFormat::Csv);
            let name = format!("emissions_history_{}", Utc::now().format("%Y%m%d_%H%M%S"));
            let path = create_safe_filename_in_path(&config.exports_dir, &name, format.as_str());
            Ok((path, format))
        }
    }
}

pub fn report_failure(error: &AppError) {
    error!("{}", error);
    let user_error = match error {
        AppError::Emissions(e) => e.is_user_error(),
        AppError::Setup(SetupError::EmissionsError(e)) => e.is_user_error(),
        _ => false
    };
    if user_error {
        eprintln!("Invalid input. {}", error);
    } else {
        eprintln!("Error: {}", error);
    }
}
