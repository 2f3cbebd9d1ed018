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

mod cli;
mod commands;
mod config;
mod settings;
mod setup;
mod weather;

use std::env;
use std::process::ExitCode;
use tracing_subscriber;
use tracing_appender;
use tracing::info;
use utils::filesystem::ensure_dir;
use crate::config::AppConfig;


fn init_logging(config: &AppConfig) {
    let log_dir = config.log_file.parent().unwrap_or(config.data_dir.as_path());
    let log_name = config.log_file.file_name().unwrap_or_default();
    match ensure_dir(log_dir) {
        Ok(log_dir) => {
            let file_appender = tracing_appender::rolling::never(log_dir, log_name);
            let subscriber = tracing_subscriber::fmt()
                .with_writer(file_appender)
                .with_ansi(false)
                .compact()
                .finish();
            match tracing::subscriber::set_global_default(subscriber) {
                Ok(_) => {
                    info!("Logging initialised");
                }
                Err(e) => {
                    eprintln!("Failed to init logging. {}", e.to_string());
                }
            }
        }
        Err(e) => {
            eprintln!("Failed to init logging. Couldn't create {}. {}", log_dir.display(), e.to_string());
        }
    }
}

fn main() -> ExitCode {
    let cli = match cli::parse_args(env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}\n\n{}", e, cli::USAGE);
            return ExitCode::FAILURE;
        }
    };
    let config = AppConfig::resolve(cli.data_dir.as_deref());
    init_logging(&config);

    match commands::run(&config, cli.command) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            commands::report_failure(&e);
            ExitCode::FAILURE
        }
    }
}
