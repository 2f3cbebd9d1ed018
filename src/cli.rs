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
use emissions::TimeFrame;
use emissions::transfer::TransferFormat;

pub const USAGE: &'static str = "\
usage: carbon-calculator [--data-dir <dir>] <command> [options]

commands:
  init                                  create the data directory and load emissions factors
  calculate --user <id> --fuel <type> --amount <n> [--unit <unit>]
            [--temperature <t>] [--scale <Celsius|Fahrenheit|Kelvin>]
            [--technique <name>] [--output-unit <unit>] [--local-weather] [--dry-run]
  history [--user <id>] [--fuel <type>] [--last <30d|6m|1y>]
  users                                 list user ids with stored calculations
  fuels                                 list known fuel types
  techniques                            list known farming techniques
  import <file>                         import a csv or json history file
  export [file] [--format <csv|json>] [--user <id>] [--last <30d|6m|1y>]
  settings [get <category> <name> | set <category> <name> <value>]
  reset --yes                           delete every stored calculation";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CliError {
    #[error("no command given")]
    MissingCommand,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("unknown option `{0}`")]
    UnknownOption(String),
    #[error("option `{0}` needs a value")]
    MissingValue(String),
    #[error("missing required argument `{0}`")]
    MissingArgument(String),
    #[error("invalid value `{1}` for `{0}`")]
    InvalidValue(String, String),
    #[error("unexpected argument `{0}`")]
    UnexpectedArgument(String)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculateArgs {
    pub user: String,
    pub fuel: String,
    pub amount: f64,
    pub unit: String,
    pub temperature: Option<f64>,
    pub scale: Option<String>,
    pub technique: Option<String>,
    pub output_unit: Option<String>,
    pub dry_run: bool,
    pub local_weather: bool
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryArgs {
    pub user: Option<String>,
    pub fuel: Option<String>,
    pub last: Option<TimeFrame>
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsCommand {
    List,
    Get { category: String, name: String },
    Set { category: String, name: String, value: String }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Init,
    Calculate(CalculateArgs),
    History(HistoryArgs),
    Users,
    Fuels,
    Techniques,
    Import(PathBuf),
    Export { path: Option<PathBuf>, format: Option<TransferFormat>, filter: HistoryArgs },
    Settings(SettingsCommand),
    Reset { confirmed: bool }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub data_dir: Option<PathBuf>,
    pub command: Command
}

/// Splits the arguments after the command into `--flag value` pairs, bare switches and
/// positional values
struct ArgList {
    options: Vec<(String, Option<String>)>,
    positional: Vec<String>
}

impl ArgList {
    const SWITCHES: [&'static str; 3] = ["--dry-run", "--local-weather", "--yes"];

    fn parse(args: &[String]) -> Result<ArgList, CliError> {
        let mut options = Vec::new();
        let mut positional = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if !arg.starts_with("--") {
                positional.push(arg.clone());
                continue;
            }
            if let Some((flag, value)) = arg.split_once('=') {
                options.push((flag.to_string(), Some(value.to_string())));
            } else if ArgList::SWITCHES.contains(&arg.as_str()) {
                options.push((arg.clone(), None));
            } else {
                let value = iter.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                options.push((arg.clone(), Some(value.clone())));
            }
        }
        Ok(ArgList { options, positional })
    }

    fn check_known(&self, known: &[&str]) -> Result<(), CliError> {
        match self.options.iter().find(|(flag, _)| !known.contains(&flag.as_str())) {
            Some((flag, _)) => Err(CliError::UnknownOption(flag.clone())),
            None => Ok(())
        }
    }

    fn value(&self, flag: &str) -> Option<String> {
        self.options.iter().rev()
            .find(|(f, _)| f == flag)
            .and_then(|(_, v)| v.clone())
    }

    fn required(&self, flag: &str) -> Result<String, CliError> {
        self.value(flag).ok_or_else(|| CliError::MissingArgument(flag.to_string()))
    }

    fn switch(&self, flag: &str) -> bool {
        self.options.iter().any(|(f, _)| f == flag)
    }

    fn parsed<T: std::str::FromStr>(&self, flag: &str) -> Result<Option<T>, CliError> {
        match self.value(flag) {
            Some(v) => v.parse::<T>().map(Some).map_err(|_| CliError::InvalidValue(flag.to_string(), v)),
            None => Ok(None)
        }
    }

    fn no_positional(&self) -> Result<(), CliError> {
        match self.positional.first() {
            Some(arg) => Err(CliError::UnexpectedArgument(arg.clone())),
            None => Ok(())
        }
    }
}

/// `args` excludes the program name
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, CliError> {
    let mut args: Vec<String> = args.into_iter().collect();
    let mut data_dir = None;
    while let Some(first) = args.first() {
        if first == "--data-dir" {
            if args.len() < 2 {
                return Err(CliError::MissingValue(first.clone()));
            }
            data_dir = Some(PathBuf::from(args.remove(1)));
            args.remove(0);
        } else if let Some(dir) = first.strip_prefix("--data-dir=") {
            data_dir = Some(PathBuf::from(dir));
            args.remove(0);
        } else {
            break;
        }
    }
    if args.is_empty() {
        return Err(CliError::MissingCommand);
    }
    let command_name = args.remove(0);
    let rest = ArgList::parse(&args)?;
    let command = match command_name.as_str() {
        "help" | "--help" | "-h" => Command::Help,
        "init" => {
            rest.check_known(&[])?;
            rest.no_positional()?;
            Command::Init
        }
        "calculate" => Command::Calculate(parse_calculate(&rest)?),
        "history" => {
            rest.no_positional()?;
            Command::History(parse_history_filter(&rest, &["--user", "--fuel", "--last"])?)
        }
        "users" | "fuels" | "techniques" => {
            rest.check_known(&[])?;
            rest.no_positional()?;
            match command_name.as_str() {
                "users" => Command::Users,
                "fuels" => Command::Fuels,
                _ => Command::Techniques
            }
        }
        "import" => {
            rest.check_known(&[])?;
            match rest.positional.as_slice() {
                [path] => Command::Import(PathBuf::from(path)),
                [] => return Err(CliError::MissingArgument("file".to_string())),
                [_, extra, ..] => return Err(CliError::UnexpectedArgument(extra.clone()))
            }
        }
        "export" => {
            let filter = parse_history_filter(&rest, &["--format", "--user", "--fuel", "--last"])?;
            let path = match rest.positional.as_slice() {
                [] => None,
                [path] => Some(PathBuf::from(path)),
                [_, extra, ..] => return Err(CliError::UnexpectedArgument(extra.clone()))
            };
            Command::Export { path, format: rest.parsed("--format")?, filter }
        }
        "settings" => {
            rest.check_known(&[])?;
            Command::Settings(parse_settings(&rest.positional)?)
        }
        "reset" => {
            rest.check_known(&["--yes"])?;
            rest.no_positional()?;
            Command::Reset { confirmed: rest.switch("--yes") }
        }
        other => return Err(CliError::UnknownCommand(other.to_string()))
    };
    Ok(Cli { data_dir, command })
}

fn parse_calculate(rest: &ArgList) -> Result<CalculateArgs, CliError> {
    rest.check_known(&[
        "--user", "--fuel", "--amount", "--unit", "--temperature", "--scale",
        "--technique", "--output-unit", "--dry-run", "--local-weather"
    ])?;
    rest.no_positional()?;
    let amount = rest.parsed::<f64>("--amount")?
        .ok_or_else(|| CliError::MissingArgument("--amount".to_string()))?;
    Ok(CalculateArgs {
        user: rest.required("--user")?,
        fuel: rest.required("--fuel")?,
        amount,
        unit: rest.value("--unit").unwrap_or_else(|| "Liters".to_string()),
        temperature: rest.parsed("--temperature")?,
        scale: rest.value("--scale"),
        technique: rest.value("--technique"),
        output_unit: rest.value("--output-unit"),
        dry_run: rest.switch("--dry-run"),
        local_weather: rest.switch("--local-weather")
    })
}

fn parse_history_filter(rest: &ArgList, known: &[&str]) -> Result<HistoryArgs, CliError> {
    rest.check_known(known)?;
    Ok(HistoryArgs {
        user: rest.value("--user"),
        fuel: rest.value("--fuel"),
        last: rest.parsed("--last")?
    })
}

fn parse_settings(positional: &[String]) -> Result<SettingsCommand, CliError> {
    match positional {
        [] => Ok(SettingsCommand::List),
        [action, category, name] if action == "get" => {
            Ok(SettingsCommand::Get { category: category.clone(), name: name.clone() })
        }
        [action, category, name, value] if action == "set" => {
            Ok(SettingsCommand::Set { category: category.clone(), name: name.clone(), value: value.clone() })
        }
        [action, ..] if action == "get" || action == "set" => {
            Err(CliError::MissingArgument(format!("{} <category> <name>{}", action,
                                                  if action == "set" { " <value>" } else { "" })))
        }
        [other, ..] => Err(CliError::UnknownCommand(format!("settings {}", other)))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use emissions::TimeFrame;
    use emissions::transfer::TransferFormat;
    use crate::cli::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(|s| s.to_string()).collect()
    }

    #[test]
    fn calculate_with_all_options() {
        let cli = parse_args(args("--data-dir /tmp/c calculate --user 3 --fuel diesel --amount 10.5 \
                                   --unit Gallons --temperature 25 --scale C --technique Organic \
                                   --output-unit Grams --dry-run")).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/c")));
        assert_eq!(cli.command, Command::Calculate(CalculateArgs {
            user: "3".to_string(),
            fuel: "diesel".to_string(),
            amount: 10.5,
            unit: "Gallons".to_string(),
            temperature: Some(25.0),
            scale: Some("C".to_string()),
            technique: Some("Organic".to_string()),
            output_unit: Some("Grams".to_string()),
            dry_run: true,
            local_weather: false
        }));
    }

    #[test]
    fn calculate_needs_amount_and_defaults_unit() {
        assert_eq!(parse_args(args("calculate --user 1 --fuel gasoline")).unwrap_err(),
                   CliError::MissingArgument("--amount".to_string()));
        assert_eq!(parse_args(args("calculate --user 1 --fuel gasoline --amount lots")).unwrap_err(),
                   CliError::InvalidValue("--amount".to_string(), "lots".to_string()));
        match parse_args(args("calculate --user=1 --fuel=gasoline --amount=2")).unwrap().command {
            Command::Calculate(calc) => assert_eq!(calc.unit, "Liters"),
            other => panic!("unexpected command {:?}", other)
        }
    }

    #[test]
    fn export_and_history_filters() {
        let cli = parse_args(args("export out.json --format json --last 6m")).unwrap();
        assert_eq!(cli.command, Command::Export {
            path: Some(PathBuf::from("out.json")),
            format: Some(TransferFormat::Json),
            filter: HistoryArgs { user: None, fuel: None, last: Some(TimeFrame::Months(6)) }
        });
        assert!(matches!(parse_args(args("history --last fortnight")), Err(CliError::InvalidValue(_, _))));
        assert!(matches!(parse_args(args("history --format csv")), Err(CliError::UnknownOption(_))));
    }

    #[test]
    fn settings_and_reset() {
        assert_eq!(parse_args(args("settings")).unwrap().command, Command::Settings(SettingsCommand::List));
        assert_eq!(parse_args(args("settings set preferences theme Dark")).unwrap().command,
                   Command::Settings(SettingsCommand::Set {
                       category: "preferences".to_string(),
                       name: "theme".to_string(),
                       value: "Dark".to_string()
                   }));
        assert!(parse_args(args("settings get preferences")).is_err());
        assert_eq!(parse_args(args("reset")).unwrap().command, Command::Reset { confirmed: false });
        assert_eq!(parse_args(args("reset --yes")).unwrap().command, Command::Reset { confirmed: true });
    }

    #[test]
    fn bad_invocations() {
        assert_eq!(parse_args(Vec::new()).unwrap_err(), CliError::MissingCommand);
        assert_eq!(parse_args(args("launch")).unwrap_err(), CliError::UnknownCommand("launch".to_string()));
        assert_eq!(parse_args(args("import")).unwrap_err(), CliError::MissingArgument("file".to_string()));
        assert_eq!(parse_args(args("calculate --user")).unwrap_err(), CliError::MissingValue("--user".to_string()));
    }
}
