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

//! CSV and JSON import and export of the emissions history.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use utils::numeric::split_leading_float;
use crate::error::EmissionsError;
use crate::record::{EmissionsRecord, format_timestamp, ImportedRecord, NewRecord, parse_timestamp};
use crate::store::{HistoryFilter, HistoryStore, SqliteHistoryStore};
use crate::validation::{parse_user_id, validate_emissions_result, validate_fuel_used};

pub const REQUIRED_COLUMNS: [&'static str; 5] = ["user_id", "fuel_type", "fuel_used", "emissions", "timestamp"];
pub const EXPORT_COLUMNS: [&'static str; 8] = [
    "user_id", "fuel_type", "fuel_used", "emissions", "emissions_unit", "temperature", "farming_technique", "timestamp"
];

#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    #[error("io error. `{0}`")]
    IoError(#[from] io::Error),
    #[error("csv error. `{0}`")]
    CsvError(#[from] csv::Error),
    #[error("json error. `{0}`")]
    JsonError(#[from] serde_json::Error),
    #[error("unsupported file format `{0}`")]
    UnsupportedFormat(String),
    #[error("expected a list of records")]
    NotARecordList,
    #[error("Missing required keys: {}", .0.iter().join(", "))]
    MissingKeys(BTreeSet<String>),
    #[error("Missing value for key `{key}` in row {row}")]
    MissingValue { key: String, row: usize },
    #[error("invalid value `{value}` for key `{key}` in row {row}")]
    InvalidValue { key: String, value: String, row: usize },
    #[error("store error. `{0}`")]
    StoreError(#[from] EmissionsError)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TransferFormat {
    Csv,
    Json
}

impl TransferFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferFormat::Csv => "csv",
            TransferFormat::Json => "json"
        }
    }

    pub fn from_path(path: &Path) -> Result<TransferFormat, TransferError> {
        let extension = path.extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        extension.parse()
    }
}

impl Display for TransferFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(TransferFormat::Csv),
            "json" => Ok(TransferFormat::Json),
            _ => Err(TransferError::UnsupportedFormat(s.to_string()))
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    user_id: i64,
    fuel_type: &'a str,
    fuel_used: &'a str,
    emissions: &'a str,
    emissions_unit: Option<&'a str>,
    temperature: Option<&'a str>,
    farming_technique: Option<&'a str>,
    timestamp: String
}

impl<'a> From<&'a EmissionsRecord> for ExportRow<'a> {
    fn from(r: &'a EmissionsRecord) -> Self {
        ExportRow {
            user_id: r.user_id,
            fuel_type: &r.fuel_type,
            fuel_used: &r.fuel_used,
            emissions: &r.emissions,
            emissions_unit: r.emissions_unit.as_deref(),
            temperature: r.temperature.as_deref(),
            farming_technique: r.farming_technique.as_deref(),
            timestamp: format_timestamp(&r.timestamp)
        }
    }
}

pub fn write_csv<W: Write>(writer: W, records: &[EmissionsRecord]) -> Result<(), TransferError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(EXPORT_COLUMNS)?;
    for record in records {
        writer.serialize(ExportRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(writer: W, records: &[EmissionsRecord]) -> Result<(), TransferError> {
    let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();
    serde_json::to_writer_pretty(writer, &rows)?;
    Ok(())
}

/// Writes the records matching `filter` to `path`, returning how many were written
pub fn export_history<S: HistoryStore + ?Sized>(store: &S,
                                                filter: &HistoryFilter,
                                                path: &Path,
                                                format: TransferFormat) -> Result<usize, TransferError> {
    let records = store.query(filter)?;
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        TransferFormat::Csv => write_csv(&mut writer, &records)?,
        TransferFormat::Json => write_json(&mut writer, &records)?
    }
    writer.flush()?;
    info!("Data exported to {}", path.display());
    Ok(records.len())
}

type RawRow = HashMap<String, String>;

/// Reads CSV rows. Required headers are checked once for the whole file
pub fn read_csv<R: io::Read>(reader: R) -> Result<Vec<ImportedRecord>, TransferError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    check_required_keys(headers.iter().map(String::as_str))?;

    let mut imported = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let row: RawRow = headers.iter().cloned()
            .zip(record.iter().map(|v| v.to_string()))
            .collect();
        imported.push(raw_row_to_record(&row, idx + 1)?);
    }
    Ok(imported)
}

/// Reads a JSON list of objects. Every object must carry the required keys
pub fn read_json<R: io::Read>(reader: R) -> Result<Vec<ImportedRecord>, TransferError> {
    let document: Value = serde_json::from_reader(reader)?;
    let entries = document.as_array().ok_or(TransferError::NotARecordList)?;

    let mut imported = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let object = entry.as_object().ok_or(TransferError::NotARecordList)?;
        check_required_keys(object.keys().map(String::as_str))?;
        let row: RawRow = object.iter()
            .filter_map(|(key, value)| json_value_to_string(value).map(|v| (key.clone(), v)))
            .collect();
        imported.push(raw_row_to_record(&row, idx + 1)?);
    }
    Ok(imported)
}

/// Validates the whole file before writing it to the store in a single transaction
pub fn import_history(store: &SqliteHistoryStore, path: &Path) -> Result<usize, TransferError> {
    let format = TransferFormat::from_path(path)?;
    let reader = BufReader::new(File::open(path)?);
    let records = match format {
        TransferFormat::Csv => read_csv(reader),
        TransferFormat::Json => read_json(reader)
    }.map_err(|e| {
        error!("Failed to import {}. {}", path.display(), e);
        e
    })?;
    let count = store.import(&records)?;
    info!("Data imported successfully from {}", path.display());
    Ok(count)
}

fn check_required_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Result<(), TransferError> {
    let present: BTreeSet<&str> = keys.collect();
    let missing: BTreeSet<String> = REQUIRED_COLUMNS.iter()
        .filter(|key| !present.contains(*key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        error!("Missing required keys: {:?}", missing);
        return Err(TransferError::MissingKeys(missing));
    }
    Ok(())
}

fn json_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string())
    }
}

fn required_value<'a>(row: &'a RawRow, key: &str, row_num: usize) -> Result<&'a str, TransferError> {
    match row.get(key).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TransferError::MissingValue { key: key.to_string(), row: row_num })
    }
}

fn optional_value(row: &RawRow, key: &str) -> Option<String> {
    row.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()).map(|v| v.to_string())
}

fn raw_row_to_record(row: &RawRow, row_num: usize) -> Result<ImportedRecord, TransferError> {
    let required = |key: &str| required_value(row, key, row_num);
    let invalid = |key: &str, value: &str| TransferError::InvalidValue {
        key: key.to_string(), value: value.to_string(), row: row_num
    };

    let user_id_value = required("user_id")?;
    let fuel_type = required("fuel_type")?;
    let fuel_used = required("fuel_used")?;
    let emissions = required("emissions")?;
    let timestamp_value = required("timestamp")?;

    let user_id = parse_user_id(user_id_value).map_err(|_| invalid("user_id", user_id_value))?;
    match split_leading_float(fuel_used) {
        Some((amount, _)) if validate_fuel_used(amount) => {}
        _ => return Err(invalid("fuel_used", fuel_used))
    }
    match split_leading_float(emissions) {
        Some((amount, _)) if validate_emissions_result(amount) => {}
        _ => return Err(invalid("emissions", emissions))
    }
    let timestamp = parse_timestamp(timestamp_value).map_err(|_| invalid("timestamp", timestamp_value))?;

    Ok(ImportedRecord {
        record: NewRecord {
            user_id,
            fuel_type: fuel_type.to_string(),
            fuel_used: fuel_used.to_string(),
            emissions: emissions.to_string(),
            emissions_unit: optional_value(row, "emissions_unit"),
            temperature: optional_value(row, "temperature"),
            farming_technique: optional_value(row, "farming_technique")
        },
        timestamp
    })
}
