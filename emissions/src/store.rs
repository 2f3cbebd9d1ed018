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

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use chrono::{Duration, NaiveDateTime, Utc};
use rusqlite::{Connection, params, params_from_iter};
use rusqlite::types::Value;
use tracing::{debug, info};
use crate::error::{EmissionsError, Result};
use crate::record::{EmissionsRecord, format_timestamp, ImportedRecord, NewRecord, RecordId};

/// Append-only log of completed calculations
pub trait HistoryStore {
    fn append(&self, record: &NewRecord) -> Result<RecordId>;
    fn fetch(&self, id: RecordId) -> Result<EmissionsRecord>;
    fn query(&self, filter: &HistoryFilter) -> Result<Vec<EmissionsRecord>>;
    fn distinct_user_ids(&self) -> Result<BTreeSet<String>>;
}

/// A window ending now. Months are 30 days and years 365 days
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimeFrame {
    Days(u32),
    Months(u32),
    Years(u32)
}

impl TimeFrame {
    /// Ten thousand years
    pub const MAX_DAYS: i64 = 3_650_000;

    pub fn as_days(&self) -> i64 {
        match self {
            TimeFrame::Days(n) => *n as i64,
            TimeFrame::Months(n) => *n as i64 * 30,
            TimeFrame::Years(n) => *n as i64 * 365
        }
    }

    /// A window reaching back past the earliest representable time starts there instead
    pub fn range_ending(&self, end: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let start = Duration::try_days(self.as_days())
            .and_then(|window| end.checked_sub_signed(window))
            .unwrap_or(NaiveDateTime::MIN);
        (start, end)
    }
}

impl Display for TimeFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Days(n) => write!(f, "{}d", n),
            TimeFrame::Months(n) => write!(f, "{}m", n),
            TimeFrame::Years(n) => write!(f, "{}y", n)
        }
    }
}

impl FromStr for TimeFrame {
    type Err = EmissionsError;

    /// Parses "30d", "6m" or "1y"
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || EmissionsError::validation(format!("invalid time frame `{}`", s));
        let suffix = s.chars().last().ok_or_else(invalid)?;
        let count = s[..s.len() - suffix.len_utf8()].parse::<u32>().map_err(|_| invalid())?;
        let time_frame = match suffix {
            'd' | 'D' => TimeFrame::Days(count),
            'm' | 'M' => TimeFrame::Months(count),
            'y' | 'Y' => TimeFrame::Years(count),
            _ => return Err(invalid())
        };
        if time_frame.as_days() > TimeFrame::MAX_DAYS {
            return Err(invalid());
        }
        Ok(time_frame)
    }
}

/// Constraints ANDed together by [HistoryStore::query]. `None` leaves a field unconstrained
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub time_range: Option<(NaiveDateTime, NaiveDateTime)>,
    pub user_id: Option<i64>,
    pub fuel_type: Option<String>,
    pub emissions_unit: Option<String>
}

impl HistoryFilter {
    pub fn all() -> HistoryFilter {
        HistoryFilter::default()
    }

    /// Both ends are inclusive
    pub fn between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> HistoryFilter {
        self.time_range = Some((start, end));
        self
    }

    pub fn within_last(self, time_frame: TimeFrame) -> HistoryFilter {
        let (start, end) = time_frame.range_ending(Utc::now().naive_utc());
        self.between(start, end)
    }

    pub fn for_user(mut self, user_id: i64) -> HistoryFilter {
        self.user_id = Some(user_id);
        self
    }

    pub fn for_fuel_type(mut self, fuel_type: &str) -> HistoryFilter {
        self.fuel_type = Some(fuel_type.to_string());
        self
    }

    pub fn in_emissions_unit(mut self, unit: &str) -> HistoryFilter {
        self.emissions_unit = Some(unit.to_string());
        self
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut query = format!("SELECT {} FROM emissions WHERE 1=1", EmissionsRecord::COLUMNS);
        let mut values = Vec::new();
        if let Some((start, end)) = &self.time_range {
            query.push_str(" AND timestamp >= ? AND timestamp <= ?");
            values.push(Value::Text(format_timestamp(start)));
            values.push(Value::Text(format_timestamp(end)));
        }
        if let Some(user_id) = self.user_id {
            query.push_str(" AND user_id = ?");
            values.push(Value::Integer(user_id));
        }
        if let Some(fuel_type) = &self.fuel_type {
            query.push_str(" AND fuel_type = ?");
            values.push(Value::Text(fuel_type.clone()));
        }
        if let Some(unit) = &self.emissions_unit {
            query.push_str(" AND emissions_unit = ?");
            values.push(Value::Text(unit.clone()));
        }
        query.push_str(" ORDER BY timestamp DESC, id DESC");
        (query, values)
    }
}

pub struct SqliteHistoryStore {
    conn: Connection
}

impl SqliteHistoryStore {
    pub fn open(path: &Path) -> Result<SqliteHistoryStore> {
        info!("Opening emissions history at {}", path.display());
        let conn = Connection::open(path).map_err(|e| {
            EmissionsError::FailedToOpen(path.display().to_string(), e.to_string())
        })?;
        SqliteHistoryStore::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<SqliteHistoryStore> {
        SqliteHistoryStore::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<SqliteHistoryStore> {
        conn.execute_batch(create_table_query())?;
        Ok(SqliteHistoryStore { conn })
    }

    /// Inserts previously exported records with their own timestamps. Either every record
    /// is written or none are
    pub fn import(&self, records: &[ImportedRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO emissions
                 (user_id, fuel_type, fuel_used, emissions, emissions_unit, temperature, farming_technique, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            )?;
            for imported in records {
                let r = &imported.record;
                stmt.execute(params![
                    r.user_id,
                    r.fuel_type,
                    r.fuel_used,
                    r.emissions,
                    r.emissions_unit,
                    r.temperature,
                    r.farming_technique,
                    format_timestamp(&imported.timestamp)
                ])?;
            }
        }
        tx.commit()?;
        info!("Imported {} records", records.len());
        Ok(records.len())
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM emissions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Deletes every record. Only reachable through administrative setup
    pub fn purge(&self) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM emissions", [])?;
        info!("Purged {} records from the emissions history", deleted);
        Ok(deleted)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&self, record: &NewRecord) -> Result<RecordId> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO emissions
             (user_id, fuel_type, fuel_used, emissions, emissions_unit, temperature, farming_technique)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.user_id,
                record.fuel_type,
                record.fuel_used,
                record.emissions,
                record.emissions_unit,
                record.temperature,
                record.farming_technique
            ]
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        debug!("Appended record {} for user {}", id, record.user_id);
        Ok(id)
    }

    fn fetch(&self, id: RecordId) -> Result<EmissionsRecord> {
        Ok(self.conn.query_row(
            &format!("SELECT {} FROM emissions WHERE id = ?1", EmissionsRecord::COLUMNS),
            params![id],
            EmissionsRecord::load_from_row
        )?)
    }

    fn query(&self, filter: &HistoryFilter) -> Result<Vec<EmissionsRecord>> {
        let (query, values) = filter.to_sql();
        debug!("Querying emissions history with {:?}", filter);
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), EmissionsRecord::load_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn distinct_user_ids(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT user_id FROM emissions")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut user_ids = BTreeSet::new();
        for user_id in rows {
            user_ids.insert(user_id?.to_string());
        }
        Ok(user_ids)
    }
}

fn create_table_query() -> &'static str {
    "CREATE TABLE IF NOT EXISTS emissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL CHECK (user_id > 0),
        fuel_type TEXT NOT NULL,
        fuel_used TEXT NOT NULL,
        emissions TEXT NOT NULL,
        emissions_unit TEXT,
        temperature TEXT,
        farming_technique TEXT,
        timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS emissions_timestamp ON emissions (timestamp);"
}
