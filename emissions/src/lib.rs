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

pub mod calculator;
pub mod error;
pub mod factors;
pub mod record;
pub mod store;
pub mod transfer;
pub mod validation;

pub use calculator::{CalculationRequest, EmissionsCalculator, Estimate};
pub use error::{EmissionsError, Result};
pub use factors::{EmissionsVariables, FactorSource, FactorTable, SqliteFactorTable};
pub use record::{EmissionsRecord, NewRecord, Temperature};
pub use store::{HistoryFilter, HistoryStore, SqliteHistoryStore, TimeFrame};
