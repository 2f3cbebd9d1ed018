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

use std::result;
use utils::units::UnsupportedUnit;

pub type Result<T> = result::Result<T, EmissionsError>;

#[derive(thiserror::Error, Debug)]
pub enum EmissionsError {
    #[error("validation failure. `{0}`")]
    Validation(String),
    #[error("no emissions modifier found for fuel type `{0}`")]
    FuelTypeNotFound(String),
    #[error("no emissions modifier found for farming technique `{0}`")]
    TechniqueNotFound(String),
    #[error("unsupported unit. `{0}`")]
    UnsupportedUnit(#[from] UnsupportedUnit),
    #[error("storage error. `{0}`")]
    Storage(#[from] rusqlite::Error),
    #[error("failed to open `{0}`. `{1}`")]
    FailedToOpen(String, String),
    #[error("invalid emissions variables. `{0}`")]
    InvalidVariables(String),
    #[error("record {0} was stored but could not be read back. `{1}`")]
    StoredButUnreadable(i64, String)
}

impl EmissionsError {
    pub(crate) fn validation(details: impl Into<String>) -> EmissionsError {
        EmissionsError::Validation(details.into())
    }

    /// True for failures caused by the values the caller supplied
    pub fn is_user_error(&self) -> bool {
        matches!(self,
            EmissionsError::Validation(_) |
            EmissionsError::FuelTypeNotFound(_) |
            EmissionsError::TechniqueNotFound(_))
    }
}
