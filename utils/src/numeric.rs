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

pub fn round_float_to(float: f64, decimal_places: u32) -> f64 {
    let precision_base: u64 = 10;
    let precision_factor = precision_base.pow(decimal_places) as f64;
    (float * precision_factor).round() / precision_factor
}

/// Formats `float` with exactly `decimal_places` digits after the point
pub fn format_float_to(float: f64, decimal_places: u32) -> String {
    format!("{:.*}", decimal_places as usize, round_float_to(float, decimal_places))
}

/// True if `val` lies in the range representable by a signed 64-bit integer.
/// `i64::MAX as f64` rounds up to 2^63, which is itself out of range
pub fn is_within_i64_range(val: f64) -> bool {
    if !val.is_finite() {
        return false;
    }
    val >= i64::MIN as f64 && val < i64::MAX as f64
}

/// Splits a leading decimal number off a string such as "10.5 Liters".
/// Returns the number and the trimmed remainder
pub fn split_leading_float(val: &str) -> Option<(f64, &str)> {
    let trimmed = val.trim();
    let end = trimmed
        .char_indices()
        .find(|(idx, c)| {
            !(c.is_ascii_digit() || *c == '.' || ((*c == '-' || *c == '+') && *idx == 0))
        })
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());
    let number = trimmed[..end].parse::<f64>().ok()?;
    Some((number, trimmed[end..].trim()))
}
