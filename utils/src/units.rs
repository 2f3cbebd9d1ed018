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

//! Mass, volume and temperature units.
//!
//! Mass quantities pass through kilograms and volume quantities through liters. The two
//! families never convert into each other.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const LITERS_PER_CUBIC_FOOT: f64 = 28.3168;
pub const LITERS_PER_CUBIC_METER: f64 = 1000.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedUnit {
    #[error("unsupported {0} unit `{1}`")]
    NotInFamily(UnitFamily, String),
    #[error("unknown unit `{0}`")]
    Unknown(String),
    #[error("unknown temperature scale code `{0}`")]
    UnknownScaleCode(i64),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum UnitFamily {
    Mass,
    Volume
}

impl UnitFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitFamily::Mass => "mass",
            UnitFamily::Volume => "volume"
        }
    }

    pub fn base_unit(&self) -> Unit {
        match self {
            UnitFamily::Mass => Unit::Mass(MassUnit::Kilograms),
            UnitFamily::Volume => Unit::Volume(VolumeUnit::Liters)
        }
    }
}

impl Display for UnitFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum MassUnit {
    Milligrams,
    Grams,
    #[default]
    Kilograms,
    MetricTons
}

impl MassUnit {
    pub const ALL: [MassUnit; 4] = [MassUnit::Milligrams, MassUnit::Grams, MassUnit::Kilograms, MassUnit::MetricTons];

    pub fn as_str(&self) -> &'static str {
        match self {
            MassUnit::Milligrams => "Milligrams",
            MassUnit::Grams => "Grams",
            MassUnit::Kilograms => "Kilograms",
            MassUnit::MetricTons => "Metric Tons"
        }
    }

    /// Converts `quantity` of this unit into kilograms
    pub fn to_kilograms(&self, quantity: f64) -> f64 {
        match self {
            MassUnit::Milligrams => quantity / 1_000_000.0,
            MassUnit::Grams => quantity / 1000.0,
            MassUnit::Kilograms => quantity,
            MassUnit::MetricTons => quantity * 1000.0
        }
    }

    /// Converts `kilograms` into this unit
    pub fn from_kilograms(&self, kilograms: f64) -> f64 {
        match self {
            MassUnit::Milligrams => kilograms * 1_000_000.0,
            MassUnit::Grams => kilograms * 1000.0,
            MassUnit::Kilograms => kilograms,
            MassUnit::MetricTons => kilograms / 1000.0
        }
    }

    fn from_name(name: &str) -> Option<MassUnit> {
        match normalise_unit_name(name).as_str() {
            "milligrams" | "milligram" | "mg" => Some(MassUnit::Milligrams),
            "grams" | "gram" | "g" => Some(MassUnit::Grams),
            "kilograms" | "kilogram" | "kg" => Some(MassUnit::Kilograms),
            "metric tons" | "metric ton" | "tonnes" | "tonne" | "t" => Some(MassUnit::MetricTons),
            _ => None
        }
    }
}

impl Display for MassUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MassUnit {
    type Err = UnsupportedUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MassUnit::from_name(s).ok_or_else(|| UnsupportedUnit::NotInFamily(UnitFamily::Mass, s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum VolumeUnit {
    #[default]
    Liters,
    CubicMeters,
    CubicFeet
}

impl VolumeUnit {
    pub const ALL: [VolumeUnit; 3] = [VolumeUnit::Liters, VolumeUnit::CubicMeters, VolumeUnit::CubicFeet];

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeUnit::Liters => "Liters",
            VolumeUnit::CubicMeters => "Cubic Meters",
            VolumeUnit::CubicFeet => "Cubic Feet"
        }
    }

    pub fn to_liters(&self, quantity: f64) -> f64 {
        match self {
            VolumeUnit::Liters => quantity,
            VolumeUnit::CubicMeters => quantity * LITERS_PER_CUBIC_METER,
            VolumeUnit::CubicFeet => quantity * LITERS_PER_CUBIC_FOOT
        }
    }

    pub fn from_liters(&self, liters: f64) -> f64 {
        match self {
            VolumeUnit::Liters => liters,
            VolumeUnit::CubicMeters => liters / LITERS_PER_CUBIC_METER,
            VolumeUnit::CubicFeet => liters / LITERS_PER_CUBIC_FOOT
        }
    }

    fn from_name(name: &str) -> Option<VolumeUnit> {
        match normalise_unit_name(name).as_str() {
            "liters" | "liter" | "litres" | "litre" | "l" => Some(VolumeUnit::Liters),
            "cubic meters" | "cubic meter" | "cubic metres" | "cubic metre" | "m3" => Some(VolumeUnit::CubicMeters),
            "cubic feet" | "cubic foot" | "ft3" => Some(VolumeUnit::CubicFeet),
            _ => None
        }
    }
}

impl Display for VolumeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VolumeUnit {
    type Err = UnsupportedUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VolumeUnit::from_name(s).ok_or_else(|| UnsupportedUnit::NotInFamily(UnitFamily::Volume, s.to_string()))
    }
}

/// A unit from either family
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Unit {
    Mass(MassUnit),
    Volume(VolumeUnit)
}

impl Unit {
    /// Parses `name` as a unit of `family` only
    pub fn parse_in(family: UnitFamily, name: &str) -> Result<Unit, UnsupportedUnit> {
        match family {
            UnitFamily::Mass => Ok(Unit::Mass(name.parse()?)),
            UnitFamily::Volume => Ok(Unit::Volume(name.parse()?))
        }
    }

    pub fn family(&self) -> UnitFamily {
        match self {
            Unit::Mass(_) => UnitFamily::Mass,
            Unit::Volume(_) => UnitFamily::Volume
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Mass(u) => u.as_str(),
            Unit::Volume(u) => u.as_str()
        }
    }

    pub fn to_base(&self, quantity: f64) -> f64 {
        match self {
            Unit::Mass(u) => u.to_kilograms(quantity),
            Unit::Volume(u) => u.to_liters(quantity)
        }
    }

    pub fn from_base(&self, quantity: f64) -> f64 {
        match self {
            Unit::Mass(u) => u.from_kilograms(quantity),
            Unit::Volume(u) => u.from_liters(quantity)
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Unit {
    type Err = UnsupportedUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(mass) = MassUnit::from_name(s) {
            return Ok(Unit::Mass(mass));
        }
        if let Some(volume) = VolumeUnit::from_name(s) {
            return Ok(Unit::Volume(volume));
        }
        Err(UnsupportedUnit::Unknown(s.to_string()))
    }
}

impl From<MassUnit> for Unit {
    fn from(value: MassUnit) -> Self {
        Unit::Mass(value)
    }
}

impl From<VolumeUnit> for Unit {
    fn from(value: VolumeUnit) -> Self {
        Unit::Volume(value)
    }
}

pub fn to_base(quantity: f64, unit: Unit) -> f64 {
    unit.to_base(quantity)
}

pub fn from_base(quantity: f64, unit: Unit) -> f64 {
    unit.from_base(quantity)
}

fn normalise_unit_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum TemperatureScale {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin
}

impl TemperatureScale {
    pub const ALL: [TemperatureScale; 3] = [TemperatureScale::Celsius, TemperatureScale::Fahrenheit, TemperatureScale::Kelvin];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureScale::Celsius => "Celsius",
            TemperatureScale::Fahrenheit => "Fahrenheit",
            TemperatureScale::Kelvin => "Kelvin"
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            TemperatureScale::Celsius => 0,
            TemperatureScale::Fahrenheit => 1,
            TemperatureScale::Kelvin => 2
        }
    }

    /// Single letter suffix used when a temperature is stored as text
    pub fn letter(&self) -> char {
        match self {
            TemperatureScale::Celsius => 'C',
            TemperatureScale::Fahrenheit => 'F',
            TemperatureScale::Kelvin => 'K'
        }
    }

    pub fn absolute_zero(&self) -> f64 {
        match self {
            TemperatureScale::Celsius => -273.15,
            TemperatureScale::Fahrenheit => -459.67,
            TemperatureScale::Kelvin => 0.0
        }
    }

    pub fn from_kelvin(&self, kelvin: f64) -> f64 {
        match self {
            TemperatureScale::Celsius => kelvin - 273.15,
            TemperatureScale::Fahrenheit => (kelvin - 273.15) * 9.0 / 5.0 + 32.0,
            TemperatureScale::Kelvin => kelvin
        }
    }

    pub fn to_kelvin(&self, value: f64) -> f64 {
        match self {
            TemperatureScale::Celsius => value + 273.15,
            TemperatureScale::Fahrenheit => (value - 32.0) * 5.0 / 9.0 + 273.15,
            TemperatureScale::Kelvin => value
        }
    }
}

impl TryFrom<i64> for TemperatureScale {
    type Error = UnsupportedUnit;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TemperatureScale::Celsius),
            1 => Ok(TemperatureScale::Fahrenheit),
            2 => Ok(TemperatureScale::Kelvin),
            _ => Err(UnsupportedUnit::UnknownScaleCode(value))
        }
    }
}

impl Display for TemperatureScale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TemperatureScale {
    type Err = UnsupportedUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise_unit_name(s).as_str() {
            "celsius" | "c" | "°c" => Ok(TemperatureScale::Celsius),
            "fahrenheit" | "f" | "°f" => Ok(TemperatureScale::Fahrenheit),
            "kelvin" | "k" => Ok(TemperatureScale::Kelvin),
            _ => Err(UnsupportedUnit::Unknown(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn all_units() -> Vec<Unit> {
        let mut units: Vec<Unit> = MassUnit::ALL.iter().map(|u| Unit::Mass(*u)).collect();
        units.extend(VolumeUnit::ALL.iter().map(|u| Unit::Volume(*u)));
        units
    }

    #[test]
    fn base_round_trip() {
        for unit in all_units() {
            for value in [0.001, 1.0, 10.5, 250.0, 1_000_000.0] {
                let back = from_base(to_base(value, unit), unit);
                assert!((back - value).abs() <= TOLERANCE * value.max(1.0),
                        "{} {} came back as {}", value, unit, back);
            }
        }
    }

    #[test]
    fn mass_to_kilograms() {
        assert_eq!(to_base(5_000_000.0, Unit::Mass(MassUnit::Milligrams)), 5.0);
        assert_eq!(to_base(2500.0, Unit::Mass(MassUnit::Grams)), 2.5);
        assert_eq!(to_base(3.0, Unit::Mass(MassUnit::Kilograms)), 3.0);
        assert_eq!(to_base(1.5, Unit::Mass(MassUnit::MetricTons)), 1500.0);
        assert_eq!(from_base(2.0, Unit::Mass(MassUnit::Grams)), 2000.0);
    }

    #[test]
    fn volume_to_liters() {
        assert_eq!(to_base(2.0, Unit::Volume(VolumeUnit::CubicMeters)), 2000.0);
        assert_eq!(to_base(1.0, Unit::Volume(VolumeUnit::CubicFeet)), LITERS_PER_CUBIC_FOOT);
        assert_eq!(to_base(7.0, Unit::Volume(VolumeUnit::Liters)), 7.0);
    }

    #[test]
    fn parse_unit_names() {
        assert_eq!("Metric Tons".parse::<Unit>(), Ok(Unit::Mass(MassUnit::MetricTons)));
        assert_eq!("cubic  feet".parse::<Unit>(), Ok(Unit::Volume(VolumeUnit::CubicFeet)));
        assert_eq!("kg".parse::<Unit>(), Ok(Unit::Mass(MassUnit::Kilograms)));
        assert_eq!("L".parse::<Unit>(), Ok(Unit::Volume(VolumeUnit::Liters)));
        assert_eq!("gallons".parse::<Unit>(), Err(UnsupportedUnit::Unknown("gallons".to_string())));
    }

    #[test]
    fn families_are_disjoint() {
        assert_eq!(Unit::parse_in(UnitFamily::Mass, "Liters"),
                   Err(UnsupportedUnit::NotInFamily(UnitFamily::Mass, "Liters".to_string())));
        assert_eq!(Unit::parse_in(UnitFamily::Volume, "Grams"),
                   Err(UnsupportedUnit::NotInFamily(UnitFamily::Volume, "Grams".to_string())));
        assert_eq!(Unit::parse_in(UnitFamily::Volume, "Cubic Meters"),
                   Ok(Unit::Volume(VolumeUnit::CubicMeters)));
    }

    #[test]
    fn temperature_scales() {
        assert_eq!(TemperatureScale::try_from(0), Ok(TemperatureScale::Celsius));
        assert_eq!(TemperatureScale::try_from(1), Ok(TemperatureScale::Fahrenheit));
        assert_eq!(TemperatureScale::try_from(2), Ok(TemperatureScale::Kelvin));
        assert_eq!(TemperatureScale::try_from(3), Err(UnsupportedUnit::UnknownScaleCode(3)));
        assert_eq!("fahrenheit".parse::<TemperatureScale>(), Ok(TemperatureScale::Fahrenheit));
        assert!((TemperatureScale::Celsius.from_kelvin(293.15) - 20.0).abs() < TOLERANCE);
        assert!((TemperatureScale::Fahrenheit.from_kelvin(293.15) - 68.0).abs() < TOLERANCE);
        for scale in TemperatureScale::ALL {
            assert!((scale.to_kelvin(scale.absolute_zero())).abs() < 1e-6);
        }
    }
}
