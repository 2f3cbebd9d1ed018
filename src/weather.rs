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

//! Blocking lookups of the caller's location and the current temperature there.
//! The calculation core never calls these; the front end passes the reading in.

use std::time::Duration;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{error, info};
use emissions::Temperature;
use utils::units::TemperatureScale;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const IPINFO_URL: &'static str = "https://ipinfo.io/json";
const OPENWEATHERMAP_URL: &'static str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(thiserror::Error, Debug)]
pub enum WeatherError {
    #[error("no api key configured for {0}")]
    MissingApiKey(String),
    #[error("http request failed. `{0}`")]
    RequestFailed(#[from] reqwest::Error),
    #[error("api error. {0}")]
    ApiError(String),
    #[error("unexpected response. {0}")]
    BadResponse(String)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64
}

fn build_client() -> Result<Client, WeatherError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

pub struct LocationService {
    client: Client,
    access_token: String
}

impl LocationService {
    pub fn new(access_token: &str) -> Result<LocationService, WeatherError> {
        if access_token.trim().is_empty() {
            return Err(WeatherError::MissingApiKey("ipinfo.io".to_string()));
        }
        Ok(LocationService { client: build_client()?, access_token: access_token.trim().to_string() })
    }

    pub fn locate(&self) -> Result<Location, WeatherError> {
        info!("Fetching location data");
        let body: Value = self.client.get(IPINFO_URL)
            .query(&[("token", self.access_token.as_str())])
            .send()?
            .json()?;
        parse_location(&body).map_err(|e| {
            error!("Failed to determine location. {}", e);
            e
        })
    }
}

pub struct WeatherService {
    client: Client,
    api_key: String
}

impl WeatherService {
    pub fn new(api_key: &str) -> Result<WeatherService, WeatherError> {
        if api_key.trim().is_empty() {
            return Err(WeatherError::MissingApiKey("OpenWeatherMap".to_string()));
        }
        Ok(WeatherService { client: build_client()?, api_key: api_key.trim().to_string() })
    }

    pub fn current_temperature(&self,
                               location: &Location,
                               scale: TemperatureScale) -> Result<Temperature, WeatherError> {
        info!("Fetching weather data");
        let body: Value = self.client.get(OPENWEATHERMAP_URL)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("appid", self.api_key.clone())
            ])
            .send()?
            .json()?;
        let reading = parse_temperature(&body).map_err(|e| {
            error!("Error getting weather data. {}", e);
            e
        })?;
        info!("Temperature retrieved: {}", reading.to_scale(scale));
        Ok(reading.to_scale(scale))
    }
}

/// ipinfo reports `loc` as `"lat,lon"`
pub fn parse_location(body: &Value) -> Result<Location, WeatherError> {
    let loc = body.get("loc")
        .and_then(Value::as_str)
        .ok_or_else(|| WeatherError::BadResponse("no `loc` field".to_string()))?;
    let (lat, lon) = loc.split_once(',')
        .ok_or_else(|| WeatherError::BadResponse(format!("malformed location `{}`", loc)))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|_| {
        WeatherError::BadResponse(format!("malformed location `{}`", loc))
    });
    Ok(Location { latitude: parse(lat)?, longitude: parse(lon)? })
}

/// Reads `main.temp`, which OpenWeatherMap reports in Kelvin unless asked otherwise.
/// `cod` arrives as a number on success and sometimes as a string on failure
pub fn parse_temperature(body: &Value) -> Result<Temperature, WeatherError> {
    let code = match body.get("cod") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse::<i64>().ok(),
        _ => None
    };
    if code != Some(200) {
        let message = body.get("message").and_then(Value::as_str).unwrap_or("Unknown error");
        return Err(WeatherError::ApiError(message.to_string()));
    }
    let kelvin = body.get("main")
        .and_then(|m| m.get("temp"))
        .and_then(Value::as_f64)
        .ok_or_else(|| WeatherError::BadResponse("no `main.temp` field".to_string()))?;
    Ok(Temperature::kelvin(kelvin))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use utils::units::TemperatureScale;
    use crate::weather::{Location, parse_location, parse_temperature, WeatherError, WeatherService};

    #[test]
    fn location_is_split_into_coordinates() {
        let body = json!({"ip": "1.2.3.4", "loc": "51.5074,-0.1278"});
        assert_eq!(parse_location(&body).unwrap(), Location { latitude: 51.5074, longitude: -0.1278 });
        assert!(parse_location(&json!({"loc": "nowhere"})).is_err());
        assert!(parse_location(&json!({})).is_err());
    }

    #[test]
    fn temperature_is_read_in_kelvin() {
        let body = json!({"cod": 200, "main": {"temp": 298.15}});
        let reading = parse_temperature(&body).unwrap().to_scale(TemperatureScale::Celsius);
        assert!((reading.value - 25.0).abs() < 1e-9);
        assert_eq!(reading.scale, TemperatureScale::Celsius);
    }

    #[test]
    fn api_errors_are_reported() {
        let body = json!({"cod": "401", "message": "Invalid API key"});
        match parse_temperature(&body) {
            Err(WeatherError::ApiError(message)) => assert_eq!(message, "Invalid API key"),
            other => panic!("unexpected result {:?}", other)
        }
    }

    #[test]
    fn empty_key_is_rejected_without_a_request() {
        assert!(matches!(WeatherService::new("  "), Err(WeatherError::MissingApiKey(_))));
    }
}
