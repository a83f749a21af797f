//! NASA POWER daily weather with weather-derived NDVI.
//!
//! POWER does not serve vegetation indices, so NDVI is estimated from
//! temperature and precipitation on top of a latitude-dependent seasonal
//! curve. Days POWER reports as missing (-999) come back flagged `Missing`.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{ObservationProvider, ProviderError, ProviderResult};
use crate::error::{PhenologyError, PhenologyResult};
use crate::models::{day_of_year, DateRange, GeoPoint, Observation, QualityFlag};

const POWER_DAILY_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";
const POWER_FILL_VALUE: f64 = -999.0;

pub struct PowerProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, BTreeMap<String, f64>>,
}

impl PowerProvider {
    pub fn new() -> PhenologyResult<Self> {
        Self::with_base_url(POWER_DAILY_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> PhenologyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PhenologyError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

/// Estimate native NDVI from one day of weather.
///
/// `temperature_c` drives a Gaussian response around 20 °C, precipitation
/// saturates at 5 mm/day, and both scale a seasonal curve peaking near day
/// `100 + lat / 90 * 30`.
pub fn estimate_ndvi(
    lat: f64,
    date: NaiveDate,
    temperature_c: f64,
    precipitation_mm: Option<f64>,
) -> f64 {
    let peak_day = 100.0 + (lat / 90.0 * 30.0).trunc();
    let offset = day_of_year(date) as f64 - peak_day;
    let seasonal = (-(offset * offset) / (2.0 * 30.0f64.powi(2))).exp();

    let temp_offset = temperature_c - 20.0;
    let temp_factor = (-(temp_offset * temp_offset) / (2.0 * 10.0f64.powi(2))).exp();

    let precip_factor = match precipitation_mm {
        Some(p) if p > 0.0 => (p / 5.0).min(1.0),
        _ => 0.5,
    };

    (0.3 + 0.5 * seasonal * temp_factor * precip_factor).clamp(0.0, 1.0)
}

fn parse_power_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

fn reported(value: Option<&f64>) -> Option<f64> {
    value.copied().filter(|v| *v > POWER_FILL_VALUE + 1.0)
}

#[async_trait]
impl ObservationProvider for PowerProvider {
    fn name(&self) -> &str {
        "nasa-power"
    }

    async fn fetch(&self, point: GeoPoint, range: DateRange) -> ProviderResult<Vec<Observation>> {
        let start = range.start.format("%Y%m%d").to_string();
        let end = range.end.format("%Y%m%d").to_string();
        let lat = point.lat.to_string();
        let lon = point.lon.to_string();
        let params = [
            ("parameters", "T2M,PRECTOTCORR"),
            ("community", "AG"),
            ("latitude", lat.as_str()),
            ("longitude", lon.as_str()),
            ("start", start.as_str()),
            ("end", end.as_str()),
            ("format", "JSON"),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "POWER returned HTTP {}",
                response.status()
            )));
        }

        let body: PowerResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let empty = BTreeMap::new();
        let temps = body.properties.parameter.get("T2M").unwrap_or(&empty);
        let precip = body.properties.parameter.get("PRECTOTCORR").unwrap_or(&empty);

        let mut observations = Vec::with_capacity(temps.len());
        for (raw_date, temp) in temps {
            let Some(date) = parse_power_date(raw_date) else {
                return Err(ProviderError::Malformed(format!("bad date '{}'", raw_date)));
            };
            let precipitation = reported(precip.get(raw_date));
            match reported(Some(temp)) {
                Some(t) => {
                    let ndvi = estimate_ndvi(point.lat, date, t, precipitation);
                    let mut obs =
                        Observation::new(date, Some(ndvi), Some(ndvi * 0.8), QualityFlag::Valid);
                    obs.temperature_c = Some(t);
                    obs.precipitation_mm = precipitation;
                    observations.push(obs);
                }
                None => observations.push(Observation::new(date, None, None, QualityFlag::Missing)),
            }
        }
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_ndvi_peaks_in_spring_with_ideal_weather() {
        let spring = NaiveDate::from_ymd_opt(2023, 4, 22).unwrap();
        let winter = NaiveDate::from_ymd_opt(2023, 12, 20).unwrap();

        let peak = estimate_ndvi(38.9, spring, 20.0, Some(6.0));
        let low = estimate_ndvi(38.9, winter, 20.0, Some(6.0));

        assert!(peak > 0.75);
        assert!((low - 0.3).abs() < 0.01);
    }

    #[test]
    fn test_dry_days_halve_the_response() {
        let day = NaiveDate::from_ymd_opt(2023, 4, 22).unwrap();
        let wet = estimate_ndvi(38.9, day, 20.0, Some(5.0)) - 0.3;
        let dry = estimate_ndvi(38.9, day, 20.0, None) - 0.3;
        assert!((dry - wet / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_values_are_not_reported() {
        assert_eq!(reported(Some(&-999.0)), None);
        assert_eq!(reported(Some(&3.5)), Some(3.5));
        assert_eq!(parse_power_date("20240229"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_power_date("2024-02-29"), None);
    }

    #[test]
    fn test_parse_power_payload() {
        let json = r#"{"properties":{"parameter":{"T2M":{"20240101":4.5,"20240102":-999.0}}}}"#;
        let body: PowerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.properties.parameter["T2M"].len(), 2);
    }
}
