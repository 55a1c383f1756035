//! One-hour load forecast from the diurnal, weekly, seasonal, and weather patterns.

use serde::Serialize;

use super::ForecastEngine;
use crate::sim::clock::ClockSample;
use crate::sim::draws::round_to;
use crate::sim::patterns::{
    REFERENCE_TEMP_C, hourly_pattern, seasonal_pattern, weather_factor, weekly_pattern,
};

const LOAD_CONFIDENCE: f64 = 0.85;
/// Half-width of the band around the prediction, as a share of it.
const LOAD_UNCERTAINTY: f64 = 0.15;

/// The pattern multipliers behind a load prediction, to three decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadFactors {
    pub hourly: f64,
    pub weekly: f64,
    pub seasonal: f64,
    pub weather: f64,
}

/// Predicted household load with its confidence band, in watts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadForecast {
    pub time_label: String,
    pub predicted_load: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
    pub factors: LoadFactors,
}

impl ForecastEngine {
    /// Load forecast for the hour containing `at`.
    pub fn load(&self, at: &ClockSample) -> LoadForecast {
        let hourly = hourly_pattern(at.hour());
        let weekly = weekly_pattern(at.weekday());
        let seasonal = seasonal_pattern(at.month0());
        let weather = weather_factor(self.config.ambient_temp_c, REFERENCE_TEMP_C);

        let predicted = self.config.base_load_w * hourly * weekly * seasonal * weather;
        let uncertainty = predicted * LOAD_UNCERTAINTY;

        LoadForecast {
            time_label: at.time_label(),
            predicted_load: predicted.round(),
            lower_bound: (predicted - uncertainty).round(),
            upper_bound: (predicted + uncertainty).round(),
            confidence: LOAD_CONFIDENCE,
            factors: LoadFactors {
                hourly: round_to(hourly, 3),
                weekly: round_to(weekly, 3),
                seasonal: round_to(seasonal, 3),
                weather: round_to(weather, 3),
            },
        }
    }
}
