//! Hourly solar generation forecast under fixed weather assumptions.

use std::f64::consts::PI;

use serde::Serialize;

use super::{ForecastEngine, Rating, ensure_horizon};
use crate::error::{MicrogridError, ensure_range};
use crate::sim::clock::ClockSample;
use crate::sim::draws::round_to;
use crate::sim::patterns::REFERENCE_TEMP_C;

const CLEAR_SKY_IRRADIANCE_WM2: f64 = 1000.0;
const CLOUD_ATTENUATION: f64 = 0.8;
const TEMP_COEFFICIENT: f64 = 0.002;
const HUMIDITY_ATTENUATION: f64 = 0.1;
const BASE_CONFIDENCE: f64 = 0.87;
/// Irradiance counted as a high-yield hour in the suggestions (W/m²).
const HIGH_IRRADIANCE_WM2: f64 = 500.0;

/// Weather assumptions held fixed over the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarConditions {
    pub cloud_cover_pct: f64,
    pub ambient_temp_c: f64,
    pub humidity_pct: f64,
}

impl SolarConditions {
    fn validate(&self) -> Result<(), MicrogridError> {
        ensure_range("cloud_cover_pct", self.cloud_cover_pct, 0.0, 100.0)?;
        ensure_range("humidity_pct", self.humidity_pct, 0.0, 100.0)?;
        if !self.ambient_temp_c.is_finite() {
            return Err(MicrogridError::invalid("ambient_temp_c", "must be finite"));
        }
        Ok(())
    }

    fn cloud_factor(&self) -> f64 {
        1.0 - self.cloud_cover_pct / 100.0 * CLOUD_ATTENUATION
    }

    fn temperature_factor(&self) -> f64 {
        1.0 + (self.ambient_temp_c - REFERENCE_TEMP_C) * TEMP_COEFFICIENT
    }

    fn humidity_factor(&self) -> f64 {
        1.0 - self.humidity_pct / 100.0 * HUMIDITY_ATTENUATION
    }

    fn impact(&self) -> Rating {
        if self.cloud_cover_pct > 60.0 {
            Rating::High
        } else if self.cloud_cover_pct > 30.0 {
            Rating::Medium
        } else {
            Rating::Low
        }
    }
}

/// Per-factor derates applied to clear-sky irradiance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherFactors {
    pub cloud_impact: f64,
    pub temperature_impact: f64,
    pub humidity_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarPoint {
    pub time_label: String,
    pub hour_offset: u32,
    /// Hour of day of this point.
    pub hour: u32,
    pub predicted_power_kw: f64,
    pub irradiance_wm2: f64,
    /// Effective panel efficiency after temperature and humidity (%).
    pub efficiency_pct: f64,
    /// Falls linearly from 0.87 and floors at zero after a day.
    pub confidence: f64,
    pub weather_factors: WeatherFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarSummary {
    pub total_daily_generation_kwh: f64,
    /// Time label of the first point with the highest power.
    pub peak_generation_hour: Option<String>,
    pub peak_generation_power_kw: f64,
    pub average_confidence: f64,
    pub weather_impact: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarInsights {
    /// `Excellent`, `Good`, or `Poor` from total generation.
    pub generation_quality: &'static str,
    pub reliability_score: f64,
    pub optimization_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarForecast {
    pub predictions: Vec<SolarPoint>,
    pub summary: SolarSummary,
    pub insights: SolarInsights,
}

impl ForecastEngine {
    /// Hourly solar forecast starting at `at`.
    ///
    /// Deterministic: the same instant and conditions always give the same
    /// series.
    ///
    /// # Errors
    ///
    /// Returns [`MicrogridError::InvalidInput`] if cloud cover or humidity is
    /// outside `[0, 100]`, the temperature is not finite, or the horizon is
    /// over 48 hours.
    pub fn solar(
        &self,
        at: &ClockSample,
        conditions: &SolarConditions,
        horizon_hours: usize,
    ) -> Result<SolarForecast, MicrogridError> {
        let horizon = ensure_horizon(horizon_hours)?;
        conditions.validate().inspect_err(|e| {
            tracing::warn!(error = %e, "solar forecast conditions rejected");
        })?;

        let cloud = conditions.cloud_factor();
        let temperature = conditions.temperature_factor();
        let humidity = conditions.humidity_factor();
        let rated_kw = self.config.panel_rated_kw;
        let panel_efficiency = self.config.panel_efficiency;

        let predictions: Vec<SolarPoint> = (0..horizon)
            .map(|i| {
                let offset = i as u32;
                let point_at = at.plus_hours(i64::from(offset));
                let hour = point_at.hour();
                let base = (CLEAR_SKY_IRRADIANCE_WM2 * (PI * (f64::from(hour) - 6.0) / 12.0).sin())
                    .max(0.0);
                let irradiance = base * cloud * temperature * humidity;
                let power = irradiance * rated_kw * panel_efficiency / 1000.0;

                SolarPoint {
                    time_label: point_at.time_label(),
                    hour_offset: offset,
                    hour,
                    predicted_power_kw: round_to(power, 2).max(0.0),
                    irradiance_wm2: irradiance.round(),
                    efficiency_pct: round_to(panel_efficiency * temperature * humidity * 100.0, 1),
                    confidence: (BASE_CONFIDENCE * (1.0 - f64::from(offset) / 24.0)).max(0.0),
                    weather_factors: WeatherFactors {
                        cloud_impact: round_to(cloud, 3),
                        temperature_impact: round_to(temperature, 3),
                        humidity_impact: round_to(humidity, 3),
                    },
                }
            })
            .collect();

        let total: f64 = predictions.iter().map(|p| p.predicted_power_kw).sum();
        // first strictly-greater point wins ties
        let peak = predictions.iter().fold(None::<&SolarPoint>, |best, p| match best {
            Some(b) if p.predicted_power_kw <= b.predicted_power_kw => Some(b),
            _ => Some(p),
        });
        let average_confidence = if predictions.is_empty() {
            0.0
        } else {
            predictions.iter().map(|p| p.confidence).sum::<f64>() / predictions.len() as f64
        };

        let high_hours = predictions
            .iter()
            .filter(|p| p.irradiance_wm2 > HIGH_IRRADIANCE_WM2)
            .count();
        let mut suggestions = Vec::new();
        if high_hours > 0 {
            suggestions.push(format!(
                "Optimize solar generation during {high_hours} high-irradiance hours"
            ));
        }
        if conditions.impact() == Rating::High {
            suggestions.push("Heavy cloud expected: shift flexible loads to battery".to_string());
        }
        suggestions.push("Monitor panel efficiency during peak hours".to_string());

        Ok(SolarForecast {
            summary: SolarSummary {
                total_daily_generation_kwh: round_to(total, 1),
                peak_generation_hour: peak.map(|p| p.time_label.clone()),
                peak_generation_power_kw: peak.map_or(0.0, |p| p.predicted_power_kw),
                average_confidence: round_to(average_confidence, 3),
                weather_impact: conditions.impact(),
            },
            insights: SolarInsights {
                generation_quality: if total > 15.0 {
                    "Excellent"
                } else if total > 10.0 {
                    "Good"
                } else {
                    "Poor"
                },
                reliability_score: round_to(average_confidence * 100.0, 1),
                optimization_suggestions: suggestions,
            },
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions() -> SolarConditions {
        ForecastEngine::default().default_conditions()
    }

    fn six_am() -> ClockSample {
        ClockSample::utc(2024, 6, 15, 6, 0, 0).unwrap()
    }

    #[test]
    fn reference_factors() {
        let f = ForecastEngine::default()
            .solar(&six_am(), &conditions(), 12)
            .unwrap();
        let p = &f.predictions[0];
        assert_eq!(p.weather_factors.cloud_impact, 0.68);
        assert_eq!(p.weather_factors.temperature_impact, 1.006);
        assert_eq!(p.weather_factors.humidity_impact, 0.935);
        assert_eq!(p.efficiency_pct, 16.9);
        assert_eq!(p.hour, 6);
        assert_eq!(p.predicted_power_kw, 0.0);
        assert_eq!(f.summary.weather_impact, Rating::Medium);
    }

    #[test]
    fn noon_peak_and_summary() {
        let f = ForecastEngine::default()
            .solar(&six_am(), &conditions(), 12)
            .unwrap();
        // 1000 * 0.68 * 1.006 * 0.935 = 639.6 W/m², * 2.0 * 0.18 / 1000
        assert_eq!(f.predictions[6].irradiance_wm2, 640.0);
        assert_eq!(f.predictions[6].predicted_power_kw, 0.23);
        assert_eq!(f.summary.peak_generation_power_kw, 0.23);
        assert_eq!(f.summary.peak_generation_hour.as_deref(), Some("12:00 PM"));
        assert_eq!(f.insights.generation_quality, "Poor");
        assert!(f.summary.total_daily_generation_kwh > 0.0);
    }

    #[test]
    fn confidence_never_increases() {
        let f = ForecastEngine::default()
            .solar(&six_am(), &conditions(), 48)
            .unwrap();
        assert_eq!(f.predictions[0].confidence, 0.87);
        for w in f.predictions.windows(2) {
            assert!(w[1].confidence <= w[0].confidence);
            assert!(w[1].confidence >= 0.0);
        }
    }

    #[test]
    fn repeated_calls_agree() {
        let engine = ForecastEngine::default();
        let a = engine.solar(&six_am(), &conditions(), 12).unwrap();
        let b = engine.solar(&six_am(), &conditions(), 12).unwrap();
        assert_eq!(a.summary.peak_generation_power_kw, b.summary.peak_generation_power_kw);
        assert_eq!(a.summary.total_daily_generation_kwh, b.summary.total_daily_generation_kwh);
        assert_eq!(a, b);
    }

    #[test]
    fn night_horizon_is_flat_zero() {
        let evening = ClockSample::utc(2024, 6, 15, 19, 0, 0).unwrap();
        let f = ForecastEngine::default()
            .solar(&evening, &conditions(), 10)
            .unwrap();
        assert!(f.predictions.iter().all(|p| p.predicted_power_kw == 0.0));
        assert_eq!(f.summary.total_daily_generation_kwh, 0.0);
        // all tied at zero: the first point is the peak
        assert_eq!(f.summary.peak_generation_hour.as_deref(), Some("07:00 PM"));
    }

    #[test]
    fn empty_horizon() {
        let f = ForecastEngine::default()
            .solar(&six_am(), &conditions(), 0)
            .unwrap();
        assert!(f.predictions.is_empty());
        assert_eq!(f.summary.peak_generation_hour, None);
        assert_eq!(f.summary.average_confidence, 0.0);
    }

    #[test]
    fn rejects_out_of_range_conditions() {
        let engine = ForecastEngine::default();
        let bad = SolarConditions {
            cloud_cover_pct: 120.0,
            ..conditions()
        };
        assert!(matches!(
            engine.solar(&six_am(), &bad, 12),
            Err(MicrogridError::InvalidInput { field: "cloud_cover_pct", .. })
        ));
        assert!(engine.solar(&six_am(), &conditions(), 49).is_err());
    }

    #[test]
    fn heavy_cloud_rates_high() {
        let cloudy = SolarConditions {
            cloud_cover_pct: 85.0,
            ..conditions()
        };
        let f = ForecastEngine::default().solar(&six_am(), &cloudy, 12).unwrap();
        assert_eq!(f.summary.weather_impact, Rating::High);
        assert_eq!(f.insights.optimization_suggestions.len(), 2);
    }
}
