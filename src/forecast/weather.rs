//! Short-range weather projection and its impact on the microgrid.

use serde::Serialize;

use super::{ForecastEngine, Rating, ensure_horizon};
use crate::error::{MicrogridError, ensure_range};
use crate::sim::clock::ClockSample;
use crate::sim::draws::{DrawSource, round_to};

const CLEAR_SKY_IRRADIANCE_WM2: f64 = 1000.0;
const CLOUD_ATTENUATION: f64 = 0.8;
const MIN_HUMIDITY_PCT: f64 = 10.0;
const MIN_PRESSURE_HPA: f64 = 950.0;
const MAX_PRESSURE_HPA: f64 = 1050.0;

/// Conditions the projection drifts away from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherBaseline {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub cloud_cover_pct: f64,
    pub wind_speed_ms: f64,
    pub pressure_hpa: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarImpact {
    pub irradiance_wm2: f64,
    pub overall_impact: Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrogridImpact {
    /// Risk to solar output from cloud.
    pub solar_generation: Rating,
    /// Risk of equipment overheating.
    pub overheating: Rating,
    /// High when either risk is high, otherwise Medium; never Low.
    pub overall_risk: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherPoint {
    pub time_label: String,
    pub hour_offset: u32,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub cloud_cover_pct: f64,
    pub wind_speed_ms: f64,
    #[serde(rename = "pressureHPa")]
    pub pressure_hpa: f64,
    pub solar_impact: SolarImpact,
    pub microgrid_impact: MicrogridImpact,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    pub predictions: Vec<WeatherPoint>,
    pub insights: Vec<String>,
    pub microgrid_recommendations: Vec<String>,
}

impl ForecastEngine {
    /// Projects weather for `horizon_hours` from `baseline`.
    ///
    /// Each step takes five draws, in order: temperature, humidity, cloud
    /// cover, wind, pressure.
    ///
    /// # Errors
    ///
    /// Returns [`MicrogridError::InvalidInput`] if the baseline humidity or
    /// cloud cover is outside `[0, 100]`, a baseline value is not finite, or
    /// the horizon is over 48 hours.
    pub fn weather(
        &self,
        at: &ClockSample,
        baseline: &WeatherBaseline,
        horizon_hours: usize,
        draws: &mut impl DrawSource,
    ) -> Result<WeatherForecast, MicrogridError> {
        let horizon = ensure_horizon(horizon_hours)?;
        validate_baseline(baseline).inspect_err(|e| {
            tracing::warn!(error = %e, "weather baseline rejected");
        })?;

        let predictions: Vec<WeatherPoint> = (0..horizon)
            .map(|h| {
                let offset = h as u32;
                let step = f64::from(offset);

                let temperature_c =
                    round_to(baseline.temperature_c + 5.0 * (step * 0.2).sin() + draws.centered(2.0), 1);
                let humidity_pct = round_to(baseline.humidity_pct + draws.centered(10.0), 1)
                    .clamp(MIN_HUMIDITY_PCT, 100.0);
                let cloud_cover_pct =
                    round_to(baseline.cloud_cover_pct + draws.centered(20.0), 1).clamp(0.0, 100.0);
                let wind_speed_ms = round_to(
                    baseline.wind_speed_ms + 1.5 * (step * 0.25).sin() + draws.centered(2.0),
                    1,
                )
                .max(0.0);
                let pressure_hpa = round_to(
                    baseline.pressure_hpa + 2.0 * (step * 0.1).sin() + draws.centered(2.0),
                    1,
                )
                .clamp(MIN_PRESSURE_HPA, MAX_PRESSURE_HPA);

                let irradiance =
                    CLEAR_SKY_IRRADIANCE_WM2 * (1.0 - cloud_cover_pct / 100.0 * CLOUD_ATTENUATION);
                let solar_risk = graded(cloud_cover_pct, 80.0, 50.0);
                let overheating = graded(temperature_c, 40.0, 35.0);

                WeatherPoint {
                    time_label: at.plus_hours(i64::from(offset)).time_label(),
                    hour_offset: offset,
                    temperature_c,
                    humidity_pct,
                    cloud_cover_pct,
                    wind_speed_ms,
                    pressure_hpa,
                    solar_impact: SolarImpact {
                        irradiance_wm2: round_to(irradiance, 1),
                        overall_impact: graded(irradiance, 800.0, 400.0),
                    },
                    microgrid_impact: MicrogridImpact {
                        solar_generation: solar_risk,
                        overheating,
                        overall_risk: overall_risk(solar_risk, overheating),
                    },
                    description: describe(temperature_c, cloud_cover_pct),
                }
            })
            .collect();

        let insights = insights(&predictions);
        let microgrid_recommendations = recommendations(&predictions);
        Ok(WeatherForecast {
            predictions,
            insights,
            microgrid_recommendations,
        })
    }
}

fn validate_baseline(b: &WeatherBaseline) -> Result<(), MicrogridError> {
    ensure_range("humidity_pct", b.humidity_pct, 0.0, 100.0)?;
    ensure_range("cloud_cover_pct", b.cloud_cover_pct, 0.0, 100.0)?;
    for (field, v) in [
        ("temperature_c", b.temperature_c),
        ("wind_speed_ms", b.wind_speed_ms),
        ("pressure_hpa", b.pressure_hpa),
    ] {
        if !v.is_finite() {
            return Err(MicrogridError::invalid(field, "must be finite"));
        }
    }
    Ok(())
}

fn graded(value: f64, high_above: f64, medium_above: f64) -> Rating {
    if value > high_above {
        Rating::High
    } else if value > medium_above {
        Rating::Medium
    } else {
        Rating::Low
    }
}

fn overall_risk(solar: Rating, overheating: Rating) -> Rating {
    if solar == Rating::High || overheating == Rating::High {
        Rating::High
    } else {
        Rating::Medium
    }
}

fn describe(temperature_c: f64, cloud_cover_pct: f64) -> String {
    let temp = if temperature_c > 35.0 {
        "Hot"
    } else if temperature_c > 25.0 {
        "Warm"
    } else if temperature_c > 15.0 {
        "Mild"
    } else {
        "Cool"
    };
    let sky = if cloud_cover_pct < 20.0 {
        "Clear"
    } else if cloud_cover_pct < 50.0 {
        "Partly Cloudy"
    } else {
        "Mostly Cloudy"
    };
    format!("{temp} and {sky}")
}

fn insights(points: &[WeatherPoint]) -> Vec<String> {
    if points.is_empty() {
        return Vec::new();
    }
    let bright = points
        .iter()
        .filter(|p| p.solar_impact.overall_impact == Rating::High)
        .count();
    let hottest = points
        .iter()
        .map(|p| p.temperature_c)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut out = Vec::new();
    if bright > 0 {
        out.push(format!(
            "Strong solar conditions expected for {bright} of the next {} hours",
            points.len()
        ));
    } else {
        out.push("Reduced solar conditions expected over the horizon".to_string());
    }
    if hottest > 35.0 {
        out.push(format!("Temperatures up to {hottest:.1}°C expected - watch equipment cooling"));
    } else {
        out.push("Temperature within optimal range for equipment operation".to_string());
    }
    out
}

fn recommendations(points: &[WeatherPoint]) -> Vec<String> {
    let mut out = Vec::new();
    if points
        .iter()
        .any(|p| p.solar_impact.overall_impact != Rating::Low)
    {
        out.push("Optimize solar generation during high-irradiance periods".to_string());
    }
    if points
        .iter()
        .any(|p| p.microgrid_impact.solar_generation != Rating::Low)
    {
        out.push("Pre-charge batteries before predicted cloud cover".to_string());
    }
    if points
        .iter()
        .any(|p| p.microgrid_impact.overheating != Rating::Low)
    {
        out.push("Schedule heavy loads away from the hottest hours".to_string());
    }
    out
}
