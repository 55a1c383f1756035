//! Forward-looking series for load, solar, battery, and weather.
//!
//! Forecasts are independent of the telemetry generator and of each other.
//! Each call builds its series from the reference instant alone; battery
//! state is carried only within one call.

mod battery;
mod load;
mod solar;
mod weather;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use battery::{
    BatteryAction, BatteryAdvice, BatteryAnalysis, BatteryForecast, BatteryInsights, BatteryPoint,
};
pub use load::{LoadFactors, LoadForecast};
pub use solar::{
    SolarConditions, SolarForecast, SolarInsights, SolarPoint, SolarSummary, WeatherFactors,
};
pub use weather::{
    MicrogridImpact, SolarImpact, WeatherBaseline, WeatherForecast, WeatherPoint,
};

use crate::config::{ForecastConfig, MAX_HORIZON_HOURS};
use crate::error::MicrogridError;
use crate::sim::clock::ClockSample;
use crate::sim::draws::DrawSource;

/// Three-step qualitative rating used across forecast summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Rating {
    Low,
    Medium,
    High,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

/// Which forecasts a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastKind {
    Load,
    Solar,
    Battery,
    Weather,
    #[default]
    All,
}

impl ForecastKind {
    fn includes(self, other: ForecastKind) -> bool {
        self == ForecastKind::All || self == other
    }
}

impl FromStr for ForecastKind {
    type Err = MicrogridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load" => Ok(Self::Load),
            "solar" => Ok(Self::Solar),
            "battery" => Ok(Self::Battery),
            "weather" => Ok(Self::Weather),
            "all" => Ok(Self::All),
            other => Err(MicrogridError::UnknownForecastKind(other.to_string())),
        }
    }
}

impl fmt::Display for ForecastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Load => "load",
            Self::Solar => "solar",
            Self::Battery => "battery",
            Self::Weather => "weather",
            Self::All => "all",
        };
        f.write_str(s)
    }
}

/// Result of a forecast query; sections not asked for are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_predictions: Option<LoadForecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solar_predictions: Option<SolarForecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_predictions: Option<BatteryForecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_predictions: Option<WeatherForecast>,
}

/// Builds forecasts from a fixed set of assumptions.
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Solar assumptions taken from the configuration.
    pub fn default_conditions(&self) -> SolarConditions {
        SolarConditions {
            cloud_cover_pct: self.config.cloud_cover_pct,
            ambient_temp_c: self.config.ambient_temp_c,
            humidity_pct: self.config.humidity_pct,
        }
    }

    /// Weather baseline taken from the configuration.
    pub fn default_baseline(&self) -> WeatherBaseline {
        WeatherBaseline {
            temperature_c: self.config.ambient_temp_c,
            humidity_pct: self.config.humidity_pct,
            cloud_cover_pct: self.config.cloud_cover_pct,
            wind_speed_ms: self.config.wind_speed_ms,
            pressure_hpa: self.config.pressure_hpa,
        }
    }

    /// Runs the forecasts selected by `kind` with the configured assumptions.
    ///
    /// # Errors
    ///
    /// Returns [`MicrogridError::InvalidInput`] if a configured assumption is
    /// out of range (horizon, starting SOC, cloud cover, or humidity).
    pub fn query(
        &self,
        kind: ForecastKind,
        at: &ClockSample,
        draws: &mut impl DrawSource,
    ) -> Result<ForecastBundle, MicrogridError> {
        let horizon = self.config.horizon_hours;
        let mut bundle = ForecastBundle::default();

        if kind.includes(ForecastKind::Load) {
            bundle.load_predictions = Some(self.load(at));
        }
        if kind.includes(ForecastKind::Solar) {
            bundle.solar_predictions = Some(self.solar(at, &self.default_conditions(), horizon)?);
        }
        if kind.includes(ForecastKind::Battery) {
            bundle.battery_predictions =
                Some(self.battery(at, self.config.battery_start_soc_pct, horizon)?);
        }
        if kind.includes(ForecastKind::Weather) {
            bundle.weather_predictions =
                Some(self.weather(at, &self.default_baseline(), horizon, draws)?);
        }

        tracing::debug!(%kind, horizon, "forecast query served");
        Ok(bundle)
    }

    /// Parses `kind` and runs [`ForecastEngine::query`].
    ///
    /// # Errors
    ///
    /// Returns [`MicrogridError::UnknownForecastKind`] for an unrecognized
    /// selector, or any error from [`ForecastEngine::query`].
    pub fn query_str(
        &self,
        kind: &str,
        at: &ClockSample,
        draws: &mut impl DrawSource,
    ) -> Result<ForecastBundle, MicrogridError> {
        let kind = kind.parse::<ForecastKind>().inspect_err(|e| {
            tracing::warn!(error = %e, "rejected forecast query");
        })?;
        self.query(kind, at, draws)
    }
}

pub(crate) fn ensure_horizon(horizon_hours: usize) -> Result<usize, MicrogridError> {
    if horizon_hours > MAX_HORIZON_HOURS {
        tracing::warn!(horizon_hours, "forecast horizon rejected");
        return Err(MicrogridError::invalid(
            "horizon_hours",
            format!("must be <= {MAX_HORIZON_HOURS}, got {horizon_hours}"),
        ));
    }
    Ok(horizon_hours)
}
