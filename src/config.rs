//! TOML-based microgrid configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest forecast horizon accepted anywhere (hours).
pub const MAX_HORIZON_HOURS: usize = 48;

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults that reproduce the reference dashboard. Load
/// from TOML with [`MicrogridConfig::from_toml_file`] or use
/// [`MicrogridConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MicrogridConfig {
    /// Sampling cadence and seeding.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Telemetry generator parameters.
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Forecast engine parameters.
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Grid-shift controller parameters.
    #[serde(default)]
    pub grid_shift: GridShiftConfig,
    /// Alert classifier switches.
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// Sampling cadence and seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Random seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Number of snapshots produced by a CLI run (must be > 0).
    pub samples: usize,
    /// Seconds between consecutive snapshots (must be > 0).
    pub poll_interval_s: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            samples: 12,
            poll_interval_s: 5,
        }
    }
}

/// Telemetry generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Nameplate capacity used for the efficiency ratio (kW).
    pub rated_capacity_kw: f64,
    /// Solar output at noon under clear sky (kW).
    pub solar_peak_kw: f64,
    /// Thermoelectric baseline output (kW).
    pub teg_base_kw: f64,
    /// Probability of a cloudy derate on a sample (0.0–1.0).
    pub cloudy_probability: f64,
    /// Multiplier applied to solar output when cloudy.
    pub cloudy_derate: f64,
    /// Probability of an equipment-fault derate on a sample (0.0–1.0).
    pub fault_probability: f64,
    /// Multiplier applied to solar output under a fault.
    pub fault_derate: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            rated_capacity_kw: 3.0,
            solar_peak_kw: 2.5,
            teg_base_kw: 0.6,
            cloudy_probability: 0.2,
            cloudy_derate: 0.3,
            fault_probability: 0.05,
            fault_derate: 0.1,
        }
    }
}

/// Forecast engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Points per horizon series (hours, <= 48).
    pub horizon_hours: usize,
    /// Base household load for the load forecast (W).
    pub base_load_w: f64,
    /// Ambient temperature assumed by load and solar forecasts (°C).
    pub ambient_temp_c: f64,
    /// Cloud cover assumed by the solar forecast (%).
    pub cloud_cover_pct: f64,
    /// Relative humidity assumed by the solar forecast (%).
    pub humidity_pct: f64,
    /// Panel array rating (kW).
    pub panel_rated_kw: f64,
    /// Panel conversion efficiency (0.0–1.0).
    pub panel_efficiency: f64,
    /// Battery SOC the battery forecast starts from (%).
    pub battery_start_soc_pct: f64,
    /// Battery capacity (kWh).
    pub battery_capacity_kwh: f64,
    /// Charge and discharge power limit (kW).
    pub battery_max_rate_kw: f64,
    /// Conversion efficiency applied on charge and discharge (0.0–1.0).
    pub battery_efficiency: f64,
    /// Baseline wind speed for the weather forecast (m/s).
    pub wind_speed_ms: f64,
    /// Baseline pressure for the weather forecast (hPa).
    pub pressure_hpa: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_hours: 12,
            base_load_w: 1200.0,
            ambient_temp_c: 28.0,
            cloud_cover_pct: 40.0,
            humidity_pct: 65.0,
            panel_rated_kw: 2.0,
            panel_efficiency: 0.18,
            battery_start_soc_pct: 75.0,
            battery_capacity_kwh: 10.0,
            battery_max_rate_kw: 2.0,
            battery_efficiency: 0.95,
            wind_speed_ms: 7.0,
            pressure_hpa: 1015.0,
        }
    }
}

/// Grid-shift controller parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridShiftConfig {
    /// Whether automatic grid shifting starts enabled.
    pub auto_shift_enabled: bool,
    /// Synchronizing → Connected delay (milliseconds).
    pub sync_delay_ms: u64,
    /// Delay between single-level shedding restorations (milliseconds).
    pub restore_delay_ms: u64,
}

impl Default for GridShiftConfig {
    fn default() -> Self {
        Self {
            auto_shift_enabled: true,
            sync_delay_ms: 3_000,
            restore_delay_ms: 5_000,
        }
    }
}

/// Alert classifier switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    /// Emit the randomly rolled "connected to utility grid" notice on low generation.
    pub simulated_grid_notice: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            simulated_grid_notice: true,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, Error)]
#[error("config error: {field} - {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"forecast.horizon_hours"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl MicrogridConfig {
    /// Returns the reference configuration.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the cloudy-day preset: frequent derates and heavier cloud in forecasts.
    pub fn cloudy_day() -> Self {
        Self {
            generation: GenerationConfig {
                cloudy_probability: 0.7,
                cloudy_derate: 0.25,
                ..GenerationConfig::default()
            },
            forecast: ForecastConfig {
                ambient_temp_c: 21.0,
                cloud_cover_pct: 85.0,
                humidity_pct: 80.0,
                battery_start_soc_pct: 45.0,
                ..ForecastConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the fault-prone preset: frequent equipment faults and a weaker TEG.
    pub fn fault_prone() -> Self {
        Self {
            generation: GenerationConfig {
                teg_base_kw: 0.4,
                fault_probability: 0.4,
                ..GenerationConfig::default()
            },
            forecast: ForecastConfig {
                battery_start_soc_pct: 30.0,
                ..ForecastConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "cloudy_day", "fault_prone"];

    /// Loads a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "cloudy_day" => Ok(Self::cloudy_day()),
            "fault_prone" => Ok(Self::fault_prone()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns every violation found.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if s.samples == 0 {
            errors.push(ConfigError::new("simulation.samples", "must be > 0"));
        }
        if s.poll_interval_s == 0 {
            errors.push(ConfigError::new("simulation.poll_interval_s", "must be > 0"));
        }

        let g = &self.generation;
        positive(&mut errors, "generation.rated_capacity_kw", g.rated_capacity_kw);
        non_negative(&mut errors, "generation.solar_peak_kw", g.solar_peak_kw);
        non_negative(&mut errors, "generation.teg_base_kw", g.teg_base_kw);
        fraction(&mut errors, "generation.cloudy_probability", g.cloudy_probability);
        fraction(&mut errors, "generation.cloudy_derate", g.cloudy_derate);
        fraction(&mut errors, "generation.fault_probability", g.fault_probability);
        fraction(&mut errors, "generation.fault_derate", g.fault_derate);

        let f = &self.forecast;
        if f.horizon_hours > MAX_HORIZON_HOURS {
            errors.push(ConfigError::new(
                "forecast.horizon_hours",
                format!("must be <= {MAX_HORIZON_HOURS}"),
            ));
        }
        positive(&mut errors, "forecast.base_load_w", f.base_load_w);
        percent(&mut errors, "forecast.cloud_cover_pct", f.cloud_cover_pct);
        percent(&mut errors, "forecast.humidity_pct", f.humidity_pct);
        percent(&mut errors, "forecast.battery_start_soc_pct", f.battery_start_soc_pct);
        positive(&mut errors, "forecast.panel_rated_kw", f.panel_rated_kw);
        fraction(&mut errors, "forecast.panel_efficiency", f.panel_efficiency);
        positive(&mut errors, "forecast.battery_capacity_kwh", f.battery_capacity_kwh);
        non_negative(&mut errors, "forecast.battery_max_rate_kw", f.battery_max_rate_kw);
        if !(f.battery_efficiency > 0.0 && f.battery_efficiency <= 1.0) {
            errors.push(ConfigError::new(
                "forecast.battery_efficiency",
                "must be in (0.0, 1.0]",
            ));
        }
        non_negative(&mut errors, "forecast.wind_speed_ms", f.wind_speed_ms);
        positive(&mut errors, "forecast.pressure_hpa", f.pressure_hpa);
        if !f.ambient_temp_c.is_finite() {
            errors.push(ConfigError::new("forecast.ambient_temp_c", "must be finite"));
        }

        errors
    }
}

fn positive(errors: &mut Vec<ConfigError>, field: &str, v: f64) {
    if !(v.is_finite() && v > 0.0) {
        errors.push(ConfigError::new(field, "must be > 0"));
    }
}

fn non_negative(errors: &mut Vec<ConfigError>, field: &str, v: f64) {
    if !(v.is_finite() && v >= 0.0) {
        errors.push(ConfigError::new(field, "must be >= 0"));
    }
}

fn fraction(errors: &mut Vec<ConfigError>, field: &str, v: f64) {
    if !(0.0..=1.0).contains(&v) {
        errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
    }
}

fn percent(errors: &mut Vec<ConfigError>, field: &str, v: f64) {
    if !(0.0..=100.0).contains(&v) {
        errors.push(ConfigError::new(field, "must be in [0, 100]"));
    }
}
