//! Synthetic telemetry snapshots for one instant of microgrid operation.
//!
//! A [`TelemetryGenerator`] turns a [`ClockSample`] and a [`DrawSource`] into
//! a fully populated [`TelemetrySnapshot`], alerts included. Draws are taken
//! in a fixed order so a scripted source pins every field.

use std::f64::consts::PI;
use std::fmt;

use serde::Serialize;

use crate::alerts::{Alert, AlertClassifier, AlertInputs};
use crate::config::{AlertConfig, GenerationConfig, MicrogridConfig};
use crate::sim::balance::{EnergyBalance, LOW_BATTERY_PCT, LOW_ENERGY_KW};
use crate::sim::clock::ClockSample;
use crate::sim::draws::{DrawSource, round_to};
use crate::sim::patterns::solar_elevation_multiplier;
use crate::sim::shedding::SheddingLevel;

const BASE_LOAD_KW: f64 = 1.2;
const LOAD_SWING_KW: f64 = 0.4;
const CRITICAL_LOAD_SHARE: f64 = 0.6;
const CHARGE_EFFICIENCY: f64 = 0.9;
/// The grid-connect roll succeeds when the draw lands above this.
const GRID_CONNECT_THRESHOLD: f64 = 0.3;
/// The hybrid controller reports a warning when its draw lands above this.
const CONTROLLER_WARNING_THRESHOLD: f64 = 0.9;

/// Hybrid controller state as reported by the power electronics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerStatus {
    Optimal,
    Warning,
}

/// Coarse health grade from generation efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Excellent,
    Good,
    Warning,
}

impl SystemHealth {
    pub fn from_efficiency(efficiency_pct: f64) -> Self {
        if efficiency_pct > 15.0 {
            Self::Excellent
        } else if efficiency_pct > 10.0 {
            Self::Good
        } else {
            Self::Warning
        }
    }
}

/// Whether the microgrid is tracking the utility grid or running islanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GridSyncStatus {
    Synchronized,
    Islanded,
}

impl fmt::Display for GridSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synchronized => write!(f, "synchronized"),
            Self::Islanded => write!(f, "islanded"),
        }
    }
}

/// Local weather at the snapshot instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub temperature_c: f64,
    /// Relative humidity, 0..=100.
    pub humidity_pct: f64,
    /// Cloud cover, 0..=100.
    pub cloud_cover_pct: f64,
    pub wind_speed_ms: f64,
    #[serde(rename = "pressureHPa")]
    pub pressure_hpa: f64,
}

/// Short-range outlook carried on every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickOutlook {
    pub next_hour_load_kw: f64,
    pub solar_forecast_kw: f64,
    /// Hours of runtime at current SOC, zero once SOC is 20 % or less.
    pub battery_runtime_h: u32,
    pub optimization_score: u32,
}

/// One synthetic reading of the whole microgrid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// ISO-8601 instant of generation.
    pub timestamp: String,

    // generation
    pub solar_output_kw: f64,
    pub teg_output_kw: f64,
    pub total_generation_kw: f64,
    pub irradiance_wm2: u32,

    // storage
    pub battery_soc_pct: f64,
    pub battery_voltage_v: f64,
    pub battery_temp_c: f64,
    /// Surplus routed into the battery; zero when there is none.
    pub charging_rate_kw: f64,

    // load
    pub critical_load_kw: f64,
    pub non_critical_load_kw: f64,
    pub total_load_kw: f64,
    /// Unrounded diurnal load the energy balance is taken against.
    #[serde(skip)]
    pub base_load_kw: f64,

    // thermal
    pub hot_water_temp_c: f64,
    pub teg_hot_temp_c: f64,
    pub teg_cold_temp_c: f64,
    pub steam_pressure_bar: f64,

    // turbine and condenser
    pub turbine_rpm: u32,
    pub vibration_mm_s: f64,
    pub condenser_temp_c: f64,
    pub turbine_efficiency_pct: f64,

    // power electronics
    pub inverter_efficiency_pct: f64,
    pub hybrid_controller_status: ControllerStatus,
    pub power_factor: f64,
    pub thd_pct: f64,
    pub dc_voltage_v: u32,
    pub ac_voltage_v: u32,
    pub frequency_hz: f64,

    pub fault_risk_pct: u32,

    // grid tie
    pub grid_connected: bool,
    pub grid_voltage_v: f64,
    pub grid_frequency_hz: f64,
    pub grid_power_import_kw: f64,
    pub grid_power_export_kw: f64,
    pub grid_sync_status: GridSyncStatus,

    // energy status
    pub is_low_energy: bool,
    pub is_energy_shortage: bool,
    pub energy_deficit_kw: f64,
    pub load_shedding_level: SheddingLevel,

    pub weather: WeatherReading,

    pub efficiency_pct: f64,
    pub system_health: SystemHealth,
    pub quick_outlook: QuickOutlook,
    pub alerts: Vec<Alert>,
}

impl TelemetrySnapshot {
    /// The energy-balance view of this snapshot, as the grid-shift
    /// controller consumes it.
    pub fn balance(&self) -> EnergyBalance {
        EnergyBalance::assess(
            self.total_generation_kw,
            self.base_load_kw,
            self.battery_soc_pct,
        )
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | gen={:>5.2} kW (solar={:.2} teg={:.2})  load={:>5.2} kW | \
             SoC={:>5.1}%  deficit={:.2} kW  shed=L{} | eff={:>5.1}% {:?} | \
             grid={} alerts={}",
            self.timestamp,
            self.total_generation_kw,
            self.solar_output_kw,
            self.teg_output_kw,
            self.total_load_kw,
            self.battery_soc_pct,
            self.energy_deficit_kw,
            self.load_shedding_level,
            self.efficiency_pct,
            self.system_health,
            self.grid_sync_status,
            self.alerts.len(),
        )
    }
}

/// Builds snapshots from the generation parameters and alert settings.
///
/// Holds no mutable state; one generator can serve concurrent callers as
/// long as each brings its own draw source.
#[derive(Debug, Clone, Default)]
pub struct TelemetryGenerator {
    generation: GenerationConfig,
    classifier: AlertClassifier,
}

impl TelemetryGenerator {
    pub fn new(generation: GenerationConfig, alerts: AlertConfig) -> Self {
        Self {
            generation,
            classifier: AlertClassifier::new(alerts),
        }
    }

    pub fn from_config(config: &MicrogridConfig) -> Self {
        Self::new(config.generation.clone(), config.alerts.clone())
    }

    /// Snapshot for the current wall-clock instant with thread-local entropy.
    pub fn sample_now(&self) -> TelemetrySnapshot {
        self.generate(&ClockSample::now(), &mut rand::rng())
    }

    /// Produces the snapshot for `clock`.
    ///
    /// Never fails: every stochastic term is clamped into its physical
    /// range before it is stored.
    pub fn generate(&self, clock: &ClockSample, draws: &mut impl DrawSource) -> TelemetrySnapshot {
        let g = &self.generation;
        let hour = clock.hour();
        let hour_angle = f64::from(hour) * PI / 12.0;
        let t = clock.epoch_millis();

        let solar_multiplier = solar_elevation_multiplier(hour);
        let weather_derate = if draws.above(1.0 - g.cloudy_probability) {
            g.cloudy_derate
        } else {
            1.0
        };
        let fault_derate = if draws.above(1.0 - g.fault_probability) {
            g.fault_derate
        } else {
            1.0
        };

        let solar_output_kw = round_to(
            (g.solar_peak_kw * solar_multiplier * weather_derate * fault_derate
                + draws.centered(0.2))
            .max(0.0),
            2,
        );
        let teg_output_kw = round_to((g.teg_base_kw + draws.centered(0.1)).max(0.0), 2);
        let total_generation_kw = round_to(solar_output_kw + teg_output_kw, 2);

        let battery_soc_pct =
            round_to(65.0 + 15.0 * (t / 100_000.0).sin() + draws.centered(5.0), 1)
                .clamp(0.0, 100.0);
        let battery_voltage_v = round_to(48.0 + (battery_soc_pct - 50.0) * 0.1, 2);
        let battery_temp_c = round_to(25.0 + draws.uniform(0.0, 10.0), 2);

        let base_load_kw = BASE_LOAD_KW + LOAD_SWING_KW * hour_angle.sin();
        let critical_load_kw = round_to(base_load_kw * CRITICAL_LOAD_SHARE, 2);
        let non_critical_load_kw = round_to(base_load_kw * (1.0 - CRITICAL_LOAD_SHARE), 2);
        let total_load_kw = round_to(critical_load_kw + non_critical_load_kw, 2);

        let hot_water_temp_c = round_to(475.0 + draws.centered(25.0), 2);
        let teg_hot_temp_c = round_to(520.0 + draws.centered(30.0), 2);
        let teg_cold_temp_c = round_to(25.0 + draws.uniform(0.0, 5.0), 2);
        let steam_pressure_bar = round_to(2.5 + draws.uniform(0.0, 0.5), 2);

        let weather = WeatherReading {
            temperature_c: round_to(25.0 + 8.0 * hour_angle.sin() + draws.centered(3.0), 2),
            humidity_pct: round_to(60.0 + draws.centered(20.0), 1).clamp(0.0, 100.0),
            cloud_cover_pct: round_to(30.0 + draws.centered(40.0), 1).clamp(0.0, 100.0),
            wind_speed_ms: round_to(5.0 + draws.uniform(0.0, 5.0), 1),
            pressure_hpa: round_to(1013.0 + draws.centered(10.0), 1),
        };

        let turbine_rpm = whole(1800.0 + 100.0 * (t / 10_000.0).sin() + draws.uniform(0.0, 50.0));
        let vibration_mm_s =
            round_to(2.0 + 0.5 * (t / 15_000.0).sin() + draws.uniform(0.0, 0.3), 2);
        let condenser_temp_c = round_to(32.0 + draws.uniform(0.0, 8.0), 2);
        let turbine_efficiency_pct =
            round_to(85.0 + 5.0 * (t / 20_000.0).sin() + draws.uniform(0.0, 3.0), 1);

        let inverter_efficiency_pct = round_to(95.0 + draws.uniform(0.0, 3.0), 1);
        let hybrid_controller_status = if draws.above(CONTROLLER_WARNING_THRESHOLD) {
            ControllerStatus::Warning
        } else {
            ControllerStatus::Optimal
        };
        let power_factor = round_to(0.95 + draws.uniform(0.0, 0.05), 3);
        let thd_pct = round_to(1.5 + draws.uniform(0.0, 1.0), 1);
        let dc_voltage_v = whole(380.0 + draws.uniform(0.0, 20.0));
        let ac_voltage_v = whole(230.0 + draws.uniform(0.0, 10.0));
        let frequency_hz = round_to(50.0 + draws.centered(0.1), 2);

        let fault_risk_pct = whole(5.0 + draws.uniform(0.0, 20.0));

        let balance = EnergyBalance::assess(total_generation_kw, base_load_kw, battery_soc_pct);
        let grid_connected =
            if total_generation_kw < LOW_ENERGY_KW || battery_soc_pct < LOW_BATTERY_PCT {
                draws.above(GRID_CONNECT_THRESHOLD)
            } else {
                false
            };
        let grid_voltage_v = round_to(230.0 + draws.centered(20.0), 2);
        let grid_frequency_hz = round_to(50.0 + draws.centered(0.5), 2);

        let charging_rate_kw = round_to(balance.surplus_kw * CHARGE_EFFICIENCY, 2);
        let efficiency_pct = round_to(total_generation_kw / g.rated_capacity_kw * 100.0, 1);

        let quick_outlook = QuickOutlook {
            next_hour_load_kw: round_to(base_load_kw * 1.1, 2),
            solar_forecast_kw: if hour < 18 {
                round_to(solar_output_kw * 1.2, 2)
            } else {
                0.0
            },
            battery_runtime_h: if battery_soc_pct > 20.0 {
                whole(battery_soc_pct / 10.0)
            } else {
                0
            },
            optimization_score: whole(efficiency_pct * 0.8 + 20.0),
        };

        let mut snapshot = TelemetrySnapshot {
            timestamp: clock.timestamp_iso(),
            solar_output_kw,
            teg_output_kw,
            total_generation_kw,
            irradiance_wm2: whole(solar_output_kw * 400.0 + 50.0),
            battery_soc_pct,
            battery_voltage_v,
            battery_temp_c,
            charging_rate_kw,
            critical_load_kw,
            non_critical_load_kw,
            total_load_kw,
            base_load_kw,
            hot_water_temp_c,
            teg_hot_temp_c,
            teg_cold_temp_c,
            steam_pressure_bar,
            turbine_rpm,
            vibration_mm_s,
            condenser_temp_c,
            turbine_efficiency_pct,
            inverter_efficiency_pct,
            hybrid_controller_status,
            power_factor,
            thd_pct,
            dc_voltage_v,
            ac_voltage_v,
            frequency_hz,
            fault_risk_pct,
            grid_connected,
            grid_voltage_v,
            grid_frequency_hz,
            grid_power_import_kw: round_to(balance.deficit_kw, 2),
            grid_power_export_kw: round_to(balance.surplus_kw, 2),
            grid_sync_status: if balance.is_low_energy {
                GridSyncStatus::Synchronized
            } else {
                GridSyncStatus::Islanded
            },
            is_low_energy: balance.is_low_energy,
            is_energy_shortage: balance.is_energy_shortage,
            energy_deficit_kw: round_to(balance.deficit_kw, 2),
            load_shedding_level: balance.shedding_level,
            weather,
            efficiency_pct,
            system_health: SystemHealth::from_efficiency(efficiency_pct),
            quick_outlook,
            alerts: Vec::new(),
        };

        snapshot.alerts =
            self.classifier
                .classify(&AlertInputs::from(&snapshot), &snapshot.timestamp, draws);
        snapshot
    }
}

/// Rounds a non-negative physical quantity to a whole number.
fn whole(value: f64) -> u32 {
    // every caller passes a bounded, non-negative value
    value.round().max(0.0) as u32
}
