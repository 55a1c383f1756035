//! Threshold-based operational alerts derived from one telemetry snapshot.
//!
//! Rules run in a fixed order and each may append at most one alert, so the
//! output order is stable for a given snapshot. Nothing is deduplicated
//! across snapshots.

use serde::Serialize;

use crate::config::AlertConfig;
use crate::sim::balance::{LOW_BATTERY_PCT, LOW_ENERGY_KW};
use crate::sim::draws::DrawSource;
use crate::sim::shedding::SheddingLevel;
use crate::telemetry::TelemetrySnapshot;

const CRITICAL_GENERATION_KW: f64 = 0.3;
const CRITICAL_BATTERY_PCT: f64 = 20.0;
const DEFICIT_ALERT_KW: f64 = 0.5;
const DEFICIT_CRITICAL_KW: f64 = 1.0;
const HOT_WATER_WARN_C: f64 = 490.0;
const HOT_WATER_CRITICAL_C: f64 = 500.0;
const EFFICIENCY_WARN_PCT: f64 = 15.0;
const EFFICIENCY_CRITICAL_PCT: f64 = 10.0;
const OPTIMAL_EFFICIENCY_PCT: f64 = 20.0;
const OPTIMAL_GENERATION_KW: f64 = 2.0;
/// The simulated grid notice fires when its draw lands above this.
const GRID_NOTICE_THRESHOLD: f64 = 0.7;

/// Presentation class of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Critical,
    Warning,
    Info,
    Success,
}

/// Operational urgency of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One alert; immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    /// Stable slug of the rule that produced it.
    pub id: &'static str,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub category: &'static str,
    pub message: String,
    /// ISO-8601 instant of the snapshot the alert was derived from.
    pub timestamp: String,
    pub severity: Severity,
}

impl Alert {
    fn new(
        id: &'static str,
        kind: AlertKind,
        category: &'static str,
        message: String,
        timestamp: &str,
        severity: Severity,
    ) -> Self {
        Self {
            id,
            kind,
            category,
            message,
            timestamp: timestamp.to_string(),
            severity,
        }
    }

    /// Notice raised by the grid-shift controller when synchronization completes.
    pub fn grid_connected(timestamp: &str, import_kw: f64) -> Self {
        Self::new(
            "grid_connected",
            AlertKind::Success,
            "Grid Shift",
            format!("Connected to utility grid - importing {import_kw:.2}kW"),
            timestamp,
            Severity::Info,
        )
    }
}

/// The snapshot quantities the rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertInputs {
    pub total_generation_kw: f64,
    pub energy_deficit_kw: f64,
    pub battery_soc_pct: f64,
    pub hot_water_temp_c: f64,
    pub efficiency_pct: f64,
}

impl From<&TelemetrySnapshot> for AlertInputs {
    fn from(s: &TelemetrySnapshot) -> Self {
        Self {
            total_generation_kw: s.total_generation_kw,
            energy_deficit_kw: s.balance().deficit_kw,
            battery_soc_pct: s.battery_soc_pct,
            hot_water_temp_c: s.hot_water_temp_c,
            efficiency_pct: s.efficiency_pct,
        }
    }
}

/// Applies the alert rule sequence.
#[derive(Debug, Clone, Default)]
pub struct AlertClassifier {
    config: AlertConfig,
}

impl AlertClassifier {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    /// Builds the ordered alert list for one snapshot.
    ///
    /// Takes at most one draw, for the simulated grid notice, and only when
    /// generation is low and the notice is enabled.
    pub fn classify(
        &self,
        inputs: &AlertInputs,
        timestamp: &str,
        draws: &mut impl DrawSource,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let generation = inputs.total_generation_kw;
        let deficit = inputs.energy_deficit_kw;
        let soc = inputs.battery_soc_pct;
        let efficiency = inputs.efficiency_pct;
        let is_low_energy = generation < LOW_ENERGY_KW;

        if generation < CRITICAL_GENERATION_KW {
            alerts.push(Alert::new(
                "energy_critical",
                AlertKind::Critical,
                "Grid Shift",
                format!("Critical energy shortage: {generation:.2}kW - Grid connection required"),
                timestamp,
                Severity::Critical,
            ));
        } else if is_low_energy {
            alerts.push(Alert::new(
                "energy_low",
                AlertKind::Warning,
                "Grid Shift",
                format!("Low energy generation: {generation:.2}kW - Prepare for grid shift"),
                timestamp,
                Severity::Warning,
            ));
        }

        if deficit > DEFICIT_ALERT_KW {
            alerts.push(Alert::new(
                "energy_deficit",
                AlertKind::Warning,
                "Load Management",
                format!("Energy deficit: {deficit:.2}kW - Load shedding recommended"),
                timestamp,
                severity_above(deficit, DEFICIT_CRITICAL_KW),
            ));
        }

        // a low battery on top of low generation escalates to a grid-shift alert
        // in place of the plain battery alert
        if soc < LOW_BATTERY_PCT && is_low_energy {
            alerts.push(Alert::new(
                "battery_energy_critical",
                AlertKind::Critical,
                "Grid Shift",
                format!(
                    "Battery low ({soc:.1}%) with minimal generation - Immediate grid connection required"
                ),
                timestamp,
                Severity::Critical,
            ));
        } else if soc < LOW_BATTERY_PCT {
            alerts.push(Alert::new(
                "battery_low",
                AlertKind::Warning,
                "Battery",
                format!("Battery SOC is low: {soc:.1}%"),
                timestamp,
                if soc < CRITICAL_BATTERY_PCT {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
            ));
        }

        if inputs.hot_water_temp_c > HOT_WATER_WARN_C {
            alerts.push(Alert::new(
                "thermal_high",
                AlertKind::Warning,
                "Thermal",
                format!(
                    "Hot water temperature elevated: {:.1}°C",
                    inputs.hot_water_temp_c
                ),
                timestamp,
                severity_above(inputs.hot_water_temp_c, HOT_WATER_CRITICAL_C),
            ));
        }

        if efficiency < EFFICIENCY_WARN_PCT {
            alerts.push(Alert::new(
                "efficiency_low",
                AlertKind::Warning,
                "Performance",
                format!("System efficiency below target: {efficiency:.1}%"),
                timestamp,
                if efficiency < EFFICIENCY_CRITICAL_PCT {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
            ));
        }

        if is_low_energy
            && self.config.simulated_grid_notice
            && draws.above(GRID_NOTICE_THRESHOLD)
        {
            alerts.push(Alert::new(
                "grid_connected",
                AlertKind::Success,
                "Grid Shift",
                "Successfully connected to utility grid - Power supply stabilized".to_string(),
                timestamp,
                Severity::Info,
            ));
        }

        let level = SheddingLevel::for_deficit(deficit);
        if level.is_active() {
            alerts.push(Alert::new(
                "load_shedding_active",
                AlertKind::Warning,
                "Load Management",
                format!("Load shedding Level {level} active - Non-essential loads disconnected"),
                timestamp,
                if level == SheddingLevel::CriticalOnly {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
            ));
        }

        if efficiency > OPTIMAL_EFFICIENCY_PCT && generation > OPTIMAL_GENERATION_KW {
            alerts.push(Alert::new(
                "system_optimal",
                AlertKind::Success,
                "Performance",
                format!(
                    "System operating optimally: {efficiency:.1}% efficiency, {generation:.2}kW generation"
                ),
                timestamp,
                Severity::Info,
            ));
        }

        alerts
    }
}

fn severity_above(value: f64, critical_above: f64) -> Severity {
    if value > critical_above {
        Severity::Critical
    } else {
        Severity::Warning
    }
}
