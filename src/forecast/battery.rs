//! Hour-by-hour battery SOC projection against a nominal load and solar profile.

use std::f64::consts::PI;

use serde::Serialize;

use super::{ForecastEngine, Rating, ensure_horizon};
use crate::error::{MicrogridError, ensure_range};
use crate::sim::clock::ClockSample;
use crate::sim::draws::round_to;

const CRITICAL_SOC_PCT: f64 = 20.0;
const WARNING_SOC_PCT: f64 = 40.0;
const FULL_SOC_PCT: f64 = 90.0;
const LOW_SOC_PCT: f64 = 30.0;
/// SOC swing, in percentage points, counted as one full cycle.
const CYCLE_SWING_PCT: f64 = 200.0;
const DEGRADATION_PER_PCT: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryAction {
    Charging,
    Discharging,
}

/// Operator guidance for one projected step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryAdvice {
    Critical,
    Warning,
    Optimal,
    Normal,
}

impl BatteryAdvice {
    fn for_step(soc_pct: f64, action: BatteryAction) -> Self {
        if soc_pct < CRITICAL_SOC_PCT {
            Self::Critical
        } else if soc_pct < WARNING_SOC_PCT {
            Self::Warning
        } else if soc_pct > FULL_SOC_PCT && action == BatteryAction::Charging {
            Self::Optimal
        } else {
            Self::Normal
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL: Low SOC - reduce load immediately",
            Self::Warning => "WARNING: Monitor SOC closely - prepare load shedding",
            Self::Optimal => "OPTIMAL: High SOC - consider running optional loads",
            Self::Normal => "NORMAL: Battery operating within optimal range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryPoint {
    pub time_label: String,
    pub hour_offset: u32,
    /// SOC at the end of the step, clamped to `[0, 100]`.
    pub soc_pct: f64,
    /// Signed nominal SOC change of the step, before clamping.
    pub soc_change_pct: f64,
    pub action: BatteryAction,
    /// Generation minus load for the step (kW).
    pub power_flow_kw: f64,
    pub efficiency_pct: f64,
    pub health_impact: f64,
    pub advice: BatteryAdvice,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryAnalysis {
    pub minimum_soc_pct: f64,
    pub maximum_soc_pct: f64,
    pub soc_range_pct: f64,
    pub final_soc_pct: f64,
    pub estimated_cycles: f64,
    pub battery_utilization: f64,
    pub health_degradation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryInsights {
    pub performance_grade: &'static str,
    pub optimization_opportunities: Vec<String>,
    pub risk_assessment: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryForecast {
    pub predictions: Vec<BatteryPoint>,
    pub analysis: BatteryAnalysis,
    pub insights: BatteryInsights,
}

impl ForecastEngine {
    /// Projects SOC for `horizon_hours` steps from `start_soc_pct`.
    ///
    /// Step `h` sees load `1.2 + 0.3·sin(0.3h)` kW and generation
    /// `max(0, 2·sin((h + 6)·π/12))` kW. A surplus charges at up to the
    /// configured rate times efficiency; a shortfall discharges at up to
    /// the rate divided by efficiency.
    ///
    /// # Errors
    ///
    /// Returns [`MicrogridError::InvalidInput`] if `start_soc_pct` is not a
    /// finite value in `[0, 100]` or the horizon is over 48 hours.
    pub fn battery(
        &self,
        at: &ClockSample,
        start_soc_pct: f64,
        horizon_hours: usize,
    ) -> Result<BatteryForecast, MicrogridError> {
        let horizon = ensure_horizon(horizon_hours)?;
        let start = ensure_range("start_soc_pct", start_soc_pct, 0.0, 100.0).inspect_err(|e| {
            tracing::warn!(error = %e, "battery forecast start rejected");
        })?;

        let cfg = &self.config;
        let mut soc = start;
        let mut predictions = Vec::with_capacity(horizon);

        for h in 0..horizon {
            let offset = h as u32;
            let step = f64::from(offset);
            let load = 1.2 + 0.3 * (step * 0.3).sin();
            let generation = (2.0 * ((step + 6.0) * PI / 12.0).sin()).max(0.0);
            let net = generation - load;

            let (action, soc_change) = if net > 0.0 {
                let energy = net.min(cfg.battery_max_rate_kw) * cfg.battery_efficiency;
                (BatteryAction::Charging, energy / cfg.battery_capacity_kwh * 100.0)
            } else {
                let energy = net.abs().min(cfg.battery_max_rate_kw) / cfg.battery_efficiency;
                (BatteryAction::Discharging, -energy / cfg.battery_capacity_kwh * 100.0)
            };
            soc = (soc + soc_change).clamp(0.0, 100.0);

            let advice = BatteryAdvice::for_step(soc, action);
            predictions.push(BatteryPoint {
                time_label: at.plus_hours(i64::from(offset)).time_label(),
                hour_offset: offset,
                soc_pct: round_to(soc, 1),
                soc_change_pct: round_to(soc_change, 2),
                action,
                power_flow_kw: round_to(net, 2),
                efficiency_pct: round_to(cfg.battery_efficiency * 100.0, 1),
                health_impact: soc_change.abs() / 100.0 * DEGRADATION_PER_PCT,
                advice,
                recommendation: advice.message(),
            });
        }

        let analysis = analyse(start, &predictions);
        let insights = BatteryInsights {
            performance_grade: grade(analysis.minimum_soc_pct, analysis.estimated_cycles),
            optimization_opportunities: opportunities(&predictions),
            risk_assessment: if analysis.minimum_soc_pct < CRITICAL_SOC_PCT {
                Rating::High
            } else if analysis.minimum_soc_pct < WARNING_SOC_PCT {
                Rating::Medium
            } else {
                Rating::Low
            },
        };

        Ok(BatteryForecast {
            predictions,
            analysis,
            insights,
        })
    }
}

fn analyse(start_soc: f64, points: &[BatteryPoint]) -> BatteryAnalysis {
    let (min, max) = if points.is_empty() {
        (start_soc, start_soc)
    } else {
        points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.soc_pct), hi.max(p.soc_pct))
        })
    };
    let swing: f64 = points.iter().map(|p| p.soc_change_pct.abs()).sum();
    let degradation: f64 = points.iter().map(|p| p.health_impact).sum();

    BatteryAnalysis {
        minimum_soc_pct: round_to(min, 1),
        maximum_soc_pct: round_to(max, 1),
        soc_range_pct: round_to(max - min, 1),
        final_soc_pct: points.last().map_or(round_to(start_soc, 1), |p| p.soc_pct),
        estimated_cycles: round_to(swing / CYCLE_SWING_PCT, 3),
        battery_utilization: round_to((max - min) / 100.0, 3),
        health_degradation: round_to(degradation, 6),
    }
}

fn grade(min_soc: f64, cycles: f64) -> &'static str {
    if min_soc >= 40.0 && cycles < 0.5 {
        "A+ Excellent"
    } else if min_soc >= 30.0 && cycles < 1.0 {
        "B+ Good"
    } else if min_soc >= 20.0 {
        "C+ Fair"
    } else {
        "D- Poor"
    }
}

fn opportunities(points: &[BatteryPoint]) -> Vec<String> {
    let mut out = Vec::new();
    let charging = points
        .iter()
        .filter(|p| p.action == BatteryAction::Charging)
        .count();
    if charging > points.len() - charging {
        out.push("Excess charging capacity - consider load shifting".to_string());
    }
    if points.iter().any(|p| p.soc_pct < LOW_SOC_PCT) {
        out.push("Low SOC periods detected - optimize charging schedule".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> ClockSample {
        ClockSample::utc(2024, 6, 15, 6, 0, 0).unwrap()
    }

    #[test]
    fn zero_horizon_keeps_start_soc() {
        let f = ForecastEngine::default().battery(&at(), 75.0, 0).unwrap();
        assert!(f.predictions.is_empty());
        assert_eq!(f.analysis.final_soc_pct, 75.0);
        assert_eq!(f.analysis.minimum_soc_pct, 75.0);
        assert_eq!(f.analysis.maximum_soc_pct, 75.0);
        assert_eq!(f.analysis.estimated_cycles, 0.0);
        assert_eq!(f.insights.performance_grade, "A+ Excellent");
        assert_eq!(f.insights.risk_assessment, Rating::Low);
    }

    #[test]
    fn first_step_charges() {
        // h = 0: generation 2·sin(π/2) = 2.0, load 1.2, net 0.8
        let f = ForecastEngine::default().battery(&at(), 75.0, 1).unwrap();
        let p = &f.predictions[0];
        assert_eq!(p.action, BatteryAction::Charging);
        assert_eq!(p.power_flow_kw, 0.8);
        // 0.8 · 0.95 / 10 · 100
        assert_eq!(p.soc_change_pct, 7.6);
        assert_eq!(p.soc_pct, 82.6);
        assert_eq!(p.advice, BatteryAdvice::Normal);
        assert_eq!(p.efficiency_pct, 95.0);
        assert_eq!(p.time_label, "06:00 AM");
    }

    #[test]
    fn full_battery_saturates_and_reports_optimal() {
        let f = ForecastEngine::default().battery(&at(), 99.0, 1).unwrap();
        assert_eq!(f.predictions[0].soc_pct, 100.0);
        assert_eq!(f.predictions[0].advice, BatteryAdvice::Optimal);
    }

    #[test]
    fn evening_steps_discharge_toward_warning() {
        let f = ForecastEngine::default().battery(&at(), 35.0, 12).unwrap();
        // generation is zero from h = 12 on, so late steps of a 12-hour run
        // already lean on the battery
        let last = f.predictions.last().unwrap();
        assert_eq!(last.action, BatteryAction::Discharging);
        assert!(last.soc_change_pct < 0.0);
        assert!(f.predictions.iter().all(|p| (0.0..=100.0).contains(&p.soc_pct)));
        assert!(f.analysis.minimum_soc_pct <= f.analysis.maximum_soc_pct);
        assert_eq!(
            f.analysis.final_soc_pct,
            last.soc_pct
        );
    }

    #[test]
    fn long_discharge_hits_floor() {
        let f = ForecastEngine::default().battery(&at(), 5.0, 48).unwrap();
        assert!(f.predictions.iter().any(|p| p.soc_pct == 0.0));
        assert_eq!(f.analysis.minimum_soc_pct, 0.0);
        assert_eq!(f.insights.risk_assessment, Rating::High);
        assert_eq!(f.insights.performance_grade, "D- Poor");
        assert!(
            f.insights
                .optimization_opportunities
                .iter()
                .any(|o| o.contains("Low SOC"))
        );
    }

    #[test]
    fn grades() {
        assert_eq!(grade(45.0, 0.4), "A+ Excellent");
        assert_eq!(grade(45.0, 0.6), "B+ Good");
        assert_eq!(grade(35.0, 1.2), "C+ Fair");
        assert_eq!(grade(19.9, 0.1), "D- Poor");
    }

    #[test]
    fn rejects_bad_start() {
        let engine = ForecastEngine::default();
        assert!(matches!(
            engine.battery(&at(), 120.0, 12),
            Err(MicrogridError::InvalidInput { field: "start_soc_pct", .. })
        ));
        assert!(engine.battery(&at(), f64::NAN, 12).is_err());
        assert!(engine.battery(&at(), 50.0, 60).is_err());
    }
}
