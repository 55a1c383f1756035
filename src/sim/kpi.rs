//! Post-hoc summary of a sampled run.

use std::fmt;

use crate::alerts::Severity;
use crate::sim::shedding::SheddingLevel;
use crate::telemetry::TelemetrySnapshot;

/// Aggregate indicators derived from a series of snapshots.
///
/// Computed after the run from the snapshots themselves, so the report
/// always agrees with the exported rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub samples: usize,
    /// Mean total generation (kW).
    pub mean_generation_kw: f64,
    /// Mean total load (kW).
    pub mean_load_kw: f64,
    pub peak_deficit_kw: f64,
    /// Energy imported to cover deficits, deficit × interval (kWh).
    pub deficit_energy_kwh: f64,
    pub min_battery_soc_pct: f64,
    pub low_energy_samples: usize,
    pub shortage_samples: usize,
    pub max_shedding_level: SheddingLevel,
    pub critical_alerts: usize,
    pub warning_alerts: usize,
}

impl RunReport {
    /// Computes the report from the complete snapshot series.
    ///
    /// # Arguments
    ///
    /// * `snapshots` - Sampled snapshots, oldest first
    /// * `interval_hours` - Time between consecutive snapshots in hours
    pub fn from_snapshots(snapshots: &[TelemetrySnapshot], interval_hours: f64) -> Self {
        let mut report = Self {
            samples: snapshots.len(),
            mean_generation_kw: 0.0,
            mean_load_kw: 0.0,
            peak_deficit_kw: 0.0,
            deficit_energy_kwh: 0.0,
            min_battery_soc_pct: 0.0,
            low_energy_samples: 0,
            shortage_samples: 0,
            max_shedding_level: SheddingLevel::Normal,
            critical_alerts: 0,
            warning_alerts: 0,
        };
        if snapshots.is_empty() {
            return report;
        }

        let mut gen_sum = 0.0;
        let mut load_sum = 0.0;
        let mut min_soc = f64::INFINITY;
        for s in snapshots {
            gen_sum += s.total_generation_kw;
            load_sum += s.total_load_kw;
            min_soc = min_soc.min(s.battery_soc_pct);
            report.peak_deficit_kw = report.peak_deficit_kw.max(s.energy_deficit_kw);
            report.deficit_energy_kwh += s.energy_deficit_kw * interval_hours;
            report.low_energy_samples += usize::from(s.is_low_energy);
            report.shortage_samples += usize::from(s.is_energy_shortage);
            report.max_shedding_level = report.max_shedding_level.max(s.load_shedding_level);
            for a in &s.alerts {
                match a.severity {
                    Severity::Critical => report.critical_alerts += 1,
                    Severity::Warning => report.warning_alerts += 1,
                    Severity::Info => {}
                }
            }
        }

        let n = snapshots.len() as f64;
        report.mean_generation_kw = gen_sum / n;
        report.mean_load_kw = load_sum / n;
        report.min_battery_soc_pct = min_soc;
        report
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Report ({} samples) ---", self.samples)?;
        writeln!(f, "Mean generation:     {:.2} kW", self.mean_generation_kw)?;
        writeln!(f, "Mean load:           {:.2} kW", self.mean_load_kw)?;
        writeln!(
            f,
            "Peak deficit:        {:.2} kW ({:.3} kWh uncovered)",
            self.peak_deficit_kw, self.deficit_energy_kwh
        )?;
        writeln!(f, "Minimum battery SoC: {:.1}%", self.min_battery_soc_pct)?;
        writeln!(
            f,
            "Low energy / shortage samples: {} / {}",
            self.low_energy_samples, self.shortage_samples
        )?;
        writeln!(f, "Max shedding level:  {}", self.max_shedding_level)?;
        write!(
            f,
            "Alerts:              {} critical, {} warning",
            self.critical_alerts, self.warning_alerts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::clock::ClockSample;
    use crate::sim::draws::ScriptedDraws;
    use crate::telemetry::TelemetryGenerator;

    fn snapshot(hour: u32) -> TelemetrySnapshot {
        let at = ClockSample::utc(2024, 6, 15, hour, 0, 0).unwrap();
        TelemetryGenerator::default().generate(&at, &mut ScriptedDraws::constant(0.5))
    }

    #[test]
    fn empty_series_is_zeroed() {
        let r = RunReport::from_snapshots(&[], 1.0);
        assert_eq!(r.samples, 0);
        assert_eq!(r.mean_generation_kw, 0.0);
        assert_eq!(r.max_shedding_level, SheddingLevel::Normal);
    }

    #[test]
    fn aggregates_day_and_night() {
        let day = snapshot(12);
        let night = snapshot(0);
        let r = RunReport::from_snapshots(&[day.clone(), night.clone()], 0.5);

        assert_eq!(r.samples, 2);
        let mean_gen = (day.total_generation_kw + night.total_generation_kw) / 2.0;
        assert!((r.mean_generation_kw - mean_gen).abs() < 1e-9);
        assert_eq!(r.peak_deficit_kw, night.energy_deficit_kw);
        assert!((r.deficit_energy_kwh - night.energy_deficit_kw * 0.5).abs() < 1e-9);
        assert_eq!(r.low_energy_samples, usize::from(night.is_low_energy));
        assert_eq!(r.max_shedding_level, night.load_shedding_level);
        assert_eq!(
            r.min_battery_soc_pct,
            day.battery_soc_pct.min(night.battery_soc_pct)
        );
    }

    #[test]
    fn display_has_header() {
        let r = RunReport::from_snapshots(&[snapshot(12)], 1.0);
        let text = r.to_string();
        assert!(text.starts_with("--- Run Report (1 samples) ---"));
        assert!(text.contains("Max shedding level:"));
    }
}
