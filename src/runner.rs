//! Drives a sampled run: clock, generator, and controller in lock step.

use chrono::{Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::MicrogridConfig;
use crate::grid_shift::{GridShiftController, GridShiftState};
use crate::sim::clock::{ClockSample, SampleClock};
use crate::sim::draws::DrawSource;
use crate::sim::kpi::RunReport;
use crate::telemetry::{TelemetryGenerator, TelemetrySnapshot};

/// Snapshots and the controller state observed after each one.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub snapshots: Vec<TelemetrySnapshot>,
    pub grid_states: Vec<GridShiftState>,
    pub report: RunReport,
}

/// Samples `config.simulation.samples` snapshots from `start` at the poll
/// interval and feeds each to a grid-shift controller on the same clock.
///
/// Snapshot draws and controller draws come from separate streams, both
/// seeded from `simulation.seed` when it is set.
pub fn run_samples(config: &MicrogridConfig, start: ClockSample) -> RunOutput {
    match config.simulation.seed {
        Some(seed) => run_with(
            config,
            start,
            &mut StdRng::seed_from_u64(seed),
            GridShiftController::seeded(config.grid_shift.clone(), seed.wrapping_add(1)),
        ),
        None => run_with(
            config,
            start,
            &mut StdRng::from_os_rng(),
            GridShiftController::from_config(config.grid_shift.clone()),
        ),
    }
}

/// [`run_samples`] with explicit draw sources.
pub fn run_with<C: DrawSource>(
    config: &MicrogridConfig,
    start: ClockSample,
    draws: &mut impl DrawSource,
    mut controller: GridShiftController<C>,
) -> RunOutput {
    let generator = TelemetryGenerator::from_config(config);
    let interval_s = i64::from(config.simulation.poll_interval_s);
    let mut clock = SampleClock::new(
        start,
        Duration::seconds(interval_s),
        config.simulation.samples,
    );

    let mut snapshots = Vec::with_capacity(config.simulation.samples);
    let mut grid_states = Vec::with_capacity(config.simulation.samples);
    clock.run(|at| {
        let mut snapshot = generator.generate(&at, &mut *draws);
        let (state, notes) =
            controller.observe_and_drain(&snapshot, at.instant().with_timezone(&Utc));
        snapshot.alerts.extend(notes);
        snapshots.push(snapshot);
        grid_states.push(state);
    });

    let report = RunReport::from_snapshots(&snapshots, interval_s as f64 / 3600.0);
    tracing::debug!(samples = snapshots.len(), "sampled run complete");
    RunOutput {
        snapshots,
        grid_states,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridShiftConfig;
    use crate::grid_shift::SyncStatus;
    use crate::sim::draws::ScriptedDraws;

    fn night() -> ClockSample {
        ClockSample::utc(2024, 6, 15, 1, 0, 0).unwrap()
    }

    #[test]
    fn seeded_runs_repeat() {
        let mut config = MicrogridConfig::default();
        config.simulation.seed = Some(9);
        let a = run_samples(&config, night());
        let b = run_samples(&config, night());
        assert_eq!(a.snapshots, b.snapshots);
        assert_eq!(a.grid_states, b.grid_states);
        assert_eq!(a.snapshots.len(), 12);
    }

    #[test]
    fn night_shortage_reaches_grid() {
        // midpoint draws at 1 AM: TEG only, 0.6 kW against 1.3 kW of load
        let config = MicrogridConfig::default();
        let out = run_with(
            &config,
            night(),
            &mut ScriptedDraws::constant(0.5),
            GridShiftController::new(GridShiftConfig::default(), ScriptedDraws::constant(0.5)),
        );
        assert_eq!(out.grid_states[0].sync_status, SyncStatus::Synchronizing);
        // 5 s poll, 3 s sync delay: connected by the second sample
        assert!(out.grid_states[1].is_connected);
        let connected = out.snapshots[1]
            .alerts
            .iter()
            .filter(|a| a.id == "grid_connected")
            .count();
        assert!(connected >= 1);
        assert_eq!(out.report.samples, 12);
        assert_eq!(out.report.shortage_samples, 12);
        assert_eq!(out.report.peak_deficit_kw, 0.7);
    }
}
