//! Grid-shift and load-shedding controller.
//!
//! The only stateful component. Grid connection runs
//! `Disconnected -> Synchronizing -> Connected`; shedding moves independently
//! between levels 0 and 3, jumping up at once and stepping down one level per
//! restore delay. Deferred transitions live in [`timers::Timers`] and fire
//! from [`GridShiftController::advance`], so the caller owns the clock.

mod state;
pub mod timers;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

pub use state::{GridShiftState, ShiftingStatus, SyncStatus};
use timers::{Timers, Transition, after};

use crate::alerts::Alert;
use crate::config::GridShiftConfig;
use crate::error::MicrogridError;
use crate::sim::balance::EnergyBalance;
use crate::sim::draws::{DrawSource, round_to};
use crate::sim::shedding::SheddingLevel;
use crate::telemetry::TelemetrySnapshot;

/// Owns [`GridShiftState`] and mutates it only through its transitions.
///
/// `D` supplies the voltage and frequency readings taken when
/// synchronization completes.
#[derive(Debug)]
pub struct GridShiftController<D: DrawSource = StdRng> {
    config: GridShiftConfig,
    state: GridShiftState,
    timers: Timers,
    latest: Option<EnergyBalance>,
    notifications: Vec<Alert>,
    draws: D,
}

impl GridShiftController<StdRng> {
    /// Controller seeded from OS entropy.
    pub fn from_config(config: GridShiftConfig) -> Self {
        Self::new(config, StdRng::from_os_rng())
    }

    pub fn seeded(config: GridShiftConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<D: DrawSource> GridShiftController<D> {
    /// Starts islanded at shedding level 0.
    pub fn new(config: GridShiftConfig, draws: D) -> Self {
        Self {
            state: GridShiftState::islanded(config.auto_shift_enabled),
            config,
            timers: Timers::default(),
            latest: None,
            notifications: Vec::new(),
            draws,
        }
    }

    pub fn state(&self) -> &GridShiftState {
        &self.state
    }

    /// Most recent reading passed to [`GridShiftController::evaluate`].
    pub fn latest(&self) -> Option<&EnergyBalance> {
        self.latest.as_ref()
    }

    /// When the next deferred transition is due, if any.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timers.next_due()
    }

    /// Feeds one reading taken at `now`.
    ///
    /// Fires any transitions already due, then starts synchronizing if the
    /// reading needs the grid and auto-shift is on, raises shedding at once
    /// if the reading calls for a higher level, or schedules a one-step
    /// restoration if it calls for a lower one.
    pub fn evaluate(&mut self, reading: EnergyBalance, now: DateTime<Utc>) -> GridShiftState {
        let reading = sanitize(reading);
        self.latest = Some(reading);
        self.fire_due(now);

        if self.state.auto_shift_enabled
            && reading.needs_grid()
            && !self.state.is_connected
            && self.state.sync_status != SyncStatus::Synchronizing
        {
            self.begin_sync(now);
        }

        let current = self.state.shedding_level;
        let target = reading.shedding_level;
        if target > current {
            self.timers.cancel(Transition::RestoreStep);
            self.state.shedding_level = target;
            info!(from = %current, to = %target, deficit_kw = reading.deficit_kw, "load shedding raised");
        } else if target < current
            && !reading.is_energy_shortage
            && !self.timers.is_pending(Transition::RestoreStep)
        {
            self.timers.schedule(
                Transition::RestoreStep,
                after(now, self.config.restore_delay_ms),
            );
            debug!(level = %current, "load restoration scheduled");
        }

        self.state.clone()
    }

    /// [`GridShiftController::evaluate`] with the balance of `snapshot`.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot, now: DateTime<Utc>) -> GridShiftState {
        self.evaluate(snapshot.balance(), now)
    }

    /// [`GridShiftController::observe`] followed by
    /// [`GridShiftController::take_notifications`].
    pub fn observe_and_drain(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now: DateTime<Utc>,
    ) -> (GridShiftState, Vec<Alert>) {
        let state = self.observe(snapshot, now);
        (state, self.take_notifications())
    }

    /// Fires every transition due at or before `now`.
    pub fn advance(&mut self, now: DateTime<Utc>) -> GridShiftState {
        self.fire_due(now);
        self.state.clone()
    }

    pub fn toggle_auto_shift(&mut self) -> GridShiftState {
        self.state.auto_shift_enabled = !self.state.auto_shift_enabled;
        info!(enabled = self.state.auto_shift_enabled, "auto-shift toggled");
        self.state.clone()
    }

    /// Operator request to connect; a no-op if already connected or
    /// synchronizing.
    pub fn manual_grid_shift(&mut self, now: DateTime<Utc>) -> GridShiftState {
        if !self.state.is_connected && self.state.sync_status != SyncStatus::Synchronizing {
            self.begin_sync(now);
        }
        self.state.clone()
    }

    /// Islands the microgrid at once and cancels a pending synchronization.
    pub fn disconnect_grid(&mut self) -> GridShiftState {
        if self.timers.cancel(Transition::CompleteSync) {
            debug!("pending synchronization cancelled");
        }
        let s = &mut self.state;
        s.is_connected = false;
        s.voltage_v = 0.0;
        s.frequency_hz = 0.0;
        s.power_import_kw = 0.0;
        s.power_export_kw = 0.0;
        s.sync_status = SyncStatus::Disconnected;
        s.shifting_in_progress = false;
        info!("disconnected from utility grid");
        self.state.clone()
    }

    /// Operator override of the shedding level; cancels a pending restoration.
    ///
    /// # Errors
    ///
    /// Returns [`MicrogridError::InvalidSheddingLevel`] if `level > 3`.
    pub fn set_shedding_level(&mut self, level: u8) -> Result<GridShiftState, MicrogridError> {
        let level = SheddingLevel::try_from(level).inspect_err(|e| {
            tracing::warn!(error = %e, "shedding override rejected");
        })?;
        if self.timers.cancel(Transition::RestoreStep) {
            debug!("pending load restoration cancelled");
        }
        info!(from = %self.state.shedding_level, to = %level, "load shedding set by operator");
        self.state.shedding_level = level;
        Ok(self.state.clone())
    }

    /// Alerts raised by real transitions since the last call.
    pub fn take_notifications(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.notifications)
    }

    pub fn shifting_status(&self) -> ShiftingStatus {
        if self.state.shifting_in_progress {
            ShiftingStatus::ShiftingToGrid
        } else if self.state.is_connected {
            ShiftingStatus::GridConnected
        } else if self.latest.is_some_and(|b| b.is_energy_shortage) {
            ShiftingStatus::EnergyShortage
        } else {
            ShiftingStatus::MicrogridMode
        }
    }

    /// Drops pending transitions and returns to the initial state.
    pub fn reset(&mut self) {
        self.timers.clear();
        self.latest = None;
        self.notifications.clear();
        self.state = GridShiftState::islanded(self.config.auto_shift_enabled);
    }

    fn begin_sync(&mut self, now: DateTime<Utc>) {
        self.state.sync_status = SyncStatus::Synchronizing;
        self.state.shifting_in_progress = true;
        self.timers.schedule(
            Transition::CompleteSync,
            after(now, self.config.sync_delay_ms),
        );
        info!(delay_ms = self.config.sync_delay_ms, "grid synchronization started");
    }

    fn fire_due(&mut self, now: DateTime<Utc>) {
        while let Some(transition) = self.timers.pop_due(now) {
            match transition {
                Transition::CompleteSync => self.complete_sync(now),
                Transition::RestoreStep => self.restore_step(now),
            }
        }
    }

    fn complete_sync(&mut self, now: DateTime<Utc>) {
        let import_kw = self.latest.map_or(0.0, |b| round_to(b.deficit_kw, 2));
        let s = &mut self.state;
        s.is_connected = true;
        s.sync_status = SyncStatus::Synchronized;
        s.shifting_in_progress = false;
        s.power_import_kw = import_kw;
        s.power_export_kw = 0.0;
        s.voltage_v = round_to(self.draws.uniform(220.0, 240.0), 2);
        s.frequency_hz = round_to(self.draws.uniform(49.8, 50.2), 2);
        s.last_shift_timestamp = Some(now);
        info!(import_kw, voltage_v = s.voltage_v, frequency_hz = s.frequency_hz, "connected to utility grid");

        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.notifications.push(Alert::grid_connected(&stamp, import_kw));
    }

    fn restore_step(&mut self, now: DateTime<Utc>) {
        let current = self.state.shedding_level;
        let allowed = self
            .latest
            .is_some_and(|b| !b.is_energy_shortage && b.shedding_level < current);
        if !allowed {
            debug!(level = %current, "load restoration dropped, reading no longer allows it");
            return;
        }

        let next = current.step_down();
        self.state.shedding_level = next;
        info!(from = %current, to = %next, "load shedding restored one level");

        let still_above = self.latest.is_some_and(|b| b.shedding_level < next);
        if still_above {
            self.timers.schedule(
                Transition::RestoreStep,
                after(now, self.config.restore_delay_ms),
            );
        }
    }
}

/// Clamps negative or non-finite deficits and surpluses to zero.
fn sanitize(mut reading: EnergyBalance) -> EnergyBalance {
    if !(reading.deficit_kw.is_finite() && reading.deficit_kw >= 0.0) {
        reading.deficit_kw = 0.0;
        reading.shedding_level = SheddingLevel::Normal;
    }
    if !(reading.surplus_kw.is_finite() && reading.surplus_kw >= 0.0) {
        reading.surplus_kw = 0.0;
    }
    reading
}

/// Shared handle that serializes every controller operation behind one lock.
#[derive(Debug, Clone)]
pub struct GridShiftHandle {
    inner: Arc<Mutex<GridShiftController>>,
}

impl GridShiftHandle {
    pub fn new(controller: GridShiftController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn state(&self) -> GridShiftState {
        self.inner.lock().state().clone()
    }

    pub fn shifting_status(&self) -> ShiftingStatus {
        self.inner.lock().shifting_status()
    }

    pub fn evaluate(&self, reading: EnergyBalance, now: DateTime<Utc>) -> GridShiftState {
        self.inner.lock().evaluate(reading, now)
    }

    pub fn observe(&self, snapshot: &TelemetrySnapshot, now: DateTime<Utc>) -> GridShiftState {
        self.inner.lock().observe(snapshot, now)
    }

    /// Observes `snapshot` and drains pending notifications under one lock,
    /// so a concurrent caller cannot take alerts raised by this reading.
    pub fn observe_and_drain(
        &self,
        snapshot: &TelemetrySnapshot,
        now: DateTime<Utc>,
    ) -> (GridShiftState, Vec<Alert>) {
        self.inner.lock().observe_and_drain(snapshot, now)
    }

    pub fn advance(&self, now: DateTime<Utc>) -> GridShiftState {
        self.inner.lock().advance(now)
    }

    pub fn toggle_auto_shift(&self) -> GridShiftState {
        self.inner.lock().toggle_auto_shift()
    }

    pub fn manual_grid_shift(&self, now: DateTime<Utc>) -> GridShiftState {
        self.inner.lock().manual_grid_shift(now)
    }

    pub fn disconnect_grid(&self) -> GridShiftState {
        self.inner.lock().disconnect_grid()
    }

    /// # Errors
    ///
    /// Returns [`MicrogridError::InvalidSheddingLevel`] if `level > 3`.
    pub fn set_shedding_level(&self, level: u8) -> Result<GridShiftState, MicrogridError> {
        self.inner.lock().set_shedding_level(level)
    }

    pub fn take_notifications(&self) -> Vec<Alert> {
        self.inner.lock().take_notifications()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::clock::ClockSample;
    use crate::sim::draws::ScriptedDraws;
    use crate::telemetry::TelemetryGenerator;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn controller() -> GridShiftController<ScriptedDraws> {
        GridShiftController::new(GridShiftConfig::default(), ScriptedDraws::constant(0.5))
    }

    fn shortage(deficit_kw: f64) -> EnergyBalance {
        EnergyBalance::assess(0.2, 0.2 + deficit_kw, 60.0)
    }

    fn night_snapshot() -> TelemetrySnapshot {
        // TEG only at 1 AM: 0.6 kW against about 1.3 kW of load
        let at = ClockSample::utc(2024, 6, 15, 1, 0, 0).unwrap();
        TelemetryGenerator::default().generate(&at, &mut ScriptedDraws::constant(0.5))
    }

    fn healthy() -> EnergyBalance {
        EnergyBalance::assess(2.5, 1.2, 80.0)
    }

    #[test]
    fn starts_islanded() {
        let c = controller();
        let s = c.state();
        assert!(!s.is_connected);
        assert_eq!(s.sync_status, SyncStatus::Disconnected);
        assert_eq!(s.voltage_v, 0.0);
        assert_eq!(s.shedding_level, SheddingLevel::Normal);
        assert!(s.auto_shift_enabled);
        assert_eq!(c.shifting_status(), ShiftingStatus::MicrogridMode);
    }

    #[test]
    fn shortage_synchronizes_then_connects() {
        let mut c = controller();
        let s = c.evaluate(shortage(0.8), t(0));
        assert_eq!(s.sync_status, SyncStatus::Synchronizing);
        assert!(s.shifting_in_progress);
        assert!(!s.is_connected);
        assert_eq!(c.shifting_status(), ShiftingStatus::ShiftingToGrid);

        // not yet due
        assert_eq!(c.advance(t(2)).sync_status, SyncStatus::Synchronizing);

        let s = c.advance(t(3));
        assert!(s.is_connected);
        assert_eq!(s.sync_status, SyncStatus::Synchronized);
        assert!(!s.shifting_in_progress);
        assert_eq!(s.power_import_kw, 0.8);
        assert_eq!(s.voltage_v, 230.0);
        assert_eq!(s.frequency_hz, 50.0);
        assert_eq!(s.last_shift_timestamp, Some(t(3)));
        assert_eq!(c.shifting_status(), ShiftingStatus::GridConnected);

        let notes = c.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "grid_connected");
        assert_eq!(notes[0].timestamp, "2024-06-15T12:00:03.000Z");
        assert!(c.take_notifications().is_empty());
    }

    #[test]
    fn repeated_shortage_does_not_restart_sync() {
        let mut c = controller();
        c.evaluate(shortage(0.8), t(0));
        c.evaluate(shortage(0.8), t(2));
        // still completes at the first due time
        assert!(c.advance(t(3)).is_connected);
    }

    #[test]
    fn auto_shift_off_stays_islanded() {
        let mut c = controller();
        assert!(!c.toggle_auto_shift().auto_shift_enabled);
        let s = c.evaluate(shortage(0.8), t(0));
        assert_eq!(s.sync_status, SyncStatus::Disconnected);
        // shedding still follows the reading
        assert_eq!(s.shedding_level, SheddingLevel::Moderate);
        assert_eq!(c.shifting_status(), ShiftingStatus::EnergyShortage);
    }

    #[test]
    fn disconnect_cancels_pending_sync() {
        let mut c = controller();
        c.evaluate(shortage(0.8), t(0));
        let s = c.disconnect_grid();
        assert_eq!(s.sync_status, SyncStatus::Disconnected);
        assert!(!s.shifting_in_progress);
        let s = c.advance(t(10));
        assert!(!s.is_connected);
        assert!(c.take_notifications().is_empty());
    }

    #[test]
    fn disconnect_zeroes_readings() {
        let mut c = controller();
        c.manual_grid_shift(t(0));
        assert!(c.advance(t(3)).is_connected);
        let s = c.disconnect_grid();
        assert!(!s.is_connected);
        assert_eq!(s.voltage_v, 0.0);
        assert_eq!(s.frequency_hz, 0.0);
        assert_eq!(s.power_import_kw, 0.0);
        assert_eq!(s.power_export_kw, 0.0);
        assert_eq!(s.last_shift_timestamp, Some(t(3)));
    }

    #[test]
    fn manual_shift_without_reading_imports_nothing() {
        let mut c = controller();
        assert_eq!(c.manual_grid_shift(t(0)).sync_status, SyncStatus::Synchronizing);
        let s = c.advance(t(5));
        assert!(s.is_connected);
        assert_eq!(s.power_import_kw, 0.0);
    }

    #[test]
    fn shedding_jumps_up_and_restores_gradually() {
        let mut c = controller();
        assert_eq!(c.evaluate(shortage(1.5), t(0)).shedding_level, SheddingLevel::CriticalOnly);

        // recovery: restoration scheduled, one level per delay
        assert_eq!(c.evaluate(healthy(), t(1)).shedding_level, SheddingLevel::CriticalOnly);
        assert_eq!(c.advance(t(5)).shedding_level, SheddingLevel::CriticalOnly);
        assert_eq!(c.advance(t(6)).shedding_level, SheddingLevel::Moderate);
        assert_eq!(c.advance(t(10)).shedding_level, SheddingLevel::Moderate);
        assert_eq!(c.advance(t(11)).shedding_level, SheddingLevel::NonCritical);
        assert_eq!(c.advance(t(16)).shedding_level, SheddingLevel::Normal);
        assert_eq!(c.next_due(), None);
    }

    #[test]
    fn restoration_revalidates_against_latest_reading() {
        let mut c = controller();
        c.evaluate(shortage(0.8), t(0));
        assert_eq!(c.state().shedding_level, SheddingLevel::Moderate);
        c.evaluate(healthy(), t(1));
        // shortage returns before the restore fires
        c.evaluate(shortage(0.7), t(4));
        assert_eq!(c.advance(t(6)).shedding_level, SheddingLevel::Moderate);
        assert_eq!(c.next_due(), None);
    }

    #[test]
    fn restoration_stops_at_reading_level() {
        let mut c = controller();
        c.evaluate(shortage(1.5), t(0));
        // deficit 0.4 without shortage: level 1 is still required
        let partial = EnergyBalance::assess(1.2, 1.6, 80.0);
        assert!(!partial.is_energy_shortage);
        c.evaluate(partial, t(1));
        c.advance(t(6));
        c.advance(t(11));
        assert_eq!(c.state().shedding_level, SheddingLevel::NonCritical);
        assert_eq!(c.next_due(), None);
    }

    #[test]
    fn increase_cancels_pending_restore() {
        let mut c = controller();
        c.evaluate(shortage(0.8), t(0));
        c.evaluate(healthy(), t(1));
        assert_eq!(c.evaluate(shortage(1.5), t(2)).shedding_level, SheddingLevel::CriticalOnly);
        // sync completes at t=3; no restore is pending
        c.advance(t(20));
        assert_eq!(c.state().shedding_level, SheddingLevel::CriticalOnly);
    }

    #[test]
    fn operator_override() {
        let mut c = controller();
        assert_eq!(c.set_shedding_level(2).unwrap().shedding_level, SheddingLevel::Moderate);
        assert!(matches!(
            c.set_shedding_level(4),
            Err(MicrogridError::InvalidSheddingLevel(4))
        ));
        assert_eq!(c.state().shedding_level, SheddingLevel::Moderate);
        // next automatic reading takes over again
        assert_eq!(c.evaluate(shortage(1.5), t(0)).shedding_level, SheddingLevel::CriticalOnly);
    }

    #[test]
    fn negative_deficit_clamped() {
        let mut c = controller();
        let mut reading = healthy();
        reading.deficit_kw = -3.0;
        c.evaluate(reading, t(0));
        assert_eq!(c.latest().map(|b| b.deficit_kw), Some(0.0));
    }

    #[test]
    fn handle_serializes_access() {
        let handle = GridShiftHandle::new(GridShiftController::seeded(GridShiftConfig::default(), 7));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                std::thread::spawn(move || {
                    h.evaluate(shortage(0.8), t(0));
                })
            })
            .collect();
        for th in threads {
            th.join().unwrap();
        }
        assert_eq!(handle.state().sync_status, SyncStatus::Synchronizing);
        let s = handle.advance(t(10));
        assert!(s.is_connected);
        assert!((220.0..=240.0).contains(&s.voltage_v));
        assert!((49.8..=50.2).contains(&s.frequency_hz));
        assert_eq!(handle.take_notifications().len(), 1);
    }

    #[test]
    fn observe_and_drain_returns_transition_alerts() {
        let mut c = controller();
        let snapshot = night_snapshot();
        let (s, notes) = c.observe_and_drain(&snapshot, t(0));
        assert_eq!(s.sync_status, SyncStatus::Synchronizing);
        assert!(notes.is_empty());

        let (s, notes) = c.observe_and_drain(&snapshot, t(3));
        assert!(s.is_connected);
        // import published to 10 W from the unrounded deficit
        assert_eq!(s.power_import_kw, 0.7);
        assert_eq!(notes.iter().map(|a| a.id).collect::<Vec<_>>(), vec!["grid_connected"]);
        assert!(c.take_notifications().is_empty());
    }

    #[test]
    fn handle_observe_and_drain_hands_each_alert_out_once() {
        let handle = GridShiftHandle::new(GridShiftController::seeded(GridShiftConfig::default(), 7));
        let snapshot = night_snapshot();
        handle.observe_and_drain(&snapshot, t(0));

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                let s = snapshot.clone();
                std::thread::spawn(move || h.observe_and_drain(&s, t(3)).1.len())
            })
            .collect();
        let drained: usize = threads.into_iter().map(|th| th.join().unwrap()).sum();
        assert_eq!(drained, 1);
        assert!(handle.state().is_connected);
        assert!(handle.take_notifications().is_empty());
    }
}
