use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sim::shedding::SheddingLevel;

/// Grid-tie synchronization phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Disconnected,
    Synchronizing,
    Synchronized,
}

/// Controller state as reported to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridShiftState {
    pub is_connected: bool,
    pub voltage_v: f64,
    pub frequency_hz: f64,
    pub power_import_kw: f64,
    pub power_export_kw: f64,
    pub sync_status: SyncStatus,
    pub shedding_level: SheddingLevel,
    pub auto_shift_enabled: bool,
    pub shifting_in_progress: bool,
    pub last_shift_timestamp: Option<DateTime<Utc>>,
}

impl GridShiftState {
    /// Islanded and idle, with electrical readings zeroed.
    pub fn islanded(auto_shift_enabled: bool) -> Self {
        Self {
            is_connected: false,
            voltage_v: 0.0,
            frequency_hz: 0.0,
            power_import_kw: 0.0,
            power_export_kw: 0.0,
            sync_status: SyncStatus::Disconnected,
            shedding_level: SheddingLevel::Normal,
            auto_shift_enabled,
            shifting_in_progress: false,
            last_shift_timestamp: None,
        }
    }
}

/// One-line operating mode shown next to the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShiftingStatus {
    #[serde(rename = "Shifting to Grid")]
    ShiftingToGrid,
    #[serde(rename = "Grid Connected")]
    GridConnected,
    #[serde(rename = "Energy Shortage")]
    EnergyShortage,
    #[serde(rename = "Microgrid Mode")]
    MicrogridMode,
}

impl fmt::Display for ShiftingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ShiftingToGrid => "Shifting to Grid",
            Self::GridConnected => "Grid Connected",
            Self::EnergyShortage => "Energy Shortage",
            Self::MicrogridMode => "Microgrid Mode",
        };
        f.write_str(s)
    }
}
