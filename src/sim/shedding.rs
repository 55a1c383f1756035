//! The four-step load-shedding ladder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MicrogridError;

/// Deficit above which level 1 applies (kW).
pub const LEVEL_1_DEFICIT_KW: f64 = 0.3;
/// Deficit above which level 2 applies (kW).
pub const LEVEL_2_DEFICIT_KW: f64 = 0.6;
/// Deficit above which level 3 applies (kW).
pub const LEVEL_3_DEFICIT_KW: f64 = 1.0;

/// Graduated load-shedding level, serialized as its number 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SheddingLevel {
    /// All loads served.
    #[default]
    Normal,
    /// Non-essential loads dropped.
    NonCritical,
    /// Moderate-priority loads reduced.
    Moderate,
    /// Critical loads only.
    CriticalOnly,
}

/// Static description of one ladder step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheddingDescriptor {
    pub level: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub loads_affected: &'static [&'static str],
    /// Nominal load removed at this step (kW).
    pub power_saved_kw: f64,
}

const DESCRIPTORS: [SheddingDescriptor; 4] = [
    SheddingDescriptor {
        level: 0,
        name: "Normal Operation",
        description: "All loads operational",
        loads_affected: &[],
        power_saved_kw: 0.0,
    },
    SheddingDescriptor {
        level: 1,
        name: "Level 1 - Non-Critical",
        description: "Disconnect non-essential loads",
        loads_affected: &[
            "Lighting (non-essential)",
            "HVAC (comfort)",
            "Entertainment systems",
        ],
        power_saved_kw: 0.3,
    },
    SheddingDescriptor {
        level: 2,
        name: "Level 2 - Moderate",
        description: "Reduce moderate priority loads",
        loads_affected: &["Water heating", "Ventilation (partial)", "Outdoor lighting"],
        power_saved_kw: 0.6,
    },
    SheddingDescriptor {
        level: 3,
        name: "Level 3 - Critical Only",
        description: "Emergency mode - critical loads only",
        loads_affected: &["All non-critical systems", "Backup systems only"],
        power_saved_kw: 1.2,
    },
];

impl SheddingLevel {
    /// All levels, lowest first.
    pub const ALL: [SheddingLevel; 4] = [
        SheddingLevel::Normal,
        SheddingLevel::NonCritical,
        SheddingLevel::Moderate,
        SheddingLevel::CriticalOnly,
    ];

    /// Level required for an energy deficit.
    ///
    /// Single source of the 0.3 / 0.6 / 1.0 kW thresholds; the snapshot,
    /// the alert classifier, and the grid-shift controller all go through it.
    pub fn for_deficit(deficit_kw: f64) -> Self {
        if deficit_kw > LEVEL_3_DEFICIT_KW {
            Self::CriticalOnly
        } else if deficit_kw > LEVEL_2_DEFICIT_KW {
            Self::Moderate
        } else if deficit_kw > LEVEL_1_DEFICIT_KW {
            Self::NonCritical
        } else {
            Self::Normal
        }
    }

    /// Numeric level, 0..=3.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::NonCritical => 1,
            Self::Moderate => 2,
            Self::CriticalOnly => 3,
        }
    }

    /// One step lower, saturating at `Normal`.
    pub fn step_down(self) -> Self {
        match self {
            Self::Normal | Self::NonCritical => Self::Normal,
            Self::Moderate => Self::NonCritical,
            Self::CriticalOnly => Self::Moderate,
        }
    }

    /// `true` for any level above `Normal`.
    pub fn is_active(self) -> bool {
        self != Self::Normal
    }

    /// Name, description, affected loads, and nominal savings of this level.
    pub fn descriptor(self) -> &'static SheddingDescriptor {
        &DESCRIPTORS[usize::from(self.as_u8())]
    }
}

impl From<SheddingLevel> for u8 {
    fn from(level: SheddingLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for SheddingLevel {
    type Error = MicrogridError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SheddingLevel::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(MicrogridError::InvalidSheddingLevel(value))
    }
}

impl fmt::Display for SheddingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
