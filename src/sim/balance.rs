//! Generation-versus-load assessment shared by every consumer of a snapshot.

use super::draws::round_to;
use super::shedding::SheddingLevel;

/// Generation below which the microgrid counts as low on energy (kW).
pub const LOW_ENERGY_KW: f64 = 0.5;
/// Deficit above which an energy shortage is declared (kW).
pub const SHORTAGE_DEFICIT_KW: f64 = 0.5;
/// Battery SOC below which the battery counts as low (%).
pub const LOW_BATTERY_PCT: f64 = 30.0;
/// Generation below which a low battery also triggers a shortage (kW).
pub const LOW_BATTERY_GENERATION_KW: f64 = 1.0;

const NOISE_DP: i32 = 9;

/// Derived energy status for one instant.
///
/// Load here is the unrounded diurnal base load, not the published
/// two-decimal total.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::balance::EnergyBalance;
/// use microgrid_sim::sim::shedding::SheddingLevel;
///
/// let b = EnergyBalance::assess(0.4, 1.1, 55.0);
/// assert!(b.is_low_energy);
/// assert!((b.deficit_kw - 0.7).abs() < 1e-9);
/// assert_eq!(b.shedding_level, SheddingLevel::Moderate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyBalance {
    /// Load not covered by generation, never negative (kW).
    pub deficit_kw: f64,
    /// Generation not consumed by load, never negative (kW).
    pub surplus_kw: f64,
    pub is_low_energy: bool,
    pub is_energy_shortage: bool,
    pub shedding_level: SheddingLevel,
}

impl EnergyBalance {
    /// Assesses generation and load (kW) against battery SOC (%).
    ///
    /// Non-finite or negative inputs are treated as zero. Deficit and surplus
    /// keep full precision apart from subtraction noise below 1e-9 kW.
    pub fn assess(generation_kw: f64, load_kw: f64, battery_soc_pct: f64) -> Self {
        let generation_kw = non_negative(generation_kw);
        let load_kw = non_negative(load_kw);

        let deficit_kw = round_to((load_kw - generation_kw).max(0.0), NOISE_DP);
        let surplus_kw = round_to((generation_kw - load_kw).max(0.0), NOISE_DP);
        let is_low_energy = generation_kw < LOW_ENERGY_KW;
        let is_energy_shortage = deficit_kw > SHORTAGE_DEFICIT_KW
            || (battery_soc_pct < LOW_BATTERY_PCT && generation_kw < LOW_BATTERY_GENERATION_KW);

        Self {
            deficit_kw,
            surplus_kw,
            is_low_energy,
            is_energy_shortage,
            shedding_level: SheddingLevel::for_deficit(deficit_kw),
        }
    }

    /// Whether the controller should bring the utility grid in.
    pub fn needs_grid(&self) -> bool {
        self.is_energy_shortage || self.is_low_energy
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}
