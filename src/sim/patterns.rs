//! Dimensionless diurnal, weekly, and seasonal multipliers.
//!
//! Callers compose these multiplicatively in a fixed order
//! (hourly, weekly, seasonal, weather) so results stay comparable run to run.

use std::f64::consts::PI;

/// Ambient temperature above which the weather factor starts to grow (°C).
pub const REFERENCE_TEMP_C: f64 = 25.0;

/// Daily load swing, `1 + 0.3·sin(2π·hour/24)`.
pub fn hourly_pattern(hour: u32) -> f64 {
    1.0 + 0.3 * (2.0 * PI * f64::from(hour) / 24.0).sin()
}

/// Weekly swing with Sunday = 0, `1 + 0.1·sin(2π·day/7)`.
pub fn weekly_pattern(day_of_week: u32) -> f64 {
    1.0 + 0.1 * (2.0 * PI * f64::from(day_of_week) / 7.0).sin()
}

/// Seasonal swing over a zero-based month, `1 + 0.2·sin(2π·month/12)`.
pub fn seasonal_pattern(month0: u32) -> f64 {
    1.0 + 0.2 * (2.0 * PI * f64::from(month0) / 12.0).sin()
}

/// Cooling-load uplift of 2% per degree above `reference_temp_c`.
pub fn weather_factor(ambient_temp_c: f64, reference_temp_c: f64) -> f64 {
    1.0 + 0.02 * (ambient_temp_c - reference_temp_c).max(0.0)
}

/// Half-sine daylight curve: zero outside `[6, 18]`, 1.0 at solar noon.
pub fn solar_elevation_multiplier(hour: u32) -> f64 {
    if (6..=18).contains(&hour) {
        ((f64::from(hour) - 6.0) * PI / 12.0).sin()
    } else {
        0.0
    }
}
