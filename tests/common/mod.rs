//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;

use microgrid_sim::config::MicrogridConfig;
use microgrid_sim::sim::clock::ClockSample;

/// Baseline configuration pinned to `seed`.
pub fn seeded_config(seed: u64) -> MicrogridConfig {
    let mut config = MicrogridConfig::baseline();
    config.simulation.seed = Some(seed);
    config
}

/// Seeded uniform source.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Saturday 2024-06-15 at `hour`:00 UTC.
pub fn june(hour: u32) -> ClockSample {
    ClockSample::utc(2024, 6, 15, hour, 0, 0).expect("valid date")
}

/// One sample per hour of 2024-06-15, midnight first.
pub fn whole_day() -> Vec<ClockSample> {
    (0..24).map(june).collect()
}
