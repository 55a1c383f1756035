//! Hybrid microgrid simulator: synthetic telemetry, alerts, forecasts, and
//! a load-shedding / grid-shift controller.

pub mod alerts;
pub mod config;
pub mod error;
pub mod forecast;
pub mod grid_shift;
pub mod io;
pub mod runner;
/// Clock, draws, patterns, energy balance, and shedding ladder.
pub mod sim;
pub mod telemetry;

#[cfg(feature = "api")]
pub mod api;
