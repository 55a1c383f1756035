//! File output for sampled runs.

pub mod export;
